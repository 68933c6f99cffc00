mod cancel;
mod get;
mod list;
mod read;
mod refund;
mod shipment;

use crate::types::Context;
use axum::routing::Router;
use std::sync::Arc;

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .merge(list::get_router())
        .merge(get::get_router())
        .merge(shipment::get_router())
        .merge(refund::get_router())
        .merge(cancel::get_router())
        .merge(read::get_router())
}
