mod create;
mod orders;
mod payer;
mod preference;
mod total;

use crate::types::Context;
use axum::routing::Router;
use std::sync::Arc;

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .merge(create::get_router())
        .merge(orders::get_router())
        .merge(preference::get_router())
        .merge(payer::get_router())
        .merge(total::get_router())
}
