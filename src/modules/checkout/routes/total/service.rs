use super::types::response;
use crate::{
    modules::checkout::service::{self as checkout, Error},
    types::Context,
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, order_id: String) -> response::Response {
    checkout::total_price(ctx, order_id)
        .await
        .map(response::Success::Total)
        .map_err(|err| match err {
            Error::OrderNotFound(_) => response::Error::OrderNotFound,
            _ => response::Error::FailedToFetchOrder,
        })
}
