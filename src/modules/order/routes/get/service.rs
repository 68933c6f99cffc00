use super::types::response;
use crate::{
    modules::order::service::{self as orders, Error},
    types::Context,
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, id: String) -> response::Response {
    orders::details(ctx, &id)
        .await
        .map(response::Success::Order)
        .map_err(|err| match err {
            Error::OrderNotFound(_) => response::Error::OrderNotFound,
            err => {
                tracing::error!("Failed to fetch order {}: {}", id, err);
                response::Error::FailedToFetchOrder
            }
        })
}
