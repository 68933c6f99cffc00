use super::types::{request, response};
use crate::{modules::order::service as orders, types::Context};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, filters: request::Filters) -> response::Response {
    orders::list(ctx, filters.status)
        .await
        .map(response::Success::Orders)
        .map_err(|err| {
            tracing::error!("Failed to fetch orders: {}", err);
            response::Error::FailedToFetchOrders
        })
}
