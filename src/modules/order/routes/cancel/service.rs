use super::types::response;
use crate::{
    modules::order::service::{self as orders, Error},
    types::Context,
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, id: String) -> response::Response {
    orders::cancel(ctx, &id)
        .await
        .map(response::Success::OrderCancelled)
        .map_err(|err| match err {
            Error::OrderNotFound(_) => response::Error::OrderNotFound,
            Error::InvalidTransition { from, .. } => response::Error::OrderNotCancellable(from),
            Error::Superseded(_) => response::Error::OrderChanged,
            err => {
                tracing::error!("Failed to cancel order {}: {}", id, err);
                response::Error::FailedToCancelOrder
            }
        })
}
