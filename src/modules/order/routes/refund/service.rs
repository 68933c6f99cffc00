use super::types::response;
use crate::{
    modules::order::service::{self as orders, Error},
    types::Context,
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, id: String) -> response::Response {
    orders::refund(ctx, &id)
        .await
        .map(response::Success::OrderRefunded)
        .map_err(|err| match err {
            Error::OrderNotFound(_) => response::Error::OrderNotFound,
            Error::InvalidTransition { from, .. } => response::Error::OrderNotRefundable(from),
            Error::Superseded(_) => response::Error::OrderChanged,
            err => {
                tracing::error!("Failed to refund order {}: {}", id, err);
                response::Error::FailedToRefundOrder
            }
        })
}
