use super::types::{request, response};
use crate::{
    modules::order::service::{self as orders, Error},
    types::Context,
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    orders::mark_as_read(ctx, &payload.id, payload.body.read)
        .await
        .map(response::Success::OrderUpdated)
        .map_err(|err| match err {
            Error::OrderNotFound(_) => response::Error::OrderNotFound,
            err => {
                tracing::error!("Failed to update read flag of order {}: {}", payload.id, err);
                response::Error::FailedToUpdateOrder
            }
        })
}
