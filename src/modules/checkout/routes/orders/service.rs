use super::types::{request, response};
use crate::{modules::checkout, types::Context};
use std::sync::Arc;
use validator::Validate;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    payload.validate().map_err(|errors| {
        tracing::warn!("Failed to validate order payload: {errors}");
        response::Error::FailedToValidate(errors)
    })?;

    let (_, order) = checkout::service::place_order(ctx, payload)
        .await
        .map_err(response::Error::from)?;

    Ok(response::Success::OrderPlaced(order.id))
}
