use super::types::{request, response};
use crate::{modules::checkout, types::Context};
use std::sync::Arc;
use validator::Validate;

pub async fn service(
    ctx: Arc<Context>,
    order_id: String,
    payload: request::Payload,
) -> response::Response {
    payload.validate().map_err(|errors| {
        tracing::warn!("Failed to validate payer for order {order_id}: {errors}");
        response::Error::FailedToValidate(errors)
    })?;

    checkout::service::create_preference_for_order(ctx, order_id, payload.payer)
        .await
        .map(response::Success::Preference)
        .map_err(response::Error::from)
}
