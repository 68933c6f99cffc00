use super::types::{request, response};
use crate::{modules::checkout, types::Context};
use std::sync::Arc;
use validator::Validate;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    payload.validate().map_err(|errors| {
        tracing::warn!("Failed to validate checkout payload: {errors}");
        response::Error::FailedToValidate(errors)
    })?;

    checkout::service::checkout(ctx, payload)
        .await
        .map(response::Success::CheckoutCreated)
        .map_err(response::Error::from)
}
