use super::types::response;
use crate::types::Context;
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, order_id: String) -> response::Response {
    ctx.cache
        .recover(&order_id)
        .await
        .map_err(|err| {
            tracing::error!("Failed to recover payer for order {}: {}", order_id, err);
            response::Error::FailedToRecoverPayer
        })?
        .map(response::Success::Payer)
        .ok_or(response::Error::PayerNotFound)
}
