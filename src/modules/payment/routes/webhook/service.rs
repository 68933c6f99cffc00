use super::types::{request, response};
use crate::{
    modules::payment::{gateway, service as reconciler},
    types::Context,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

fn manifest(data_id: &str, request_id: &str, ts: &str) -> String {
    format!(
        "id:{};request-id:{};ts:{};",
        data_id.to_lowercase(),
        request_id,
        ts
    )
}

fn verify_signature(secret: &str, payload: &request::Payload) -> Result<(), response::Error> {
    let (signature, request_id) = match (&payload.signature, &payload.request_id) {
        (Some(signature), Some(request_id)) => (signature, request_id),
        _ => {
            tracing::warn!("Webhook delivered without x-signature or x-request-id");
            return Err(response::Error::InvalidSignature);
        }
    };
    let data_id = payload.payment_id().unwrap_or_default();

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|err| {
        tracing::error!("Failed to generate mac: {:?}", err);
        response::Error::ServerError
    })?;
    mac.update(manifest(&data_id, &request_id.0, &signature.ts).as_bytes());

    let expected = hex::decode(&signature.v1).map_err(|_| {
        tracing::warn!("Webhook signature is not valid hex");
        response::Error::InvalidSignature
    })?;

    mac.verify_slice(&expected).map_err(|_| {
        tracing::warn!("Webhook signature mismatch for payment {}", data_id);
        response::Error::InvalidSignature
    })
}

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    if let Some(secret) = ctx.payment.webhook_secret.as_deref() {
        verify_signature(secret, &payload)?;
    }

    if let Some(topic) = payload.topic() {
        if topic != "payment" {
            tracing::debug!("Skipping webhook topic {}", topic);
            return Ok(response::Success::Skipped);
        }
    }

    let payment_id = payload.payment_id().ok_or_else(|| {
        tracing::warn!("Webhook without a payment id");
        response::Error::InvalidPayload
    })?;

    tracing::debug!(
        "Reconciling payment {} ({})",
        payment_id,
        payload.json.action.as_deref().unwrap_or("no action")
    );

    reconciler::reconcile_payment(ctx, &payment_id)
        .await
        .map(response::Success::Reconciled)
        .map_err(|err| match err {
            reconciler::Error::MissingReference(_) | reconciler::Error::OrderNotFound(_) => {
                tracing::warn!("Webhook for payment {} not correlated: {}", payment_id, err);
                response::Error::OrderNotFound
            }
            reconciler::Error::Gateway(gateway::Error::NotFound) => {
                response::Error::PaymentNotFound
            }
            reconciler::Error::Gateway(err) => {
                tracing::error!("Failed to fetch payment {}: {}", payment_id, err);
                response::Error::GatewayUnavailable
            }
            reconciler::Error::OrderStore(_) => response::Error::ServerError,
        })
}
