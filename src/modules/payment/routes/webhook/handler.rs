use super::{
    service::service,
    types::{request, response},
};
use crate::types::Context;
use axum::{
    body::Bytes,
    extract::{Query, State},
};
use axum_extra::TypedHeader;
use std::sync::Arc;

pub async fn handler(
    State(ctx): State<Arc<Context>>,
    signature: Option<TypedHeader<request::MercadoPagoSignature>>,
    request_id: Option<TypedHeader<request::MercadoPagoRequestId>>,
    Query(query): Query<request::Query>,
    body: Bytes,
) -> response::Response {
    let json = match body.is_empty() {
        true => request::Json::default(),
        false => serde_json::from_slice::<request::Json>(body.as_ref()).map_err(|err| {
            tracing::warn!("Failed to parse webhook body: {}", err);
            response::Error::InvalidPayload
        })?,
    };

    service(
        ctx,
        request::Payload {
            signature: signature.map(|TypedHeader(signature)| signature),
            request_id: request_id.map(|TypedHeader(request_id)| request_id),
            query,
            json,
        },
    )
    .await
}
