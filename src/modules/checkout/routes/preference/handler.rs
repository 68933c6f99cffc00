use super::{service::service, types::request};
use crate::types::Context;
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
};
use std::sync::Arc;

pub async fn handler(
    State(ctx): State<Arc<Context>>,
    Path(order_id): Path<String>,
    Json(payload): Json<request::Payload>,
) -> impl IntoResponse {
    service(ctx, order_id, payload).await
}
