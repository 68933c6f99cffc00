use super::service::service;
use crate::types::Context;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;

pub async fn handler(
    State(ctx): State<Arc<Context>>,
    Path(order_id): Path<String>,
) -> impl IntoResponse {
    service(ctx, order_id).await
}
