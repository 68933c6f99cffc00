use crate::types::Context;
use axum::extract::{Extension, FromRequestParts};
use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{async_trait, Json, RequestPartsExt};
use serde_json::json;
use std::sync::Arc;

fn get_api_key_from_header(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

fn keys_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}

/// Store staff authenticated with the admin API key.
#[derive(Clone, Debug)]
pub struct AdminAuth;

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminAuth {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Extension(ctx) = parts
            .extract::<Extension<Arc<Context>>>()
            .await
            .map_err(|err| {
                tracing::error!("Context extension missing: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })?;

        let api_key = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(get_api_key_from_header)
            .ok_or_else(unauthorized)?;

        if !keys_match(api_key, &ctx.admin.api_key) {
            tracing::warn!("Rejected admin request with an invalid API key");
            return Err(unauthorized());
        }

        Ok(Self)
    }
}
