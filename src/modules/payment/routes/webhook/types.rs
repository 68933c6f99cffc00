pub mod request {
    use axum::http::header::{HeaderName, HeaderValue};
    use headers::{Error, Header};
    use serde::Deserialize;
    use std::iter;

    pub static X_SIGNATURE: HeaderName = HeaderName::from_static("x-signature");
    pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

    /// `x-signature: ts=<unix ts>,v1=<hex hmac>`
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct MercadoPagoSignature {
        pub ts: String,
        pub v1: String,
    }

    impl MercadoPagoSignature {
        pub fn parse(raw: &str) -> Option<Self> {
            let mut ts = None;
            let mut v1 = None;

            for part in raw.split(',') {
                match part.trim().split_once('=') {
                    Some(("ts", value)) => ts = Some(value.trim().to_string()),
                    Some(("v1", value)) => v1 = Some(value.trim().to_string()),
                    _ => {}
                }
            }

            Some(Self { ts: ts?, v1: v1? })
        }
    }

    impl Header for MercadoPagoSignature {
        fn name() -> &'static HeaderName {
            &X_SIGNATURE
        }

        fn decode<'i, I>(values: &mut I) -> Result<Self, Error>
        where
            Self: Sized,
            I: Iterator<Item = &'i HeaderValue>,
        {
            values
                .next()
                .and_then(|value| value.to_str().ok())
                .and_then(Self::parse)
                .ok_or(Error::invalid())
        }

        fn encode<E>(&self, values: &mut E)
        where
            E: Extend<HeaderValue>,
        {
            let raw = format!("ts={},v1={}", self.ts, self.v1);
            if let Ok(value) = HeaderValue::from_str(&raw) {
                values.extend(iter::once(value))
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct MercadoPagoRequestId(pub String);

    impl Header for MercadoPagoRequestId {
        fn name() -> &'static HeaderName {
            &X_REQUEST_ID
        }

        fn decode<'i, I>(values: &mut I) -> Result<Self, Error>
        where
            Self: Sized,
            I: Iterator<Item = &'i HeaderValue>,
        {
            values
                .next()
                .and_then(|value| value.to_str().ok())
                .map(|value| Self(value.to_string()))
                .ok_or(Error::invalid())
        }

        fn encode<E>(&self, values: &mut E)
        where
            E: Extend<HeaderValue>,
        {
            if let Ok(value) = HeaderValue::from_str(&self.0) {
                values.extend(iter::once(value))
            }
        }
    }

    /// Query string of both webhook and legacy IPN deliveries.
    #[derive(Deserialize, Default, Debug)]
    pub struct Query {
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub topic: Option<String>,
        pub id: Option<String>,
        #[serde(rename = "data.id")]
        pub data_id: Option<String>,
    }

    #[derive(Deserialize, Default, Debug)]
    pub struct Data {
        pub id: Option<serde_json::Value>,
    }

    #[derive(Deserialize, Default, Debug)]
    pub struct Json {
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub action: Option<String>,
        pub data: Option<Data>,
    }

    pub struct Payload {
        pub signature: Option<MercadoPagoSignature>,
        pub request_id: Option<MercadoPagoRequestId>,
        pub query: Query,
        pub json: Json,
    }

    impl Payload {
        pub fn topic(&self) -> Option<&str> {
            self.json
                .kind
                .as_deref()
                .or(self.query.kind.as_deref())
                .or(self.query.topic.as_deref())
        }

        /// Gateway payment ids are numeric, anything else is rejected.
        pub fn payment_id(&self) -> Option<String> {
            let from_body = self
                .json
                .data
                .as_ref()
                .and_then(|data| data.id.as_ref())
                .and_then(|id| match id {
                    serde_json::Value::String(id) => Some(id.clone()),
                    serde_json::Value::Number(id) => Some(id.to_string()),
                    _ => None,
                });

            from_body
                .or_else(|| self.query.data_id.clone())
                .or_else(|| self.query.id.clone())
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty() && id.bytes().all(|byte| byte.is_ascii_digit()))
        }
    }
}

pub mod response {
    use crate::modules::payment::service::Outcome;
    use axum::{extract::Json, http::StatusCode, response::IntoResponse};
    use serde_json::json;

    pub enum Success {
        Reconciled(Outcome),
        Skipped,
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::Reconciled(outcome) => (StatusCode::OK, Json(json!(outcome))).into_response(),
                Self::Skipped => (StatusCode::OK, Json(json!({ "outcome": "skipped" }))).into_response(),
            }
        }
    }

    #[derive(Debug)]
    pub enum Error {
        InvalidPayload,
        InvalidSignature,
        OrderNotFound,
        PaymentNotFound,
        GatewayUnavailable,
        ServerError,
    }

    impl IntoResponse for Error {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::InvalidPayload => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Invalid webhook payload" })),
                )
                    .into_response(),
                Self::InvalidSignature => (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Invalid webhook signature" })),
                )
                    .into_response(),
                Self::OrderNotFound => (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": "Order not found" })),
                )
                    .into_response(),
                Self::PaymentNotFound => (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": "Payment not found" })),
                )
                    .into_response(),
                Self::GatewayUnavailable => (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Failed to fetch payment" })),
                )
                    .into_response(),
                Self::ServerError => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to update order" })),
                )
                    .into_response(),
            }
        }
    }

    pub type Response = Result<Success, Error>;
}
