pub mod request {
    pub use crate::modules::checkout::service::Checkout as Payload;
}

pub mod response {
    use crate::{
        modules::checkout::service::{self, CheckoutOutcome},
        utils::validation,
    };
    use axum::{extract::Json, http::StatusCode, response::IntoResponse};
    use serde_json::json;
    use validator::ValidationErrors;

    pub enum Success {
        CheckoutCreated(CheckoutOutcome),
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::CheckoutCreated(outcome) => (
                    StatusCode::CREATED,
                    Json(json!({
                        "order_id": outcome.order_id,
                        "init_point": outcome.init_point,
                        "sandbox_init_point": outcome.sandbox_init_point,
                    })),
                )
                    .into_response(),
            }
        }
    }

    pub enum Error {
        FailedToValidate(ValidationErrors),
        OrderNotFound,
        OrderNotPending,
        FailedToCreatePreference(String),
        FailedToCreateOrder,
    }

    impl From<service::Error> for Error {
        fn from(err: service::Error) -> Self {
            match err {
                service::Error::OrderNotFound(_) => Self::OrderNotFound,
                service::Error::OrderNotPending { .. } => Self::OrderNotPending,
                service::Error::Gateway { order_id, .. } => {
                    Self::FailedToCreatePreference(order_id)
                }
                service::Error::CustomerStore(_) | service::Error::OrderStore(_) => {
                    Self::FailedToCreateOrder
                }
            }
        }
    }

    impl IntoResponse for Error {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::FailedToValidate(errors) => validation::into_response(errors).into_response(),
                Self::OrderNotFound => (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": "Order not found" })),
                )
                    .into_response(),
                Self::OrderNotPending => (
                    StatusCode::CONFLICT,
                    Json(json!({ "error": "Order is no longer waiting for payment" })),
                )
                    .into_response(),
                Self::FailedToCreatePreference(order_id) => (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({
                        "error": "Failed to create payment preference",
                        "order_id": order_id,
                    })),
                )
                    .into_response(),
                Self::FailedToCreateOrder => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to create order" })),
                )
                    .into_response(),
            }
        }
    }

    pub type Response = Result<Success, Error>;
}
