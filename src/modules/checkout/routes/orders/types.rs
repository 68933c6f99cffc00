pub mod request {
    pub use crate::modules::checkout::service::Checkout as Payload;
}

pub mod response {
    use crate::{modules::checkout::service, utils::validation};
    use axum::{extract::Json, http::StatusCode, response::IntoResponse};
    use serde_json::json;
    use validator::ValidationErrors;

    pub enum Success {
        OrderPlaced(String),
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::OrderPlaced(order_id) => (
                    StatusCode::CREATED,
                    Json(json!({ "order_id": order_id })),
                )
                    .into_response(),
            }
        }
    }

    pub enum Error {
        FailedToValidate(ValidationErrors),
        OrderNotFound,
        OrderNotPending,
        FailedToPlaceOrder,
    }

    impl From<service::Error> for Error {
        fn from(err: service::Error) -> Self {
            match err {
                service::Error::OrderNotFound(_) => Self::OrderNotFound,
                service::Error::OrderNotPending { .. } => Self::OrderNotPending,
                _ => Self::FailedToPlaceOrder,
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
                Self::FailedToPlaceOrder => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to place order" })),
                )
                    .into_response(),
            }
        }
    }

    pub type Response = Result<Success, Error>;
}
