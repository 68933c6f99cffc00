pub mod response {
    use crate::modules::order::repository::{Order, OrderStatus};
    use axum::{extract::Json, http::StatusCode, response::IntoResponse};
    use serde_json::json;

    pub enum Success {
        OrderCancelled(Order),
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::OrderCancelled(order) => (StatusCode::OK, Json(json!(order))).into_response(),
            }
        }
    }

    pub enum Error {
        OrderNotFound,
        OrderNotCancellable(OrderStatus),
        OrderChanged,
        FailedToCancelOrder,
    }

    impl IntoResponse for Error {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::OrderNotFound => (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": "Order not found" })),
                )
                    .into_response(),
                Self::OrderNotCancellable(status) => (
                    StatusCode::CONFLICT,
                    Json(json!({
                        "error": "Order can no longer be cancelled",
                        "status": status,
                    })),
                )
                    .into_response(),
                Self::OrderChanged => (
                    StatusCode::CONFLICT,
                    Json(json!({ "error": "Order changed while it was being cancelled" })),
                )
                    .into_response(),
                Self::FailedToCancelOrder => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to cancel order" })),
                )
                    .into_response(),
            }
        }
    }

    pub type Response = Result<Success, Error>;
}
