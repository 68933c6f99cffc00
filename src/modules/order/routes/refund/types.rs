pub mod response {
    use crate::modules::order::repository::{Order, OrderStatus};
    use axum::{extract::Json, http::StatusCode, response::IntoResponse};
    use serde_json::json;

    pub enum Success {
        OrderRefunded(Order),
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::OrderRefunded(order) => (StatusCode::OK, Json(json!(order))).into_response(),
            }
        }
    }

    pub enum Error {
        OrderNotFound,
        OrderNotRefundable(OrderStatus),
        OrderChanged,
        FailedToRefundOrder,
    }

    impl IntoResponse for Error {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::OrderNotFound => (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": "Order not found" })),
                )
                    .into_response(),
                Self::OrderNotRefundable(status) => (
                    StatusCode::CONFLICT,
                    Json(json!({
                        "error": "Only approved orders can be refunded",
                        "status": status,
                    })),
                )
                    .into_response(),
                Self::OrderChanged => (
                    StatusCode::CONFLICT,
                    Json(json!({ "error": "Order changed while it was being refunded" })),
                )
                    .into_response(),
                Self::FailedToRefundOrder => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to refund order" })),
                )
                    .into_response(),
            }
        }
    }

    pub type Response = Result<Success, Error>;
}
