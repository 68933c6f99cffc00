pub mod response {
    use crate::modules::customer::repository::Profile;
    use axum::{extract::Json, http::StatusCode, response::IntoResponse};
    use serde_json::json;

    pub enum Success {
        Payer(Profile),
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::Payer(payer) => (StatusCode::OK, Json(json!(payer))).into_response(),
            }
        }
    }

    pub enum Error {
        PayerNotFound,
        FailedToRecoverPayer,
    }

    impl IntoResponse for Error {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::PayerNotFound => (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": "Payer not found" })),
                )
                    .into_response(),
                Self::FailedToRecoverPayer => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to recover payer" })),
                )
                    .into_response(),
            }
        }
    }

    pub type Response = Result<Success, Error>;
}
