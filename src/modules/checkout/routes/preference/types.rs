pub mod request {
    use crate::modules::customer::repository::Profile;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Deserialize, Validate)]
    pub struct Payload {
        #[validate(nested)]
        pub payer: Profile,
    }
}

pub mod response {
    use crate::{
        modules::{checkout::service, payment::gateway::Preference},
        utils::validation,
    };
    use axum::{extract::Json, http::StatusCode, response::IntoResponse};
    use serde_json::json;
    use validator::ValidationErrors;

    pub enum Success {
        Preference(Preference),
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::Preference(preference) => (
                    StatusCode::OK,
                    Json(json!({
                        "init_point": preference.init_point,
                        "sandbox_init_point": preference.sandbox_init_point,
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
        FailedToCreatePreference,
        FailedToFetchOrder,
    }

    impl From<service::Error> for Error {
        fn from(err: service::Error) -> Self {
            match err {
                service::Error::OrderNotFound(_) => Self::OrderNotFound,
                service::Error::OrderNotPending { .. } => Self::OrderNotPending,
                service::Error::Gateway { .. } => Self::FailedToCreatePreference,
                _ => Self::FailedToFetchOrder,
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
                Self::FailedToCreatePreference => (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Failed to create payment preference" })),
                )
                    .into_response(),
                Self::FailedToFetchOrder => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to fetch order" })),
                )
                    .into_response(),
            }
        }
    }

    pub type Response = Result<Success, Error>;
}
