//! Maps [`ConsultError`] onto the HTTP boundary (§7's error-kind table).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use consult_core::error::ConsultError;

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

pub struct ApiError(pub ConsultError);

impl From<ConsultError> for ApiError {
    fn from(e: ConsultError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ConsultError::NotFound { .. } => StatusCode::NOT_FOUND,
            ConsultError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            ConsultError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ConsultError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ConsultError::JsonRepair(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ConsultError::CollaboratorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ConsultError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ConsultError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ConsultError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody { error: self.0.to_string(), code: self.0.code() };
        (status, Json(body)).into_response()
    }
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError(ConsultError::InvalidInput(message.into()))
}
