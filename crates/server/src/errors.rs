use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::errors::{ErrorKind, ServiceError};
use thiserror::Error;
use tracing::{error, warn};

/// JSON error body: `{"error": ..., "detail": ...}`.
#[derive(Debug, Error)]
#[error("{status}: {error}")]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: String,
    pub detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, detail: Option<String>) -> Self {
        Self { status, error: error.into(), detail }
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.error, "detail": self.detail });
        (self.status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejections (missing or mistyped fields, bad syntax,
/// wrong content type) answer `400 {"error": "Validation Error", ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(JsonApiError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for JsonApiError {
    fn from(rejection: JsonRejection) -> Self {
        JsonApiError::new(StatusCode::BAD_REQUEST, "Validation Error", Some(rejection.body_text()))
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        let detail = Some(e.to_string());
        match e.kind() {
            ErrorKind::Validation => JsonApiError::new(StatusCode::BAD_REQUEST, "Validation Error", detail),
            ErrorKind::NotFound => JsonApiError::new(StatusCode::NOT_FOUND, "Not Found", detail),
            ErrorKind::Conflict => {
                warn!(code = e.code(), err = %e, "conflict surfaced to client");
                JsonApiError::new(StatusCode::CONFLICT, "Conflict", detail)
            }
            ErrorKind::Persistence => {
                error!(code = e.code(), err = %e, "persistence failure");
                JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", detail)
            }
        }
    }
}
