use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use notify_store::StoreError;

/// Error body shared by both services:
/// `{ "success": false, "error": { "code", "message" } }`.
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::Invalid(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::Invalid(err.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        ApiError::Invalid(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Store(err) => {
                let status = match err {
                    StoreError::InvalidData(_) => StatusCode::BAD_REQUEST,
                    StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                };
                (status, err.code(), err.to_string())
            }
            ApiError::Invalid(msg) => (StatusCode::BAD_REQUEST, "INVALID_DATA", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };
        if status.is_server_error() {
            tracing::error!(code, "request failed: {message}");
        }
        let body = serde_json::json!({
            "success": false,
            "error": { "code": code, "message": message },
        });
        (status, Json(body)).into_response()
    }
}
