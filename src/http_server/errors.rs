//! # HTTP Errors
//!
//! Every failure leaves the server as `{ "error": message, "code": status }`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::replica::ReplicaError;
use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Replica(#[from] ReplicaError),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    /// Malformed path, query string or body
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Replica(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_errors_keep_their_status() {
        let err = ApiError::from(ReplicaError::ReplicaNotFound("gone".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = ApiError::from(ReplicaError::FileAlreadyExists("dup".into()));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = ApiError::from(ReplicaError::Store(StoreError::Internal("x".into())));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body() {
        let err = ApiError::BadRequest("bad layer_id".into());
        let body = ErrorResponse::from(&err);
        assert_eq!(body.code, 400);
        assert_eq!(body.error, "bad layer_id");
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::Unavailable("store down".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
