use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::core::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message without the category prefix, as sent back over the socket
    pub fn detail(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotConfigured(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            ApiError::Storage(e) => e.to_string(),
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_request_error",
            ApiError::NotFound(_) => "not_found_error",
            ApiError::NotConfigured(_) => "configuration_error",
            ApiError::Storage(_) => "storage_error",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_response = ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
                param: None,
                code: None,
            },
        };

        (self.status_code(), Json(error_response)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::NotConfigured("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Storage(StoreError::Backend("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_detail_strips_prefix() {
        let err = ApiError::BadRequest("Message is required".into());
        assert_eq!(err.to_string(), "Bad request: Message is required");
        assert_eq!(err.detail(), "Message is required");

        let err = ApiError::Storage(StoreError::Backend("down".into()));
        assert_eq!(err.error_type(), "storage_error");
        assert_eq!(err.detail(), "Storage backend error: down");
    }
}
