//! Error responses
//!
//! Every failure leaves the server as `{"success": false, "error": "..."}`
//! with a status derived from the core error taxonomy.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use scribe_core::ScribeError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] ScribeError),

    /// Body or query could not be decoded
    #[error("{0}")]
    BadRequest(String),

    /// Blocking task panicked or was cancelled
    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(err) => match err {
                ScribeError::Config(_) | ScribeError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                ScribeError::Hierarchy(_)
                | ScribeError::Identifier(_)
                | ScribeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                ScribeError::NotFound(_) => StatusCode::NOT_FOUND,
                ScribeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string()
        }));
        (status, body).into_response()
    }
}
