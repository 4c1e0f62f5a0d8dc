use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::infra::error_chain;
use crate::prompts::ERROR_INTERNAL;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `/labs` failures with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Log `err` with its causes and build a 500 whose body carries them
    /// only when `expose` is set.
    pub fn internal(err: &dyn std::error::Error, expose: bool) -> Self {
        let chain = error_chain(err);
        tracing::error!(error = %chain, "request failed");
        if expose {
            ApiError::Internal(chain)
        } else {
            ApiError::Internal(ERROR_INTERNAL.to_string())
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
