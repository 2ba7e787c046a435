use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use chirp_gateway::channel::ChannelError;

/// Every failure a handler can report. The first five are expected outcomes
/// with a stable reason string; none of them leaves partial state behind.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ChannelError> for AppError {
    fn from(e: ChannelError) -> Self {
        match e {
            ChannelError::StoreUnavailable(e) => AppError::StoreUnavailable(e),
            ChannelError::Join(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let reason = match &self {
            AppError::StoreUnavailable(e) => {
                error!("Store error: {:#}", e);
                "store unavailable".to_string()
            }
            AppError::Internal(e) => {
                error!("Internal error: {}", e);
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        (self.status(), Json(json!({ "error": reason }))).into_response()
    }
}
