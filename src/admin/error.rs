use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::upstream::UpstreamError;

/// Why a control command was refused.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Invalid method")]
    InvalidMethod,

    #[error("Unknown stabilizer proxy command")]
    UnknownCommand,

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Invalid selenium address: {0}")]
    InvalidAddress(#[from] UpstreamError),

    #[error("Stability waiting is not installed")]
    StabilityUnavailable,
}

impl ControlError {
    pub fn status(&self) -> StatusCode {
        match self {
            ControlError::InvalidMethod => StatusCode::METHOD_NOT_ALLOWED,
            ControlError::UnknownCommand => StatusCode::NOT_FOUND,
            ControlError::InvalidBody(_) | ControlError::InvalidAddress(_) => {
                StatusCode::BAD_REQUEST
            }
            ControlError::StabilityUnavailable => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
