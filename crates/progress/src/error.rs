use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hanzi_core::HttpError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProgressError>;

/// Progress store errors
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Update did not name a character
    #[error("Missing character parameter")]
    MissingCharacter,

    /// Update body was not a JSON object of the expected shape
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Progress file could not be read or written
    #[error("Progress storage error: {0}")]
    Storage(String),
}

impl HttpError for ProgressError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCharacter | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::MissingCharacter | Self::InvalidBody(_) => "invalid_request",
            Self::Storage(_) => "storage_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::MissingCharacter | Self::InvalidBody(_) => self.to_string(),
            Self::Storage(_) => "Failed to save progress".to_string(),
        }
    }
}

impl IntoResponse for ProgressError {
    fn into_response(self) -> Response {
        hanzi_core::error_response(&self)
    }
}
