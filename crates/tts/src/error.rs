use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hanzi_cache::CacheError;
use hanzi_core::HttpError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TtsError>;

/// Text-to-speech errors with appropriate HTTP status codes
///
/// `Clone` so one synthesis outcome can be handed to every request that
/// joined the same in-flight call.
#[derive(Debug, Clone, Error)]
pub enum TtsError {
    /// Missing or empty text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Credential provider unreachable, rejecting, or not configured
    #[error("Speech service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Provider returned a non-audio response or the transfer failed
    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Audio cache read or write failed
    #[error("Audio cache error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal server error
    /// If Some(message), it can be shown
    /// If None, it's an internal error and should not leak details
    #[error("Internal server error")]
    InternalError(Option<String>),
}

impl From<CacheError> for TtsError {
    fn from(err: CacheError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl HttpError for TtsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::SynthesisFailed(_) | Self::Storage(_) | Self::ConfigError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::SynthesisFailed(_) => "synthesis_failed",
            Self::Storage(_) => "storage_error",
            Self::ConfigError(_) | Self::InternalError(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::InvalidInput(message) => message.clone(),
            Self::ServiceUnavailable(_) => "Speech service is temporarily unavailable".to_string(),
            Self::SynthesisFailed(_) => "Speech synthesis failed".to_string(),
            Self::Storage(_) => "Audio cache is unavailable".to_string(),
            Self::InternalError(Some(message)) => message.clone(),
            Self::ConfigError(_) | Self::InternalError(None) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for TtsError {
    fn into_response(self) -> Response {
        hanzi_core::error_response(&self)
    }
}
