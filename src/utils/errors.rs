use crate::protocol::message::{ErrorCode, ErrorPayload};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("handler not found: {0}")]
    HandlerNotFound(String),

    #[error("handler execution failed: {0}")]
    ExecutionError(String),

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("request failed with status {status}: {message}")]
    RequestError { status: u16, message: String },

    #[error("authentication error: {0}")]
    AuthError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("connection lost after {0} reconnect attempts")]
    MaxReconnectAttempts(u32),

    #[error("command failed: {0}")]
    CommandFailed(ErrorPayload),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BridgeError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::HandlerNotFound(_) => "HANDLER_NOT_FOUND",
            Self::ExecutionError(_) => "EXECUTION_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::RequestError { .. } => "REQUEST_ERROR",
            Self::AuthError(_) => "AUTH_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::MaxReconnectAttempts(_) => "MAX_RECONNECT_ATTEMPTS",
            Self::CommandFailed(payload) => payload.code.as_str(),
            Self::TransportError(_) => "TRANSPORT_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Http(_) => "TRANSPORT_ERROR",
        }
    }

    /// HTTP status carried by the failure, if it is a classified request
    /// failure. The retry policy only retries failures with a status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<&BridgeError> for ErrorPayload {
    fn from(err: &BridgeError) -> Self {
        let code = match err {
            BridgeError::HandlerNotFound(_) => ErrorCode::HandlerNotFound,
            BridgeError::ExecutionError(_) => ErrorCode::ExecutionError,
            BridgeError::Timeout(_) => ErrorCode::Timeout,
            BridgeError::RequestError { .. } => ErrorCode::RequestError,
            BridgeError::AuthError(_) => ErrorCode::AuthError,
            BridgeError::ValidationError(_) => ErrorCode::ValidationError,
            BridgeError::MaxReconnectAttempts(_) => ErrorCode::MaxReconnectAttempts,
            BridgeError::CommandFailed(payload) => payload.code,
            BridgeError::TransportError(_) => ErrorCode::TransportError,
            BridgeError::ConfigError(_) => ErrorCode::ConfigError,
            BridgeError::Io(_) => ErrorCode::IoError,
            BridgeError::Serialization(_) => ErrorCode::SerializationError,
            BridgeError::Http(_) => ErrorCode::TransportError,
        };

        let details = match err {
            BridgeError::RequestError { status, .. } => Some(json!({ "status": status })),
            BridgeError::CommandFailed(payload) => payload.details.clone(),
            _ => None,
        };

        ErrorPayload {
            code,
            message: err.to_string(),
            details,
        }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
