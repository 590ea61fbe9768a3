//! Envelope types exchanged between client and server.
//!
//! Every message carries a caller-generated `id` unique within one logical
//! connection. Messages that expect a reply (`register`, `unregister`,
//! `command`) are answered by exactly one `response` whose `commandId`
//! echoes the original `id`, or the sender observes a timeout. Never both.

use crate::protocol::descriptor::ToolDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire message, discriminated by the `type` field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Register {
        id: String,
        timestamp: DateTime<Utc>,
        tool: ToolDescriptor,
    },
    Unregister {
        id: String,
        timestamp: DateTime<Utc>,
        #[serde(rename = "toolName")]
        tool_name: String,
    },
    Command {
        id: String,
        timestamp: DateTime<Utc>,
        tool: String,
        method: String,
        #[serde(default)]
        params: Value,
    },
    Response {
        id: String,
        timestamp: DateTime<Utc>,
        #[serde(rename = "commandId")]
        command_id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorPayload>,
    },
    Event {
        id: String,
        timestamp: DateTime<Utc>,
        name: String,
        #[serde(default)]
        payload: Value,
    },
    Error {
        id: String,
        timestamp: DateTime<Utc>,
        error: ErrorPayload,
    },
}

impl Message {
    pub fn register(id: impl Into<String>, tool: ToolDescriptor) -> Self {
        Self::Register {
            id: id.into(),
            timestamp: Utc::now(),
            tool,
        }
    }

    pub fn unregister(id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self::Unregister {
            id: id.into(),
            timestamp: Utc::now(),
            tool_name: tool_name.into(),
        }
    }

    pub fn command(
        id: impl Into<String>,
        tool: impl Into<String>,
        method: impl Into<String>,
        params: Value,
    ) -> Self {
        Self::Command {
            id: id.into(),
            timestamp: Utc::now(),
            tool: tool.into(),
            method: method.into(),
            params,
        }
    }

    /// Successful response answering the message with id `command_id`
    pub fn success(id: impl Into<String>, command_id: impl Into<String>, data: Value) -> Self {
        Self::Response {
            id: id.into(),
            timestamp: Utc::now(),
            command_id: command_id.into(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed response answering the message with id `command_id`
    pub fn failure(
        id: impl Into<String>,
        command_id: impl Into<String>,
        error: ErrorPayload,
    ) -> Self {
        Self::Response {
            id: id.into(),
            timestamp: Utc::now(),
            command_id: command_id.into(),
            success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn event(id: impl Into<String>, name: impl Into<String>, payload: Value) -> Self {
        Self::Event {
            id: id.into(),
            timestamp: Utc::now(),
            name: name.into(),
            payload,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Register { id, .. }
            | Self::Unregister { id, .. }
            | Self::Command { id, .. }
            | Self::Response { id, .. }
            | Self::Event { id, .. }
            | Self::Error { id, .. } => id,
        }
    }

    /// Whether the sender expects exactly one Response for this message
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            Self::Register { .. } | Self::Unregister { .. } | Self::Command { .. }
        )
    }

    /// Discriminant name as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Unregister { .. } => "unregister",
            Self::Command { .. } => "command",
            Self::Response { .. } => "response",
            Self::Event { .. } => "event",
            Self::Error { .. } => "error",
        }
    }
}

/// Enumerated error codes carried in responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    HandlerNotFound,
    ExecutionError,
    Timeout,
    RequestError,
    AuthError,
    ValidationError,
    MaxReconnectAttempts,
    TransportError,
    ConfigError,
    SerializationError,
    IoError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HandlerNotFound => "HANDLER_NOT_FOUND",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::RequestError => "REQUEST_ERROR",
            Self::AuthError => "AUTH_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::MaxReconnectAttempts => "MAX_RECONNECT_ATTEMPTS",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::IoError => "IO_ERROR",
        }
    }
}

/// Error payload carried by failed responses and `error` messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}
