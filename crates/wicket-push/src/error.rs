//! Push bridge error types.

use std::io;
use thiserror::Error;

/// Errors that can occur while driving the push connection.
#[derive(Debug, Error)]
pub enum PushError {
    /// The runtime has no WebSocket transport capability.
    #[error("WebSocket is not supported in this runtime")]
    NotSupported,

    /// No open connection to send on.
    #[error("no open WebSocket connection")]
    NotConnected,

    /// Refused to send an empty text message.
    #[error("cannot send an empty text message")]
    EmptyMessage,

    /// Underlying WebSocket transport error.
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid session configuration.
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// The embedded envelope payload could not be parsed downstream.
    #[error("envelope parse error: {0}")]
    Parse(String),
}

impl PushError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
