//! CDP error types.

use thiserror::Error;

/// Remote control errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Debug endpoint did not answer before the deadline.
    #[error("Debug endpoint on port {port} unreachable: {reason}")]
    Unreachable { port: u16, reason: String },

    /// The shared cancellation signal fired while waiting.
    #[error("Cancelled")]
    Cancelled,

    /// Tab has no control-channel address yet.
    #[error("No websocket url")]
    MissingControlUrl,

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// HTTP error talking to the debug endpoint.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout.
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}
