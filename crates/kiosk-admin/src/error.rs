//! Administration API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kiosk_core::KioskError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Display not found: {0}")]
    DisplayNotFound(String),

    #[error("Tab not found on display {display}: {url}")]
    TabNotFound { display: String, url: String },

    #[error("Display already exists: {0}")]
    DisplayExists(String),

    #[error("Debug port {port} is already used by display {display}")]
    PortInUse { port: u16, display: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Control(#[from] KioskError),
}

impl AdminError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::DisplayNotFound(_) | Self::TabNotFound { .. } => StatusCode::NOT_FOUND,
            Self::DisplayExists(_) | Self::PortInUse { .. } => StatusCode::CONFLICT,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Control(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::DisplayNotFound(_) => "display_not_found",
            Self::TabNotFound { .. } => "tab_not_found",
            Self::DisplayExists(_) => "display_exists",
            Self::PortInUse { .. } => "port_in_use",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Control(_) => "control_failed",
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Admin request failed: {}", self);
        }
        let body = ErrorResponse::new(self.to_string(), self.code());
        (status, Json(body)).into_response()
    }
}
