//! Error types for the orchestrator.

use kiosk_cdp::CdpError;
use kiosk_config::ConfigError;
use kiosk_window::WindowError;
use thiserror::Error;

use crate::wait::Cancelled;

/// Errors raised while bringing displays up or running them.
#[derive(Debug, Error)]
pub enum KioskError {
    /// Debug endpoint never answered.
    #[error("[{display}] Debug endpoint on port {port} unreachable: {reason}")]
    Unreachable {
        display: String,
        port: u16,
        reason: String,
    },

    /// Another process already listens on the display's debug port.
    #[error("[{display}] Port {port} in use")]
    PortInUse { display: String, port: u16 },

    /// Window discovery found nothing new.
    #[error("[{0}] No new window found")]
    NoNewWindow(String),

    /// Other window-manager failure.
    #[error("Window error: {0}")]
    Window(WindowError),

    /// Control-channel connect or write failure.
    #[error("Protocol send failed: {0}")]
    ProtocolSend(#[from] CdpError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Process could not be started or profile could not be prepared.
    #[error("[{display}] Launch failed: {reason}")]
    Launch { display: String, reason: String },

    /// `run` was called while a previous run is still active.
    #[error("Kiosk is already running")]
    AlreadyRunning,

    /// The run's cancellation signal fired.
    #[error("Cancelled")]
    Cancelled,
}

impl From<WindowError> for KioskError {
    fn from(e: WindowError) -> Self {
        match e {
            WindowError::NoNewWindow(name) => KioskError::NoNewWindow(name),
            other => KioskError::Window(other),
        }
    }
}

impl From<Cancelled> for KioskError {
    fn from(_: Cancelled) -> Self {
        KioskError::Cancelled
    }
}

impl KioskError {
    pub fn launch(display: &str, reason: impl ToString) -> Self {
        KioskError::Launch {
            display: display.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            KioskError::Cancelled | KioskError::ProtocolSend(CdpError::Cancelled)
        )
    }
}
