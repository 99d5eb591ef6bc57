//! Window type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to window operations.
#[derive(Debug, Error)]
pub enum WindowError {
    /// The window-manager tool could not be run or reported failure.
    #[error("Window manager command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// No visible windows matched at all.
    #[error("[{0}] No visible windows found")]
    NoVisibleWindows(String),

    /// Nothing appeared since the snapshot taken before launch.
    #[error("[{0}] No new window found after exec")]
    NoNewWindow(String),
}

/// Opaque window-manager handle.
///
/// Compared by identity only, never by window name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for WindowId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}
