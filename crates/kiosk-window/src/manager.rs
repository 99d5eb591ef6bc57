//! Window-manager seam and its `xdotool` implementation.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use crate::parsers::parse_window_ids;
use crate::window_types::{WindowError, WindowId};

/// Operations the orchestrator needs from the window manager.
#[async_trait]
pub trait WindowManager: Send + Sync {
    /// Visible windows whose name matches `pattern` (a regular expression).
    async fn search_visible(&self, pattern: &str) -> Result<Vec<WindowId>, WindowError>;

    /// Raise and focus a window.
    async fn activate(&self, id: &WindowId) -> Result<(), WindowError>;

    /// Move a window's top-left corner to `(x, y)`.
    async fn move_to(&self, id: &WindowId, x: i32, y: i32) -> Result<(), WindowError>;

    /// Send a single key (xdotool key name, e.g. `F11`).
    async fn send_key(&self, id: &WindowId, key: &str) -> Result<(), WindowError>;

    /// Ask the window to close.
    async fn close(&self, id: &WindowId) -> Result<(), WindowError>;
}

/// [`WindowManager`] backed by the `xdotool` command-line tool.
#[derive(Debug, Clone)]
pub struct XdotoolWindowManager {
    program: String,
}

impl XdotoolWindowManager {
    pub fn new() -> Self {
        Self {
            program: "xdotool".to_string(),
        }
    }

    /// Use a different executable (a wrapper script, for instance).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, args: &[&str]) -> Result<String, WindowError> {
        let command = format!("{} {}", self.program, args.join(" "));
        trace!("Running {}", command);

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| WindowError::CommandFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(WindowError::CommandFailed {
                command,
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for XdotoolWindowManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowManager for XdotoolWindowManager {
    async fn search_visible(&self, pattern: &str) -> Result<Vec<WindowId>, WindowError> {
        let stdout = self
            .run(&["search", "--onlyvisible", "--name", pattern])
            .await?;
        Ok(parse_window_ids(&stdout))
    }

    async fn activate(&self, id: &WindowId) -> Result<(), WindowError> {
        self.run(&["windowactivate", id.as_str()]).await.map(drop)
    }

    async fn move_to(&self, id: &WindowId, x: i32, y: i32) -> Result<(), WindowError> {
        let (x, y) = (x.to_string(), y.to_string());
        self.run(&["windowmove", id.as_str(), &x, &y]).await.map(drop)
    }

    async fn send_key(&self, id: &WindowId, key: &str) -> Result<(), WindowError> {
        self.run(&["key", "--window", id.as_str(), key]).await.map(drop)
    }

    async fn close(&self, id: &WindowId) -> Result<(), WindowError> {
        self.run(&["windowclose", id.as_str()]).await.map(drop)
    }
}
