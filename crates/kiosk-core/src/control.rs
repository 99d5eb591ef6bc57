//! Change notifications from the administration API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kiosk_config::{Config, ConfigError, ConfigLoader, ConfigValidator, DisplayConfig, TabConfig};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::KioskError;
use crate::kiosk::Kiosk;
use crate::wait::sleep_or_cancel;

/// Pause between stopping and restarting on reload.
const RELOAD_SETTLE: Duration = Duration::from_secs(1);

/// Structural changes the orchestrator can be told about.
#[async_trait]
pub trait KioskControl: Send + Sync {
    async fn add_display(&self, display: &DisplayConfig) -> Result<(), KioskError>;
    async fn remove_display(&self, name: &str) -> Result<(), KioskError>;
    async fn edit_display(&self, display: &DisplayConfig) -> Result<(), KioskError>;
    async fn add_tab(&self, display: &str, tab: &TabConfig) -> Result<(), KioskError>;
    async fn remove_tab(&self, display: &str, url: &str) -> Result<(), KioskError>;
    async fn edit_tab(&self, display: &str, tab: &TabConfig) -> Result<(), KioskError>;

    /// Restart the orchestration run from the saved configuration.
    async fn reload_displays(&self) -> Result<(), KioskError>;
}

/// Accepts every notification and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopControl;

#[async_trait]
impl KioskControl for NoopControl {
    async fn add_display(&self, _display: &DisplayConfig) -> Result<(), KioskError> {
        Ok(())
    }

    async fn remove_display(&self, _name: &str) -> Result<(), KioskError> {
        Ok(())
    }

    async fn edit_display(&self, _display: &DisplayConfig) -> Result<(), KioskError> {
        Ok(())
    }

    async fn add_tab(&self, _display: &str, _tab: &TabConfig) -> Result<(), KioskError> {
        Ok(())
    }

    async fn remove_tab(&self, _display: &str, _url: &str) -> Result<(), KioskError> {
        Ok(())
    }

    async fn edit_tab(&self, _display: &str, _tab: &TabConfig) -> Result<(), KioskError> {
        Ok(())
    }

    async fn reload_displays(&self) -> Result<(), KioskError> {
        Ok(())
    }
}

/// The run currently driven by a [`ReloadingControl`].
struct CurrentRun {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Live-reload adapter: owns the orchestrator's run task and restarts it
/// from disk on `reload_displays`.
///
/// Individual edits are only logged; they take effect on the next reload.
#[derive(Clone)]
pub struct ReloadingControl {
    inner: Arc<ReloadInner>,
}

struct ReloadInner {
    kiosk: Arc<Kiosk>,
    config_path: PathBuf,
    root: CancellationToken,
    current: tokio::sync::Mutex<Option<CurrentRun>>,
    failure: Mutex<Option<String>>,
}

impl ReloadingControl {
    pub fn new(kiosk: Arc<Kiosk>, config_path: impl Into<PathBuf>, root: CancellationToken) -> Self {
        Self {
            inner: Arc::new(ReloadInner {
                kiosk,
                config_path: config_path.into(),
                root,
                current: tokio::sync::Mutex::new(None),
                failure: Mutex::new(None),
            }),
        }
    }

    pub fn kiosk(&self) -> &Arc<Kiosk> {
        &self.inner.kiosk
    }

    /// Start the first run.
    pub async fn start(&self) {
        let mut current = self.inner.current.lock().await;
        if current.is_none() {
            *current = Some(self.inner.spawn_run());
        }
    }

    /// Why the last run ended with an error, if it did.
    pub fn failure(&self) -> Option<String> {
        self.inner.failure.lock().clone()
    }

    /// Stop the current run and wait for it to finish.
    pub async fn shutdown(&self) {
        let mut current = self.inner.current.lock().await;
        self.inner.finish(current.take()).await;
    }

    /// Stop, wait, reload the file and run again, returning once the new
    /// run has been started.
    pub async fn reload_now(&self) {
        self.inner.restart().await;
    }
}

impl ReloadInner {
    async fn finish(&self, run: Option<CurrentRun>) {
        self.kiosk.stop().await;
        if let Some(run) = run {
            run.cancel.cancel();
            if let Err(e) = run.task.await {
                warn!("Kiosk run task ended abnormally: {}", e);
            }
        }
    }

    /// Serialized by `current`.
    async fn restart(self: &Arc<Self>) {
        let mut current = self.current.lock().await;
        self.finish(current.take()).await;

        if sleep_or_cancel(RELOAD_SETTLE, &self.root).await.is_err() {
            return;
        }

        match load_valid(&self.config_path) {
            Ok(config) => self.kiosk.load_config(config),
            Err(e) => error!(
                "Failed to reload {}, keeping previous configuration: {}",
                self.config_path.display(),
                e
            ),
        }

        *current = Some(self.spawn_run());
    }

    /// Run the kiosk in the background. A launch failure cancels `root`.
    fn spawn_run(self: &Arc<Self>) -> CurrentRun {
        let cancel = self.root.child_token();
        let run_cancel = cancel.clone();
        let inner = self.clone();

        let task = tokio::spawn(async move {
            if let Err(e) = inner.kiosk.run(&run_cancel).await {
                error!("Kiosk run failed: {}", e);
                *inner.failure.lock() = Some(e.to_string());
                inner.root.cancel();
            }
        });

        CurrentRun { cancel, task }
    }
}

/// Load and validate a configuration file. Warnings are logged.
fn load_valid(path: &std::path::Path) -> Result<Config, ConfigError> {
    let config = ConfigLoader::load(path)?;
    for warning in ConfigValidator::validate(&config).into_result()? {
        warn!("{}: {}", warning.path, warning.message);
    }
    Ok(config)
}

#[async_trait]
impl KioskControl for ReloadingControl {
    async fn add_display(&self, display_config: &DisplayConfig) -> Result<(), KioskError> {
        info!("Adding display: {}", display_config.name);
        Ok(())
    }

    async fn remove_display(&self, name: &str) -> Result<(), KioskError> {
        info!("Removing display: {}", name);
        Ok(())
    }

    async fn edit_display(&self, display_config: &DisplayConfig) -> Result<(), KioskError> {
        info!("Editing display: {}", display_config.name);
        Ok(())
    }

    async fn add_tab(&self, display_name: &str, tab: &TabConfig) -> Result<(), KioskError> {
        info!("Adding tab to display {}: {}", display_name, tab.url);
        Ok(())
    }

    async fn remove_tab(&self, display_name: &str, url: &str) -> Result<(), KioskError> {
        info!("Removing tab from display {}: {}", display_name, url);
        Ok(())
    }

    async fn edit_tab(&self, display_name: &str, tab: &TabConfig) -> Result<(), KioskError> {
        info!("Editing tab on display {}: {}", display_name, tab.url);
        Ok(())
    }

    async fn reload_displays(&self) -> Result<(), KioskError> {
        info!("Reloading displays");
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.restart().await });
        Ok(())
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
