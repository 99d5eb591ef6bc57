//! Display Launcher: brings one display's window, and its tabs, up.
//!
//! Browser displays go through these phases, each racing the run's
//! cancellation token:
//!
//! 1. Empty the display's profile directory and check the debug port is free.
//! 2. Snapshot visible browser windows, then start the browser.
//! 3. Wait for the debug endpoint to answer.
//! 4. Resolve the new window (every 250ms) and bind it.
//! 5. Bind tab 0 to the first unbound page target, then for every further
//!    tab open it with `--new-tab` and bind it the same way.
//!
//! Tabs are bound strictly one at a time in configured order, so the n-th
//! configured tab is paired with the n-th target the browser created even
//! though `/json` lists targets in no particular order.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kiosk_cdp::{CdpError, RemoteControl};
use kiosk_config::{Config, DisplayConfig, DisplayKind};
use kiosk_window::{WindowId, WindowLocator};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::error::KioskError;
use crate::host::ProcessHost;
use crate::state::DisplayMap;
use crate::wait::sleep_or_cancel;

/// Interval between window searches after a browser launch.
const BROWSER_WINDOW_POLL: Duration = Duration::from_millis(250);

/// Interval between window searches after a custom command launch.
const CUSTOM_WINDOW_POLL: Duration = Duration::from_secs(1);

/// Interval between target listings while binding a tab.
const TARGET_POLL: Duration = Duration::from_secs(1);

/// Launches displays for one orchestrator run.
pub struct DisplayLauncher {
    windows: WindowLocator,
    remote: Arc<dyn RemoteControl>,
    host: Arc<dyn ProcessHost>,
    config: Arc<Config>,
    displays: DisplayMap,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl DisplayLauncher {
    pub fn new(
        windows: WindowLocator,
        remote: Arc<dyn RemoteControl>,
        host: Arc<dyn ProcessHost>,
        config: Arc<Config>,
        displays: DisplayMap,
        tracker: TaskTracker,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            windows,
            remote,
            host,
            config,
            displays,
            tracker,
            cancel,
        }
    }

    /// Launch the display called `name`.
    ///
    /// Errors other than [`KioskError::Cancelled`] are fatal for the run.
    pub async fn launch(&self, name: &str) -> Result<(), KioskError> {
        let Some(display) = self.config.display(name) else {
            warn!(display = %name, "No configuration found, skipping launch");
            return Ok(());
        };

        match display.kind() {
            DisplayKind::Browser => self.launch_browser(display).await,
            DisplayKind::Custom => self.launch_custom(display).await,
            DisplayKind::Empty => {
                debug!(display = %name, "Nothing to launch");
                Ok(())
            }
        }
    }

    async fn launch_browser(&self, display: &DisplayConfig) -> Result<(), KioskError> {
        let name = display.name.as_str();
        let port = self.config.resolved_debug_port(display);
        let profile = self.config.profile_dir(name);

        reset_profile(&profile)
            .await
            .map_err(|e| KioskError::launch(name, format!("{}: {}", profile.display(), e)))?;

        if self.host.port_in_use(port).await {
            return Err(KioskError::PortInUse {
                display: name.to_string(),
                port,
            });
        }

        let search = self.config.browser_window_search.as_str();
        let before = self.windows.list_visible(search).await;

        let first_url = display.tabs.first().map(|t| t.url.as_str()).unwrap_or_default();
        let args = browser_args(&self.config, &profile, port, first_url);
        info!(display = %name, port, "Launching {}", self.config.browser);
        self.host
            .spawn(&self.config.browser, &args, &self.tracker, &self.cancel)
            .map_err(|e| KioskError::launch(name, e))?;

        self.remote
            .wait_until_reachable(port, None, &self.cancel)
            .await
            .map_err(|e| match e {
                CdpError::Cancelled => KioskError::Cancelled,
                other => KioskError::Unreachable {
                    display: name.to_string(),
                    port,
                    reason: other.to_string(),
                },
            })?;

        let window = self
            .await_window(name, search, &before, BROWSER_WINDOW_POLL)
            .await?;
        self.bind_window(name, window);

        self.bind_tab(name, port, 0).await?;
        for (index, tab) in display.tabs.iter().enumerate().skip(1) {
            self.host
                .spawn(
                    &self.config.browser,
                    &new_tab_args(&profile, &tab.url),
                    &self.tracker,
                    &self.cancel,
                )
                .map_err(|e| KioskError::launch(name, e))?;
            self.bind_tab(name, port, index).await?;
        }

        Ok(())
    }

    async fn launch_custom(&self, display: &DisplayConfig) -> Result<(), KioskError> {
        let name = display.name.as_str();
        let Some(exec) = display.exec.as_ref() else {
            return Ok(());
        };

        let before = self.windows.list_visible(&exec.window_search).await;

        info!(
            display = %name,
            "Launching custom command: {} with args: {:?}", exec.command, exec.args
        );
        self.host
            .spawn(&exec.command, &exec.args, &self.tracker, &self.cancel)
            .map_err(|e| KioskError::launch(name, e))?;

        let window = self
            .await_window(name, &exec.window_search, &before, CUSTOM_WINDOW_POLL)
            .await?;
        self.bind_window(name, window);
        Ok(())
    }

    /// Poll until a window not present in `before` shows up.
    async fn await_window(
        &self,
        name: &str,
        pattern: &str,
        before: &[WindowId],
        interval: Duration,
    ) -> Result<WindowId, KioskError> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(KioskError::Cancelled);
            }

            let after = self.windows.list_visible(pattern).await;
            let taken = self.windows_bound_elsewhere(name);
            match WindowLocator::resolve_new(name, before, &after, &taken) {
                Ok(id) => return Ok(id),
                Err(e) => debug!(display = %name, "{}", e),
            }

            sleep_or_cancel(interval, &self.cancel).await?;
        }
    }

    fn windows_bound_elsewhere(&self, name: &str) -> HashSet<WindowId> {
        self.displays
            .lock()
            .iter()
            .filter(|(other, _)| other.as_str() != name)
            .filter_map(|(_, state)| state.window_id.clone())
            .collect()
    }

    fn bind_window(&self, name: &str, window: WindowId) {
        if let Some(state) = self.displays.lock().get_mut(name) {
            state.window_id = Some(window);
        }
    }

    /// Bind tab `index` to the first page target not yet bound to this display.
    async fn bind_tab(&self, name: &str, port: u16, index: usize) -> Result<(), KioskError> {
        loop {
            match self.remote.list_targets(port).await {
                Ok(targets) => {
                    let mut displays = self.displays.lock();
                    let state = displays
                        .get_mut(name)
                        .ok_or_else(|| KioskError::launch(name, "display state missing"))?;

                    let fresh = targets
                        .iter()
                        .filter(|target| {
                            target.is_page()
                                && !target.id.is_empty()
                                && !state.has_target(&target.id)
                        })
                        .find_map(|target| Some((target, target.control_url()?)));

                    if let Some((target, control_url)) = fresh {
                        let tab = state.tabs.get_mut(index).ok_or_else(|| {
                            KioskError::launch(name, format!("no tab at index {}", index))
                        })?;
                        tab.target_id = Some(target.id.clone());
                        tab.control_url = Some(control_url.to_string());
                        info!(
                            display = %name,
                            "Tab: {} (ID: {}, WS: {})", tab.config.url, target.id, control_url
                        );
                        return Ok(());
                    }
                }
                Err(e) => debug!(display = %name, "Failed to fetch tabs: {}", e),
            }

            sleep_or_cancel(TARGET_POLL, &self.cancel).await?;
        }
    }
}

/// Arguments for the first browser launch of a display.
pub fn browser_args(config: &Config, profile: &Path, port: u16, url: &str) -> Vec<String> {
    vec![
        format!("--user-data-dir={}", profile.display()),
        format!("--window-size={}", config.new_window_size),
        format!("--remote-debugging-port={}", port),
        format!("--remote-allow-origins=http://localhost:{}", port),
        "--disable-session-crashed-bubble".to_string(),
        "--disable-session-restore".to_string(),
        "--disable-infobars".to_string(),
        "--no-default-browser-check".to_string(),
        "--no-first-run".to_string(),
        "--disable-extensions".to_string(),
        "--new-window".to_string(),
        url.to_string(),
    ]
}

/// Arguments that open `url` as a new tab in the browser owning `profile`.
pub fn new_tab_args(profile: &Path, url: &str) -> Vec<String> {
    vec![
        "--new-tab".to_string(),
        url.to_string(),
        format!("--user-data-dir={}", profile.display()),
    ]
}

/// Empty `dir`, creating it when missing.
pub(crate) async fn reset_profile(dir: &Path) -> std::io::Result<()> {
    remove_profile(dir).await?;
    tokio::fs::create_dir_all(dir).await
}

/// Delete `dir`; a missing directory is not an error.
pub(crate) async fn remove_profile(dir: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
