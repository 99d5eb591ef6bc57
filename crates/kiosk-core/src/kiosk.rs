//! Orchestrator: owns every display's runtime state and sequences a run.

use std::sync::Arc;
use std::time::Duration;

use kiosk_cdp::{CdpClient, RemoteControl};
use kiosk_config::{Config, ConfigValidator, DisplayKind};
use kiosk_window::{WindowId, WindowLocator, WindowManager, XdotoolWindowManager};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::cycler::TabCycler;
use crate::error::KioskError;
use crate::host::{ProcessHost, SystemHost};
use crate::launcher::DisplayLauncher;
use crate::state::{build_display_map, DisplayMap, DisplayState};
use crate::wait::sleep_or_cancel;

/// Key that toggles browser full-screen.
const FULLSCREEN_KEY: &str = "F11";

/// Delay before the full-screen key is sent.
const FULLSCREEN_DELAY: Duration = Duration::from_secs(1);

/// Handle on the active run, used by [`Kiosk::stop`].
struct RunHandle {
    cancel: CancellationToken,
    done: watch::Receiver<bool>,
}

/// The display orchestrator.
pub struct Kiosk {
    windows: WindowLocator,
    remote: Arc<dyn RemoteControl>,
    host: Arc<dyn ProcessHost>,
    config: RwLock<Arc<Config>>,
    displays: DisplayMap,
    active: Mutex<Option<RunHandle>>,
}

impl Kiosk {
    pub fn new(
        config: Config,
        windows: Arc<dyn WindowManager>,
        remote: Arc<dyn RemoteControl>,
        host: Arc<dyn ProcessHost>,
    ) -> Self {
        let displays = build_display_map(&config);
        Self {
            windows: WindowLocator::new(windows),
            remote,
            host,
            config: RwLock::new(Arc::new(config)),
            displays: Arc::new(Mutex::new(displays)),
            active: Mutex::new(None),
        }
    }

    /// Orchestrator driving real windows through `xdotool` and browsers
    /// on `localhost`.
    pub fn system(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(XdotoolWindowManager::new()),
            Arc::new(CdpClient::new()),
            Arc::new(SystemHost::new()),
        )
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<Config> {
        self.config.read().clone()
    }

    /// Replace the configuration and rebuild every display's state.
    pub fn load_config(&self, config: Config) {
        let displays = build_display_map(&config);
        info!("Loaded configuration with {} displays", displays.len());
        *self.displays.lock() = displays;
        *self.config.write() = Arc::new(config);
    }

    /// Snapshot of one display's runtime state.
    pub fn display_state(&self, name: &str) -> Option<DisplayState> {
        self.displays.lock().get(name).cloned()
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Bring every display up and cycle until `root` (or [`stop`]) cancels.
    ///
    /// The configuration is validated first; an invalid one (two browser
    /// displays on one debug port, for instance) fails the run before
    /// anything is launched. Displays are launched and positioned one at a
    /// time. A launch-phase failure cancels the run, closes whatever windows
    /// were opened and is returned. Cancellation is a normal exit.
    ///
    /// [`stop`]: Kiosk::stop
    pub async fn run(&self, root: &CancellationToken) -> Result<(), KioskError> {
        for warning in ConfigValidator::validate(&self.config()).into_result()? {
            debug!("{}: {}", warning.path, warning.message);
        }

        let cancel = root.child_token();
        let (done_tx, done_rx) = watch::channel(false);
        {
            let mut active = self.active.lock();
            if active.is_some() {
                return Err(KioskError::AlreadyRunning);
            }
            *active = Some(RunHandle {
                cancel: cancel.clone(),
                done: done_rx,
            });
        }

        // Each run starts from unbound state.
        let fresh = build_display_map(&self.config());
        *self.displays.lock() = fresh;

        let tracker = TaskTracker::new();
        let result = self.start_displays(&cancel, &tracker).await;
        if let Err(e) = &result {
            if !e.is_cancelled() {
                error!("Launch failed, stopping: {}", e);
            }
            cancel.cancel();
        }

        tracker.close();
        tracker.wait().await;
        debug!("All display tasks finished");

        self.close_windows().await;
        self.active.lock().take();
        let _ = done_tx.send(true);

        match result {
            Err(e) if e.is_cancelled() => Ok(()),
            other => other,
        }
    }

    /// Cancel the active run and wait until its tasks have drained and its
    /// windows are closed. A no-op when nothing is running.
    pub async fn stop(&self) {
        let handle = self
            .active
            .lock()
            .as_ref()
            .map(|handle| (handle.cancel.clone(), handle.done.clone()));

        let Some((cancel, mut done)) = handle else {
            debug!("Stop requested but kiosk is not running");
            return;
        };

        info!("Stopping kiosk");
        cancel.cancel();
        // An error means the run future was dropped; nothing left to wait for.
        let _ = done.wait_for(|finished| *finished).await;
    }

    async fn start_displays(
        &self,
        cancel: &CancellationToken,
        tracker: &TaskTracker,
    ) -> Result<(), KioskError> {
        let config = self.config();
        let launcher = DisplayLauncher::new(
            self.windows.clone(),
            self.remote.clone(),
            self.host.clone(),
            config.clone(),
            self.displays.clone(),
            tracker.clone(),
            cancel.clone(),
        );

        for display in &config.displays {
            if display.kind() == DisplayKind::Empty {
                continue;
            }
            launcher.launch(&display.name).await?;
            self.position_window(&display.name, display.x, display.y).await;
            if cancel.is_cancelled() {
                return Err(KioskError::Cancelled);
            }
        }

        for display in &config.displays {
            if display.fullscreen {
                self.send_key(&display.name, FULLSCREEN_KEY, FULLSCREEN_DELAY, cancel)
                    .await?;
            }

            let delay = display
                .exec
                .as_ref()
                .map(|exec| Duration::from_secs(exec.delay_before_send_keys))
                .unwrap_or_default();
            for key in display.send_keys() {
                self.send_key(&display.name, key, delay, cancel).await?;
            }
        }

        for display in &config.displays {
            match display.kind() {
                DisplayKind::Browser => {
                    let Some(state) = self.display_state(&display.name) else {
                        continue;
                    };
                    let mut cycler = TabCycler::new(
                        display.name.clone(),
                        state.debug_port,
                        state.tabs,
                        self.remote.clone(),
                        cancel.clone(),
                    )
                    .with_profile_dir(config.profile_dir(&display.name));
                    tracker.spawn(async move { cycler.run().await });
                }
                DisplayKind::Custom => {
                    let cancel = cancel.clone();
                    tracker.spawn(async move { cancel.cancelled().await });
                }
                DisplayKind::Empty => {}
            }
        }

        info!("All displays started");
        Ok(())
    }

    fn window_of(&self, name: &str) -> Option<WindowId> {
        self.displays
            .lock()
            .get(name)
            .and_then(|state| state.window_id.clone())
    }

    async fn position_window(&self, name: &str, x: i32, y: i32) {
        let Some(window) = self.window_of(name) else {
            warn!(display = %name, "No window to position");
            return;
        };
        let manager = self.windows.manager();

        info!(display = %name, "Activating window {}", window);
        if let Err(e) = manager.activate(&window).await {
            warn!(display = %name, "Error activating window {}: {}", window, e);
        }

        info!(display = %name, "Moving window {} to {}:{}", window, x, y);
        if let Err(e) = manager.move_to(&window, x, y).await {
            warn!(display = %name, "Error moving window {}: {}", window, e);
        }
    }

    async fn send_key(
        &self,
        name: &str,
        key: &str,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), KioskError> {
        let Some(window) = self.window_of(name) else {
            warn!(display = %name, "No window to send {} to", key);
            return Ok(());
        };

        sleep_or_cancel(delay, cancel).await?;
        let manager = self.windows.manager();

        if let Err(e) = manager.activate(&window).await {
            warn!(display = %name, "Error activating window {}: {}", window, e);
        }

        info!(display = %name, "Sending {} to window {}", key, window);
        if let Err(e) = manager.send_key(&window, key).await {
            warn!(display = %name, "Error sending {} to window {}: {}", key, window, e);
        }
        Ok(())
    }

    /// Close every bound window. Each handle is taken, so a window is
    /// closed at most once.
    async fn close_windows(&self) {
        let windows: Vec<(String, WindowId)> = self
            .displays
            .lock()
            .iter_mut()
            .filter_map(|(name, state)| state.window_id.take().map(|id| (name.clone(), id)))
            .collect();

        for (name, window) in windows {
            info!(display = %name, "Closing window {}", window);
            if let Err(e) = self.windows.manager().close(&window).await {
                warn!(display = %name, "Error closing window {}: {}", window, e);
            }
        }
    }
}

#[cfg(test)]
#[path = "kiosk_tests.rs"]
mod tests;
