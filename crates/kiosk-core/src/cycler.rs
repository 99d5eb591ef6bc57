//! Tab Cycler: the per-display loop that rotates through tabs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kiosk_cdp::RemoteControl;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::launcher::remove_profile;
use crate::state::TabState;
use crate::wait::{sleep_or_cancel, Cancelled};

/// Where a cycler is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclerState {
    /// Not started yet.
    Idle,
    /// Bringing tab `i` to the front.
    Activating(usize),
    /// Applying the refresh policy of tab `i`.
    MaybeRefreshing(usize),
    /// Tab `i` is on screen.
    Dwelling(usize),
    /// Cancelled; terminal.
    Stopped,
}

/// Cycles one display's tabs until cancelled.
///
/// Owns its copy of the tab list, so it is the only writer of each tab's
/// `last_navigation`.
pub struct TabCycler {
    name: String,
    port: u16,
    tabs: Vec<TabState>,
    remote: Arc<dyn RemoteControl>,
    cancel: CancellationToken,
    profile_dir: Option<PathBuf>,
    state: CyclerState,
}

impl TabCycler {
    pub fn new(
        name: impl Into<String>,
        port: u16,
        tabs: Vec<TabState>,
        remote: Arc<dyn RemoteControl>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            name: name.into(),
            port,
            tabs,
            remote,
            cancel,
            profile_dir: None,
            state: CyclerState::Idle,
        }
    }

    /// Remove `dir` once the cycler stops.
    pub fn with_profile_dir(mut self, dir: PathBuf) -> Self {
        self.profile_dir = Some(dir);
        self
    }

    pub fn state(&self) -> CyclerState {
        self.state
    }

    pub fn tabs(&self) -> &[TabState] {
        &self.tabs
    }

    /// Loop over the tabs in order until the token is cancelled.
    pub async fn run(&mut self) {
        if self.tabs.is_empty() {
            debug!(display = %self.name, "No tabs to cycle");
            self.cancel.cancelled().await;
        } else {
            'cycle: loop {
                for index in 0..self.tabs.len() {
                    if self.step(index).await.is_err() {
                        break 'cycle;
                    }
                }
            }
        }

        self.state = CyclerState::Stopped;
        debug!(display = %self.name, "Tab cycler stopped");

        if let Some(dir) = self.profile_dir.take() {
            if let Err(e) = remove_profile(&dir).await {
                warn!(display = %self.name, "Failed to remove {}: {}", dir.display(), e);
            }
        }
    }

    /// One pass over tab `index`: refresh policy, activation, dwell.
    async fn step(&mut self, index: usize) -> Result<(), Cancelled> {
        self.state = CyclerState::MaybeRefreshing(index);
        let tab = &self.tabs[index];
        let interval = tab.config.refresh_interval;
        let mut refreshed = false;

        if interval > 0 && tab.last_navigation.elapsed() > Duration::from_secs(interval) {
            refreshed = self.refresh(index).await?;
        }

        if !refreshed && self.tabs[index].config.refresh_before_load {
            refreshed = self.refresh(index).await?;
        }

        self.state = CyclerState::Activating(index);
        let tab = &self.tabs[index];
        info!(
            display = %self.name,
            "Activating tab {} for {} seconds", tab.config.url, tab.dwell.as_secs()
        );
        match tab.target_id.as_deref() {
            Some(target_id) => {
                if let Err(e) = self.remote.activate(self.port, target_id).await {
                    warn!(display = %self.name, "Error activating tab {}: {}", target_id, e);
                }
            }
            None => warn!(display = %self.name, "Tab {} has no target", tab.config.url),
        }

        if !refreshed && self.tabs[index].config.refresh_after_load {
            self.state = CyclerState::MaybeRefreshing(index);
            self.refresh(index).await?;
        }

        self.state = CyclerState::Dwelling(index);
        sleep_or_cancel(self.tabs[index].dwell, &self.cancel).await
    }

    /// Navigate the tab to its own URL and let it settle.
    ///
    /// `Ok(false)` when the command could not be sent.
    async fn refresh(&mut self, index: usize) -> Result<bool, Cancelled> {
        let tab = &self.tabs[index];
        info!(display = %self.name, "Refreshing tab {}", tab.config.url);

        let control_url = tab.control_url.as_deref().unwrap_or_default();
        if let Err(e) = self.remote.navigate(control_url, &tab.config.url).await {
            warn!(display = %self.name, "Error refreshing tab {}: {}", tab.config.url, e);
            return Ok(false);
        }

        let settle = Duration::from_secs(tab.config.delay_after_refresh);
        if !settle.is_zero() {
            sleep_or_cancel(settle, &self.cancel).await?;
        }

        self.tabs[index].last_navigation = Instant::now();
        debug!(display = %self.name, "Tab {} refreshed", self.tabs[index].config.url);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "cycler_tests.rs"]
mod tests;
