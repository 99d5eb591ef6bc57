//! Shared state for the administration API.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use kiosk_config::{Config, ConfigLoader};
use kiosk_core::KioskControl;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::error::AdminError;

/// Editable configuration plus the orchestrator it reports changes to.
pub struct AdminState {
    config: RwLock<Config>,
    /// Serializes edits so saves land on disk in edit order.
    save_lock: Mutex<()>,
    config_path: PathBuf,
    control: Arc<dyn KioskControl>,
    started_at: Instant,
}

impl AdminState {
    pub fn new(config: Config, config_path: impl Into<PathBuf>, control: Arc<dyn KioskControl>) -> Self {
        Self {
            config: RwLock::new(config),
            save_lock: Mutex::new(()),
            config_path: config_path.into(),
            control,
            started_at: Instant::now(),
        }
    }

    pub fn snapshot(&self) -> Config {
        self.config.read().clone()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn control(&self) -> &Arc<dyn KioskControl> {
        &self.control
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Apply `edit` to the in-memory configuration and write it to disk.
    ///
    /// The write happens on the blocking pool after the lock is released.
    /// A failed save is logged; the edit stays in memory.
    pub async fn update<T>(
        &self,
        edit: impl FnOnce(&mut Config) -> Result<T, AdminError>,
    ) -> Result<T, AdminError> {
        let _saving = self.save_lock.lock().await;
        let (out, snapshot) = {
            let mut config = self.config.write();
            let out = edit(&mut config)?;
            (out, config.clone())
        };

        let path = self.config_path.clone();
        let saved = tokio::task::spawn_blocking(move || ConfigLoader::save(&snapshot, &path)).await;
        match saved {
            Ok(Ok(())) => info!("Saved configuration to {}", self.config_path.display()),
            Ok(Err(e)) => error!("Error saving config to {}: {}", self.config_path.display(), e),
            Err(e) => error!("Config save task failed: {}", e),
        }
        Ok(out)
    }
}
