//! # Kiosk Core
//!
//! Display and tab lifecycle orchestration.
//!
//! A [`Kiosk`] run goes through three phases:
//!
//! 1. **Launch**: each display is started and positioned in turn by the
//!    [`DisplayLauncher`]. Browser displays also get their tabs bound to
//!    debug-protocol targets.
//! 2. **Keys**: full-screen and scripted keys are sent once every display
//!    is up.
//! 3. **Cycle**: one [`TabCycler`] per browser display (custom-command
//!    displays just idle) runs until the run is cancelled.
//!
//! All waits race a single cancellation token. When it fires, every task
//! drains and the windows are closed.

mod control;
mod cycler;
mod error;
mod host;
mod kiosk;
mod launcher;
mod state;
mod wait;

#[cfg(test)]
mod testing;

pub use control::{KioskControl, NoopControl, ReloadingControl};
pub use cycler::{CyclerState, TabCycler};
pub use error::KioskError;
pub use host::{ProcessHost, SystemHost};
pub use kiosk::Kiosk;
pub use launcher::{browser_args, new_tab_args, DisplayLauncher};
pub use state::{build_display_map, DisplayMap, DisplayState, TabState};
pub use wait::{sleep_or_cancel, Cancelled};

// Re-exported for callers driving a run.
pub use tokio_util::sync::CancellationToken;
