//! Runtime dependency checks.

use kiosk_config::Config;
use thiserror::Error;
use tracing::{debug, warn};

/// Window-manager tool every display needs.
const WINDOW_TOOL: &str = "xdotool";

/// Used to probe debug ports; optional.
const PORT_PROBE_TOOL: &str = "lsof";

#[derive(Debug, Error)]
#[error("Missing dependencies: {}", .0.join(", "))]
pub(crate) struct MissingDependencies(pub Vec<String>);

/// Verify the external programs the kiosk drives are on `PATH`.
pub(crate) fn check_dependencies(config: &Config) -> Result<(), MissingDependencies> {
    let mut missing = Vec::new();
    for program in [WINDOW_TOOL, config.browser.as_str()] {
        match which::which(program) {
            Ok(path) => debug!("Found {} at {}", program, path.display()),
            Err(_) => missing.push(program.to_string()),
        }
    }

    if which::which(PORT_PROBE_TOOL).is_err() {
        warn!("{} not found; debug ports will not be checked before launch", PORT_PROBE_TOOL);
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingDependencies(missing))
    }
}
