//! Working out which window a launch produced.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::manager::WindowManager;
use crate::window_types::{WindowError, WindowId};

/// Pattern used when no search name is configured.
const MATCH_ALL: &str = ".*";

/// Snapshots visible windows and picks out newly opened ones.
#[derive(Clone)]
pub struct WindowLocator {
    manager: Arc<dyn WindowManager>,
}

impl WindowLocator {
    pub fn new(manager: Arc<dyn WindowManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<dyn WindowManager> {
        &self.manager
    }

    /// Visible windows matching `pattern`; an empty pattern matches all.
    ///
    /// Never fails: a tool error (xdotool exits non-zero when nothing
    /// matches) is reported as an empty list.
    pub async fn list_visible(&self, pattern: &str) -> Vec<WindowId> {
        let pattern = if pattern.is_empty() { MATCH_ALL } else { pattern };
        match self.manager.search_visible(pattern).await {
            Ok(ids) => ids,
            Err(e) => {
                debug!("Window search for {:?} returned nothing: {}", pattern, e);
                Vec::new()
            }
        }
    }

    /// Pick the window that appeared between `before` and `after`.
    ///
    /// Candidates are `after - before`. The first candidate not already
    /// bound to another display (`taken`) wins. When every candidate is
    /// taken the last raw candidate is returned anyway: a wrong window is
    /// preferred over blocking forever on an ambiguous window-manager
    /// report. This fallback is timing dependent.
    pub fn resolve_new(
        name: &str,
        before: &[WindowId],
        after: &[WindowId],
        taken: &HashSet<WindowId>,
    ) -> Result<WindowId, WindowError> {
        if after.is_empty() {
            return Err(WindowError::NoVisibleWindows(name.to_string()));
        }

        let existing: HashSet<&WindowId> = before.iter().collect();
        let candidates: Vec<&WindowId> = after.iter().filter(|id| !existing.contains(id)).collect();

        let Some(last) = candidates.last() else {
            return Err(WindowError::NoNewWindow(name.to_string()));
        };

        if let Some(id) = candidates.iter().find(|id| !taken.contains(**id)) {
            info!(display = %name, window = %id, "Opened window");
            return Ok((*id).clone());
        }

        warn!(
            display = %name,
            window = %last,
            candidates = candidates.len(),
            "Every new window is already bound to another display, using the most recent one"
        );
        Ok((*last).clone())
    }
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
