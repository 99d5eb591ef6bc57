//! Output parsers for window-manager commands.

use crate::window_types::WindowId;

/// Parse `xdotool search` output: one decimal window id per line.
///
/// Blank and non-numeric lines are dropped.
pub fn parse_window_ids(output: &str) -> Vec<WindowId> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| line.parse::<u64>().is_ok())
        .map(WindowId::from)
        .collect()
}
