//! Window discovery and control for kiosk displays.
//!
//! Windows are driven through an external window-manager tool (`xdotool`)
//! behind the [`WindowManager`] trait. [`WindowLocator`] works out which
//! window a freshly launched program opened by diffing snapshots of the
//! visible windows taken before and after the launch.
//!
//! ## Operations
//! - `search` - List visible windows whose name matches a pattern
//! - `activate` - Raise and focus a window
//! - `move_to` - Move a window to screen coordinates
//! - `send_key` - Send a key (e.g. `F11`) to a window
//! - `close` - Close a window

mod locator;
mod manager;
mod parsers;
mod window_types;

pub use locator::WindowLocator;
pub use manager::{WindowManager, XdotoolWindowManager};
pub use parsers::parse_window_ids;
pub use window_types::{WindowError, WindowId};

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
