//! Configuration schema definitions.

use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lowest port handed out by [`Config::next_debug_port`] is one above this.
const DEBUG_PORT_FLOOR: u16 = 9000;

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Dwell time for new tabs, and the fallback for tabs configured with 0.
    #[serde(default = "default_dwell_time")]
    pub dwell_time: u64,

    /// Process-wide debug port used by displays that do not set their own.
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    /// Geometry passed to the browser as `--window-size`.
    #[serde(default = "default_window_size")]
    pub new_window_size: String,

    /// Browser executable.
    #[serde(default = "default_browser")]
    pub browser: String,

    /// Window-name pattern matching browser windows.
    #[serde(default = "default_browser_window_search")]
    pub browser_window_search: String,

    /// Directory holding the per-display browser profiles.
    #[serde(default = "default_profile_root")]
    pub profile_root: PathBuf,

    #[serde(default)]
    pub displays: Vec<DisplayConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dwell_time: default_dwell_time(),
            debug_port: default_debug_port(),
            new_window_size: default_window_size(),
            browser: default_browser(),
            browser_window_search: default_browser_window_search(),
            profile_root: default_profile_root(),
            displays: Vec::new(),
        }
    }
}

fn default_dwell_time() -> u64 {
    30
}

fn default_debug_port() -> u16 {
    9222
}

fn default_window_size() -> String {
    "1920,1080".to_string()
}

fn default_browser() -> String {
    "chromium".to_string()
}

fn default_browser_window_search() -> String {
    "chromium".to_string()
}

fn default_profile_root() -> PathBuf {
    PathBuf::from("/tmp")
}

/// One physical output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConfig {
    pub name: String,

    /// Debug port for this display; 0 falls back to [`Config::debug_port`].
    #[serde(default)]
    pub debug_port: u16,

    #[serde(default)]
    pub x: i32,

    #[serde(default)]
    pub y: i32,

    #[serde(default)]
    pub fullscreen: bool,

    /// Cycling order.
    #[serde(default)]
    pub tabs: Vec<TabConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecConfig>,
}

/// What a display runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    /// Browser window cycling through tabs.
    Browser,
    /// External program with a tracked window.
    Custom,
    /// Nothing configured; skipped by the orchestrator.
    Empty,
}

impl DisplayConfig {
    /// Classify the display. A configured command wins over tabs.
    pub fn kind(&self) -> DisplayKind {
        match &self.exec {
            Some(exec) if !exec.command.is_empty() => DisplayKind::Custom,
            _ if !self.tabs.is_empty() => DisplayKind::Browser,
            _ => DisplayKind::Empty,
        }
    }

    /// Keys to inject after launch, with blanks removed.
    pub fn send_keys(&self) -> impl Iterator<Item = &str> {
        self.exec
            .iter()
            .flat_map(|exec| exec.send_keys.iter())
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }
}

/// One browser tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabConfig {
    pub url: String,

    #[serde(default)]
    pub refresh_before_load: bool,

    #[serde(default)]
    pub refresh_after_load: bool,

    /// Seconds between forced refreshes; 0 disables.
    #[serde(default)]
    pub refresh_interval: u64,

    /// Seconds to let the page settle after a refresh.
    #[serde(default)]
    pub delay_after_refresh: u64,

    /// Seconds the tab stays in front.
    #[serde(default)]
    pub dwell_time: u64,
}

/// Custom command launched instead of a browser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecConfig {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Window-name pattern used to find the window the command opens.
    #[serde(default)]
    pub window_search: String,

    #[serde(default)]
    pub send_keys: Vec<String>,

    /// Seconds to wait before each key is sent.
    #[serde(default)]
    pub delay_before_send_keys: u64,
}

impl Config {
    /// Position of the display called `name`.
    pub fn index_of_display(&self, name: &str) -> Option<usize> {
        self.displays.iter().position(|d| d.name == name)
    }

    pub fn display(&self, name: &str) -> Option<&DisplayConfig> {
        self.displays.iter().find(|d| d.name == name)
    }

    /// One above the highest configured display port, never below 9001.
    pub fn next_debug_port(&self) -> u16 {
        let highest = self
            .displays
            .iter()
            .map(|d| d.debug_port)
            .fold(DEBUG_PORT_FLOOR, u16::max);
        highest.saturating_add(1)
    }

    /// Suggest a name for a new display based on the last one.
    pub fn next_display_name(&self) -> String {
        let Some(last) = self.displays.last().map(|d| d.name.as_str()) else {
            return "Display0".to_string();
        };

        let re = Regex::new(r"\d+$").expect("static regex");
        match re.find(last) {
            Some(m) => match m.as_str().parse::<u64>() {
                Ok(n) => format!("{}{}", &last[..m.start()], n + 1),
                Err(_) => format!("{last}-1"),
            },
            None => format!("{last}-1"),
        }
    }

    /// Debug port a display will actually use.
    pub fn resolved_debug_port(&self, display: &DisplayConfig) -> u16 {
        if display.debug_port != 0 {
            display.debug_port
        } else {
            self.debug_port
        }
    }

    /// Dwell time a tab will actually use.
    pub fn resolved_dwell_time(&self, tab: &TabConfig) -> u64 {
        if tab.dwell_time != 0 {
            tab.dwell_time
        } else {
            self.dwell_time
        }
    }

    /// Profile directory owned by the display called `name`.
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.profile_root.join(format!(".kiosk-chrome-user-data-{name}"))
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
