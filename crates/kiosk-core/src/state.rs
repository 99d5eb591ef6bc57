//! Per-display runtime state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use kiosk_config::{Config, DisplayConfig, TabConfig};
use kiosk_window::WindowId;
use parking_lot::Mutex;
use tokio::time::Instant;

/// Display name to runtime state, shared by the orchestrator and launcher.
pub type DisplayMap = Arc<Mutex<HashMap<String, DisplayState>>>;

/// Runtime view of one tab.
#[derive(Debug, Clone)]
pub struct TabState {
    pub config: TabConfig,
    /// How long the tab stays in front.
    pub dwell: Duration,
    /// Browser target id, once bound.
    pub target_id: Option<String>,
    /// Control-channel address, once bound.
    pub control_url: Option<String>,
    /// Last successful navigation; starts at load time.
    pub last_navigation: Instant,
}

impl TabState {
    pub fn new(config: TabConfig, dwell: Duration) -> Self {
        Self {
            config,
            dwell,
            target_id: None,
            control_url: None,
            last_navigation: Instant::now(),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.target_id.is_some()
    }
}

/// Runtime view of one display.
#[derive(Debug, Clone)]
pub struct DisplayState {
    pub config: DisplayConfig,
    /// Port after falling back to the process-wide default.
    pub debug_port: u16,
    pub tabs: Vec<TabState>,
    pub window_id: Option<WindowId>,
}

impl DisplayState {
    pub fn new(config: &Config, display: &DisplayConfig) -> Self {
        let tabs = display
            .tabs
            .iter()
            .map(|tab| {
                let dwell = Duration::from_secs(config.resolved_dwell_time(tab));
                TabState::new(tab.clone(), dwell)
            })
            .collect();

        Self {
            config: display.clone(),
            debug_port: config.resolved_debug_port(display),
            tabs,
            window_id: None,
        }
    }

    /// Whether `target_id` is already bound to one of this display's tabs.
    pub fn has_target(&self, target_id: &str) -> bool {
        self.tabs
            .iter()
            .any(|tab| tab.target_id.as_deref() == Some(target_id))
    }
}

/// Build the state map for every display in `config`.
///
/// The first display wins when names repeat.
pub fn build_display_map(config: &Config) -> HashMap<String, DisplayState> {
    let mut map = HashMap::with_capacity(config.displays.len());
    for display in &config.displays {
        map.entry(display.name.clone())
            .or_insert_with(|| DisplayState::new(config, display));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            dwell_time: 20,
            debug_port: 9222,
            displays: vec![
                DisplayConfig {
                    name: "Lobby".to_string(),
                    tabs: vec![
                        TabConfig {
                            url: "https://a.example".to_string(),
                            dwell_time: 5,
                            ..Default::default()
                        },
                        TabConfig {
                            url: "https://b.example".to_string(),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
                DisplayConfig {
                    name: "Lobby".to_string(),
                    debug_port: 9300,
                    ..Default::default()
                },
                DisplayConfig {
                    name: "Hall".to_string(),
                    debug_port: 9301,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_build_display_map() {
        let map = build_display_map(&sample_config());
        assert_eq!(map.len(), 2);

        let lobby = &map["Lobby"];
        assert_eq!(lobby.debug_port, 9222);
        assert_eq!(lobby.tabs.len(), 2);
        assert_eq!(lobby.tabs[0].dwell, Duration::from_secs(5));
        assert_eq!(lobby.tabs[1].dwell, Duration::from_secs(20));
        assert!(lobby.window_id.is_none());
        assert!(!lobby.tabs[0].is_bound());

        assert_eq!(map["Hall"].debug_port, 9301);
    }

    #[test]
    fn test_has_target() {
        let mut map = build_display_map(&sample_config());
        let lobby = map.get_mut("Lobby").unwrap();
        lobby.tabs[1].target_id = Some("T2".to_string());
        assert!(lobby.has_target("T2"));
        assert!(!lobby.has_target("T1"));
    }
}
