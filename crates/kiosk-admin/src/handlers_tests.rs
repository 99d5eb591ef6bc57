use super::*;

use std::path::PathBuf;

use async_trait::async_trait;
use kiosk_config::{Config, ConfigLoader};
use kiosk_core::{KioskControl, KioskError};
use parking_lot::Mutex;

/// Records every notification it receives.
#[derive(Default)]
struct RecordingControl {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingControl {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn record(&self, call: String) -> Result<(), KioskError> {
        self.calls.lock().push(call);
        if self.fail {
            return Err(KioskError::AlreadyRunning);
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl KioskControl for RecordingControl {
    async fn add_display(&self, display: &DisplayConfig) -> Result<(), KioskError> {
        self.record(format!("add_display {}", display.name))
    }

    async fn remove_display(&self, name: &str) -> Result<(), KioskError> {
        self.record(format!("remove_display {}", name))
    }

    async fn edit_display(&self, display: &DisplayConfig) -> Result<(), KioskError> {
        self.record(format!("edit_display {}", display.name))
    }

    async fn add_tab(&self, display: &str, tab: &TabConfig) -> Result<(), KioskError> {
        self.record(format!("add_tab {} {}", display, tab.url))
    }

    async fn remove_tab(&self, display: &str, url: &str) -> Result<(), KioskError> {
        self.record(format!("remove_tab {} {}", display, url))
    }

    async fn edit_tab(&self, display: &str, tab: &TabConfig) -> Result<(), KioskError> {
        self.record(format!("edit_tab {} {}", display, tab.url))
    }

    async fn reload_displays(&self) -> Result<(), KioskError> {
        self.record("reload".to_string())
    }
}

fn lobby() -> DisplayConfig {
    DisplayConfig {
        name: "Lobby".to_string(),
        debug_port: 9300,
        tabs: vec![TabConfig {
            url: "https://a.example".to_string(),
            dwell_time: 10,
            ..Default::default()
        }],
        ..Default::default()
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    path: PathBuf,
    state: Arc<AdminState>,
    control: Arc<RecordingControl>,
}

impl Fixture {
    fn with_control(control: RecordingControl) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.yml");
        let config = Config {
            displays: vec![lobby()],
            ..Default::default()
        };
        ConfigLoader::save(&config, &path).unwrap();

        let control = Arc::new(control);
        let state = Arc::new(AdminState::new(config, &path, control.clone()));
        Self {
            _dir: dir,
            path,
            state,
            control,
        }
    }

    fn new() -> Self {
        Self::with_control(RecordingControl::default())
    }

    fn saved(&self) -> Config {
        ConfigLoader::load(&self.path).unwrap()
    }
}

#[tokio::test]
async fn test_defaults_follow_config() {
    let f = Fixture::new();
    let Json(defaults) = display_defaults(State(f.state.clone())).await;
    assert_eq!(defaults.name, "Lobby-1");
    assert_eq!(defaults.debug_port, 9301);
    assert_eq!(defaults.tab.dwell_time, 30);
    assert_eq!(defaults.tab.refresh_interval, 30);
    assert_eq!(defaults.tab.delay_after_refresh, 3);
}

#[tokio::test]
async fn test_add_display_fills_defaults_and_saves() {
    let f = Fixture::new();
    let response = add_display(State(f.state.clone()), Json(NewDisplay::default()))
        .await
        .unwrap()
        .into_response();
    assert_eq!(response.status(), StatusCode::CREATED);

    let saved = f.saved();
    assert_eq!(saved.displays.len(), 2);
    assert_eq!(saved.displays[1].name, "Lobby-1");
    assert_eq!(saved.displays[1].debug_port, 9301);
    assert!(saved.displays[1].tabs.is_empty());
    assert_eq!(f.control.calls(), vec!["add_display Lobby-1"]);
}

#[tokio::test]
async fn test_add_duplicate_display_conflicts() {
    let f = Fixture::new();
    let req = NewDisplay {
        name: Some("Lobby".to_string()),
        ..Default::default()
    };
    let err = add_display(State(f.state.clone()), Json(req))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AdminError::DisplayExists(ref name) if name == "Lobby"));
    assert!(f.control.calls().is_empty());
    assert_eq!(f.saved().displays.len(), 1);
}

#[tokio::test]
async fn test_edit_display_keeps_tabs() {
    let f = Fixture::new();
    let req = DisplayUpdate {
        debug_port: 9400,
        x: 1920,
        fullscreen: true,
        ..Default::default()
    };
    let Json(display) = edit_display(State(f.state.clone()), Path("Lobby".to_string()), Json(req))
        .await
        .unwrap();

    assert_eq!(display.debug_port, 9400);
    assert_eq!(display.x, 1920);
    assert!(display.fullscreen);
    assert_eq!(display.tabs.len(), 1);
    assert_eq!(f.saved().displays[0], display);
    assert_eq!(f.control.calls(), vec!["edit_display Lobby"]);
}

#[tokio::test]
async fn test_edit_missing_display() {
    let f = Fixture::new();
    let err = edit_display(
        State(f.state.clone()),
        Path("Nowhere".to_string()),
        Json(DisplayUpdate::default()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_display() {
    let f = Fixture::new();
    let status = remove_display(State(f.state.clone()), Path("Lobby".to_string()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(f.saved().displays.is_empty());
    assert_eq!(f.control.calls(), vec!["remove_display Lobby"]);

    let err = remove_display(State(f.state.clone()), Path("Lobby".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::DisplayNotFound(_)));
}

#[tokio::test]
async fn test_add_tab_appends() {
    let f = Fixture::new();
    let tab = TabConfig {
        url: "https://b.example".to_string(),
        ..Default::default()
    };
    add_tab(State(f.state.clone()), Path("Lobby".to_string()), Json(tab))
        .await
        .unwrap();

    let urls: Vec<_> = f.saved().displays[0]
        .tabs
        .iter()
        .map(|t| t.url.clone())
        .collect();
    assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
    assert_eq!(f.control.calls(), vec!["add_tab Lobby https://b.example"]);
}

#[tokio::test]
async fn test_add_tab_rejects_empty_url() {
    let f = Fixture::new();
    let err = add_tab(
        State(f.state.clone()),
        Path("Lobby".to_string()),
        Json(TabConfig::default()),
    )
    .await
    .err()
    .unwrap();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(f.saved().displays[0].tabs.len(), 1);
}

#[tokio::test]
async fn test_edit_tab_replaces_by_original_url() {
    let f = Fixture::new();
    let req = TabEdit {
        original_url: "https://a.example".to_string(),
        tab: TabConfig {
            url: "https://a2.example".to_string(),
            refresh_after_load: true,
            dwell_time: 20,
            ..Default::default()
        },
    };
    edit_tab(State(f.state.clone()), Path("Lobby".to_string()), Json(req))
        .await
        .unwrap();

    let tabs = f.saved().displays[0].tabs.clone();
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].url, "https://a2.example");
    assert!(tabs[0].refresh_after_load);
    assert_eq!(f.control.calls(), vec!["edit_tab Lobby https://a2.example"]);
}

#[tokio::test]
async fn test_edit_tab_adds_when_original_missing() {
    let f = Fixture::new();
    let req = TabEdit {
        original_url: "https://gone.example".to_string(),
        tab: TabConfig {
            url: "https://c.example".to_string(),
            ..Default::default()
        },
    };
    edit_tab(State(f.state.clone()), Path("Lobby".to_string()), Json(req))
        .await
        .unwrap();

    assert_eq!(f.saved().displays[0].tabs.len(), 2);
    assert_eq!(f.control.calls(), vec!["add_tab Lobby https://c.example"]);
}

#[tokio::test]
async fn test_remove_tab() {
    let f = Fixture::new();
    let query = TabQuery {
        url: "https://a.example".to_string(),
    };
    let status = remove_tab(State(f.state.clone()), Path("Lobby".to_string()), Query(query))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(f.saved().displays[0].tabs.is_empty());

    let query = TabQuery {
        url: "https://a.example".to_string(),
    };
    let err = remove_tab(State(f.state.clone()), Path("Lobby".to_string()), Query(query))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::TabNotFound { .. }));
}

#[tokio::test]
async fn test_notification_failure_is_not_fatal() {
    let f = Fixture::with_control(RecordingControl::failing());
    let req = DisplayUpdate {
        x: 10,
        ..Default::default()
    };
    let result = edit_display(State(f.state.clone()), Path("Lobby".to_string()), Json(req)).await;
    assert!(result.is_ok());
    assert_eq!(f.saved().displays[0].x, 10);
}

#[tokio::test]
async fn test_save_failure_keeps_memory_state() {
    let control = Arc::new(RecordingControl::default());
    let state = Arc::new(AdminState::new(
        Config {
            displays: vec![lobby()],
            ..Default::default()
        },
        "/nonexistent/dir/kiosk.yml",
        control.clone(),
    ));

    remove_display(State(state.clone()), Path("Lobby".to_string()))
        .await
        .unwrap();
    assert!(state.snapshot().displays.is_empty());
    assert_eq!(control.calls(), vec!["remove_display Lobby"]);
}

#[tokio::test]
async fn test_reload_failure_is_reported() {
    let f = Fixture::with_control(RecordingControl::failing());
    let err = reload(State(f.state.clone())).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(f.control.calls(), vec!["reload"]);
}

#[tokio::test]
async fn test_add_display_rejects_taken_port() {
    let f = Fixture::new();
    let req = NewDisplay {
        name: Some("Hall".to_string()),
        debug_port: Some(9300),
        ..Default::default()
    };
    let err = add_display(State(f.state.clone()), Json(req))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AdminError::PortInUse { port: 9300, ref display } if display == "Lobby"));
    assert_eq!(err.status(), StatusCode::CONFLICT);
    assert_eq!(f.saved().displays.len(), 1);
    assert!(f.control.calls().is_empty());
}

#[tokio::test]
async fn test_edit_display_rejects_taken_port() {
    let f = Fixture::new();
    add_display(
        State(f.state.clone()),
        Json(NewDisplay {
            name: Some("Hall".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    let req = DisplayUpdate {
        debug_port: 9300,
        ..Default::default()
    };
    let err = edit_display(State(f.state.clone()), Path("Hall".to_string()), Json(req))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "port_in_use");
    assert_eq!(f.saved().displays[1].debug_port, 9301);

    // Keeping its own port is fine.
    let req = DisplayUpdate {
        debug_port: 9300,
        x: 5,
        ..Default::default()
    };
    edit_display(State(f.state.clone()), Path("Lobby".to_string()), Json(req))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edits_all_saved() {
    let f = Fixture::new();
    let mut tasks = Vec::new();
    for i in 0..8 {
        let state = f.state.clone();
        tasks.push(tokio::spawn(async move {
            let tab = TabConfig {
                url: format!("https://{}.example", i),
                ..Default::default()
            };
            add_tab(State(state), Path("Lobby".to_string()), Json(tab))
                .await
                .map(|_| ())
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(f.saved().displays[0].tabs.len(), 9);
    assert_eq!(f.state.snapshot().displays[0].tabs.len(), 9);
}
