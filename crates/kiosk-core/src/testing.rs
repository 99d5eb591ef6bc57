//! In-memory desktop used by the orchestrator tests.
//!
//! One [`FakeDesktop`] stands in for the window manager, the browser debug
//! endpoint and the process host, so a spawned "browser" opens a window and
//! a page target the way a real one would.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kiosk_cdp::{CdpError, RemoteControl, RequestIdCounter, TargetInfo};
use kiosk_config::{Config, DisplayConfig, ExecConfig, TabConfig};
use kiosk_window::{WindowError, WindowId, WindowManager};
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::host::ProcessHost;

/// Something the fake observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Spawn(String),
    WindowActivate(WindowId),
    WindowMove(WindowId, i32, i32),
    Key(WindowId, String),
    Close(WindowId),
    ActivateTab(u16, String),
    Send { control_url: String, method: String, url: Option<String> },
}

#[derive(Default)]
struct Desktop {
    next_window: u64,
    next_target: u64,
    visible: Vec<WindowId>,
    targets: HashMap<u16, Vec<TargetInfo>>,
    profiles: HashMap<String, u16>,
    busy_ports: HashSet<u16>,
    unreachable_ports: HashSet<u16>,
    idless_ports: HashSet<u16>,
    silent_programs: HashSet<String>,
    failing_sends: bool,
    events: Vec<Event>,
}

pub struct FakeDesktop {
    inner: Mutex<Desktop>,
    ids: RequestIdCounter,
}

impl FakeDesktop {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Desktop {
                next_window: 100,
                next_target: 1,
                ..Default::default()
            }),
            ids: RequestIdCounter::new(),
        })
    }

    /// Windows that are already on screen before anything launches.
    pub fn with_existing_windows(self: Arc<Self>, ids: &[u64]) -> Arc<Self> {
        self.inner
            .lock()
            .visible
            .extend(ids.iter().copied().map(WindowId::from));
        self
    }

    pub fn mark_port_busy(&self, port: u16) {
        self.inner.lock().busy_ports.insert(port);
    }

    pub fn mark_port_unreachable(&self, port: u16) {
        self.inner.lock().unreachable_ports.insert(port);
    }

    /// `program` starts but never opens a window.
    pub fn mark_silent(&self, program: &str) {
        self.inner.lock().silent_programs.insert(program.to_string());
    }

    pub fn fail_sends(&self) {
        self.inner.lock().failing_sends = true;
    }

    /// The endpoint lists an id-less page ahead of every other target.
    pub fn add_target_without_id(&self, port: u16) {
        self.inner.lock().idless_ports.insert(port);
    }

    /// Add a target that nobody launched.
    pub fn add_stray_target(&self, port: u16, target_type: &str) -> String {
        let mut desk = self.inner.lock();
        let id = format!("X{}", desk.next_target);
        desk.next_target += 1;
        desk.targets.entry(port).or_default().push(TargetInfo {
            id: id.clone(),
            target_type: target_type.to_string(),
            title: String::new(),
            url: String::new(),
            web_socket_debugger_url: Some(format!("ws://fake/{port}/{id}")),
        });
        id
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().events.clone()
    }

    pub fn spawned(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Spawn(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    /// Target ids activated on `port`, in order.
    pub fn activated_tabs(&self, port: u16) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::ActivateTab(p, id) if p == port => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Navigations sent, as `(control_url, url)`.
    pub fn navigations(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Send {
                    control_url,
                    url: Some(url),
                    ..
                } => Some((control_url, url)),
                _ => None,
            })
            .collect()
    }

    pub fn closed_windows(&self) -> Vec<WindowId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Close(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn open_target(desk: &mut Desktop, port: u16, url: &str) {
        let id = format!("T{}", desk.next_target);
        desk.next_target += 1;
        desk.targets.entry(port).or_default().push(TargetInfo {
            id: id.clone(),
            target_type: "page".to_string(),
            title: String::new(),
            url: url.to_string(),
            web_socket_debugger_url: Some(format!("ws://fake/{port}/{id}")),
        });
    }
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter().find_map(|arg| arg.strip_prefix(name))
}

#[async_trait]
impl WindowManager for FakeDesktop {
    async fn search_visible(&self, _pattern: &str) -> Result<Vec<WindowId>, WindowError> {
        let visible = self.inner.lock().visible.clone();
        if visible.is_empty() {
            return Err(WindowError::CommandFailed {
                command: "search".to_string(),
                reason: "exit status: 1".to_string(),
            });
        }
        Ok(visible)
    }

    async fn activate(&self, id: &WindowId) -> Result<(), WindowError> {
        self.inner.lock().events.push(Event::WindowActivate(id.clone()));
        Ok(())
    }

    async fn move_to(&self, id: &WindowId, x: i32, y: i32) -> Result<(), WindowError> {
        self.inner.lock().events.push(Event::WindowMove(id.clone(), x, y));
        Ok(())
    }

    async fn send_key(&self, id: &WindowId, key: &str) -> Result<(), WindowError> {
        self.inner
            .lock()
            .events
            .push(Event::Key(id.clone(), key.to_string()));
        Ok(())
    }

    async fn close(&self, id: &WindowId) -> Result<(), WindowError> {
        let mut desk = self.inner.lock();
        desk.visible.retain(|w| w != id);
        desk.events.push(Event::Close(id.clone()));
        Ok(())
    }
}

#[async_trait]
impl RemoteControl for FakeDesktop {
    async fn wait_until_reachable(
        &self,
        port: u16,
        deadline: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<(), CdpError> {
        if !self.inner.lock().unreachable_ports.contains(&port) {
            return Ok(());
        }
        match deadline {
            Some(limit) => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(CdpError::Cancelled),
                    _ = tokio::time::sleep(limit) => Err(CdpError::Unreachable {
                        port,
                        reason: "connection refused".to_string(),
                    }),
                }
            }
            None => {
                cancel.cancelled().await;
                Err(CdpError::Cancelled)
            }
        }
    }

    async fn list_targets(&self, port: u16) -> Result<Vec<TargetInfo>, CdpError> {
        let desk = self.inner.lock();
        if desk.unreachable_ports.contains(&port) {
            return Err(CdpError::Http("connection refused".to_string()));
        }
        let mut listed = Vec::new();
        if desk.idless_ports.contains(&port) {
            listed.push(TargetInfo {
                id: String::new(),
                target_type: "page".to_string(),
                title: String::new(),
                url: "about:blank".to_string(),
                web_socket_debugger_url: Some(format!("ws://fake/{port}/")),
            });
        }
        // Report newest first, as browsers often do.
        if let Some(targets) = desk.targets.get(&port) {
            listed.extend(targets.iter().rev().cloned());
        }
        Ok(listed)
    }

    async fn send(&self, control_url: &str, method: &str, params: Value) -> Result<u64, CdpError> {
        if control_url.is_empty() {
            return Err(CdpError::MissingControlUrl);
        }
        let mut desk = self.inner.lock();
        if desk.failing_sends {
            return Err(CdpError::WebSocket("connection refused".to_string()));
        }
        desk.events.push(Event::Send {
            control_url: control_url.to_string(),
            method: method.to_string(),
            url: params["url"].as_str().map(str::to_string),
        });
        Ok(self.ids.next())
    }

    async fn activate(&self, port: u16, target_id: &str) -> Result<(), CdpError> {
        self.inner
            .lock()
            .events
            .push(Event::ActivateTab(port, target_id.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ProcessHost for FakeDesktop {
    fn spawn(
        &self,
        program: &str,
        args: &[String],
        _tracker: &TaskTracker,
        _cancel: &CancellationToken,
    ) -> std::io::Result<()> {
        let mut desk = self.inner.lock();
        desk.events
            .push(Event::Spawn(format!("{} {}", program, args.join(" "))));
        if desk.silent_programs.contains(program) {
            return Ok(());
        }

        let profile = flag(args, "--user-data-dir=").map(str::to_string);
        let new_tab = args.iter().any(|arg| arg == "--new-tab");

        if new_tab {
            let port = profile.and_then(|p| desk.profiles.get(&p).copied());
            if let (Some(port), Some(url)) = (port, args.get(1)) {
                Self::open_target(&mut desk, port, url);
            }
            return Ok(());
        }

        let window = WindowId::from(desk.next_window);
        desk.next_window += 1;
        desk.visible.push(window);

        if let Some(port) = flag(args, "--remote-debugging-port=").and_then(|p| p.parse().ok()) {
            if let Some(profile) = profile {
                desk.profiles.insert(profile, port);
            }
            let url = args.last().cloned().unwrap_or_default();
            Self::open_target(&mut desk, port, &url);
        }
        Ok(())
    }

    async fn port_in_use(&self, port: u16) -> bool {
        self.inner.lock().busy_ports.contains(&port)
    }
}

pub fn tab(url: &str, dwell: u64) -> TabConfig {
    TabConfig {
        url: url.to_string(),
        dwell_time: dwell,
        ..Default::default()
    }
}

pub fn browser_display(name: &str, port: u16, tabs: Vec<TabConfig>) -> DisplayConfig {
    DisplayConfig {
        name: name.to_string(),
        debug_port: port,
        tabs,
        ..Default::default()
    }
}

pub fn custom_display(name: &str, command: &str) -> DisplayConfig {
    DisplayConfig {
        name: name.to_string(),
        exec: Some(ExecConfig {
            command: command.to_string(),
            window_search: command.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Config whose profiles live under `profile_root`.
pub fn config_with(profile_root: &std::path::Path, displays: Vec<DisplayConfig>) -> Config {
    Config {
        profile_root: profile_root.to_path_buf(),
        displays,
        ..Default::default()
    }
}
