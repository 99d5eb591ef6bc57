//! Display and tab management endpoints.
//!
//! Every mutation edits the in-memory configuration, saves it and then
//! notifies the orchestrator. Notification failures are logged only.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use kiosk_config::{Config, DisplayConfig, DisplayKind, ExecConfig, TabConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AdminError;
use crate::state::AdminState;

/// Refresh interval suggested for new tabs.
const DEFAULT_REFRESH_INTERVAL: u64 = 30;

/// Settle delay suggested for new tabs.
const DEFAULT_DELAY_AFTER_REFRESH: u64 = 3;

/// Pre-filled values for the next display and tab.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayDefaults {
    pub name: String,
    pub debug_port: u16,
    pub tab: TabConfig,
}

/// Body of `POST /displays`. Missing name and port take the next free ones.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDisplay {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub debug_port: Option<u16>,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub exec: Option<ExecConfig>,
}

/// Body of `PUT /displays/{name}`. Tabs are edited through their own routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayUpdate {
    #[serde(default)]
    pub debug_port: u16,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub exec: Option<ExecConfig>,
}

/// Body of `PUT /displays/{name}/tabs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabEdit {
    /// URL of the tab being replaced.
    pub original_url: String,
    #[serde(flatten)]
    pub tab: TabConfig,
}

#[derive(Debug, Deserialize)]
pub struct TabQuery {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub displays: usize,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub status: String,
}

fn display_mut<'a>(
    displays: &'a mut [DisplayConfig],
    name: &str,
) -> Result<&'a mut DisplayConfig, AdminError> {
    displays
        .iter_mut()
        .find(|d| d.name == name)
        .ok_or_else(|| AdminError::DisplayNotFound(name.to_string()))
}

/// Reject a debug port another browser display already resolves to.
fn require_free_port(config: &Config, name: &str, port: u16) -> Result<(), AdminError> {
    let owner = config.displays.iter().find(|d| {
        d.name != name
            && d.kind() != DisplayKind::Custom
            && config.resolved_debug_port(d) == port
    });
    match owner {
        Some(other) => Err(AdminError::PortInUse {
            port,
            display: other.name.clone(),
        }),
        None => Ok(()),
    }
}

fn require_url(tab: &TabConfig) -> Result<(), AdminError> {
    if tab.url.trim().is_empty() {
        return Err(AdminError::InvalidRequest("tab url must not be empty".into()));
    }
    Ok(())
}

/// Liveness plus a little context.
pub async fn health(State(state): State<Arc<AdminState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        displays: state.snapshot().displays.len(),
        uptime_seconds: state.uptime_seconds(),
    })
}

pub async fn list_displays(State(state): State<Arc<AdminState>>) -> Json<Vec<DisplayConfig>> {
    Json(state.snapshot().displays)
}

pub async fn display_defaults(State(state): State<Arc<AdminState>>) -> Json<DisplayDefaults> {
    let config = state.snapshot();
    Json(DisplayDefaults {
        name: config.next_display_name(),
        debug_port: config.next_debug_port(),
        tab: TabConfig {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            delay_after_refresh: DEFAULT_DELAY_AFTER_REFRESH,
            dwell_time: config.dwell_time,
            ..Default::default()
        },
    })
}

pub async fn get_display(
    State(state): State<Arc<AdminState>>,
    Path(name): Path<String>,
) -> Result<Json<DisplayConfig>, AdminError> {
    state
        .snapshot()
        .display(&name)
        .cloned()
        .map(Json)
        .ok_or(AdminError::DisplayNotFound(name))
}

pub async fn add_display(
    State(state): State<Arc<AdminState>>,
    Json(req): Json<NewDisplay>,
) -> Result<impl IntoResponse, AdminError> {
    let new_display = state
        .update(|config| {
            let name = match req.name.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => config.next_display_name(),
            };
            if config.index_of_display(&name).is_some() {
                return Err(AdminError::DisplayExists(name));
            }

            let debug_port = match req.debug_port {
                Some(port) if port != 0 => {
                    require_free_port(config, &name, port)?;
                    port
                }
                _ => config.next_debug_port(),
            };

            let display = DisplayConfig {
                debug_port,
                name,
                x: req.x,
                y: req.y,
                fullscreen: req.fullscreen,
                tabs: Vec::new(),
                exec: req.exec,
            };
            config.displays.push(display.clone());
            Ok(display)
        })
        .await?;

    info!(display = %new_display.name, "Display added");
    if let Err(e) = state.control().add_display(&new_display).await {
        warn!(display = %new_display.name, "Error adding display: {}", e);
    }
    Ok((StatusCode::CREATED, Json(new_display)))
}

pub async fn edit_display(
    State(state): State<Arc<AdminState>>,
    Path(name): Path<String>,
    Json(req): Json<DisplayUpdate>,
) -> Result<Json<DisplayConfig>, AdminError> {
    let display = state
        .update(|config| {
            let index = config
                .index_of_display(&name)
                .ok_or_else(|| AdminError::DisplayNotFound(name.clone()))?;
            if req.debug_port != 0 {
                require_free_port(config, &name, req.debug_port)?;
            }
            let display = &mut config.displays[index];
            display.debug_port = req.debug_port;
            display.x = req.x;
            display.y = req.y;
            display.fullscreen = req.fullscreen;
            display.exec = req.exec;
            Ok(display.clone())
        })
        .await?;

    info!(display = %name, "Display edited");
    if let Err(e) = state.control().edit_display(&display).await {
        warn!(display = %name, "Error editing display: {}", e);
    }
    Ok(Json(display))
}

pub async fn remove_display(
    State(state): State<Arc<AdminState>>,
    Path(name): Path<String>,
) -> Result<StatusCode, AdminError> {
    state
        .update(|config| {
            let index = config
                .index_of_display(&name)
                .ok_or_else(|| AdminError::DisplayNotFound(name.clone()))?;
            config.displays.remove(index);
            Ok(())
        })
        .await?;

    info!(display = %name, "Display removed");
    if let Err(e) = state.control().remove_display(&name).await {
        warn!(display = %name, "Error removing display: {}", e);
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_tab(
    State(state): State<Arc<AdminState>>,
    Path(name): Path<String>,
    Json(tab): Json<TabConfig>,
) -> Result<impl IntoResponse, AdminError> {
    require_url(&tab)?;
    state
        .update(|config| {
            display_mut(&mut config.displays, &name)?.tabs.push(tab.clone());
            Ok(())
        })
        .await?;

    info!(display = %name, "Tab added: {}", tab.url);
    if let Err(e) = state.control().add_tab(&name, &tab).await {
        warn!(display = %name, "Error adding tab: {}", e);
    }
    Ok((StatusCode::CREATED, Json(tab)))
}

/// Replace the tab whose URL is `originalUrl`, or append when there is none.
pub async fn edit_tab(
    State(state): State<Arc<AdminState>>,
    Path(name): Path<String>,
    Json(req): Json<TabEdit>,
) -> Result<Json<TabConfig>, AdminError> {
    let TabEdit { original_url, tab } = req;
    require_url(&tab)?;

    let replaced = state
        .update(|config| {
            let display = display_mut(&mut config.displays, &name)?;
            match display.tabs.iter_mut().find(|t| t.url == original_url) {
                Some(existing) => {
                    *existing = tab.clone();
                    Ok(true)
                }
                None => {
                    display.tabs.push(tab.clone());
                    Ok(false)
                }
            }
        })
        .await?;

    let result = if replaced {
        info!(display = %name, "Tab edited: {} -> {}", original_url, tab.url);
        state.control().edit_tab(&name, &tab).await
    } else {
        info!(display = %name, "Tab {} not found, added {}", original_url, tab.url);
        state.control().add_tab(&name, &tab).await
    };
    if let Err(e) = result {
        warn!(display = %name, "Error editing tab: {}", e);
    }
    Ok(Json(tab))
}

pub async fn remove_tab(
    State(state): State<Arc<AdminState>>,
    Path(name): Path<String>,
    Query(query): Query<TabQuery>,
) -> Result<StatusCode, AdminError> {
    state
        .update(|config| {
            let display = display_mut(&mut config.displays, &name)?;
            let index = display
                .tabs
                .iter()
                .position(|t| t.url == query.url)
                .ok_or_else(|| AdminError::TabNotFound {
                    display: name.clone(),
                    url: query.url.clone(),
                })?;
            display.tabs.remove(index);
            Ok(())
        })
        .await?;

    info!(display = %name, "Tab removed: {}", query.url);
    if let Err(e) = state.control().remove_tab(&name, &query.url).await {
        warn!(display = %name, "Error removing tab: {}", e);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Ask the orchestrator to restart from the saved configuration.
pub async fn reload(
    State(state): State<Arc<AdminState>>,
) -> Result<(StatusCode, Json<ReloadResponse>), AdminError> {
    state.control().reload_displays().await?;
    info!("Display reload requested");
    Ok((
        StatusCode::ACCEPTED,
        Json(ReloadResponse {
            status: "reloading".to_string(),
        }),
    ))
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
