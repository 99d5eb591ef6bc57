//! CDP protocol types and message definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method that loads a URL in a tab.
pub const PAGE_NAVIGATE: &str = "Page.navigate";

/// Method that reloads a tab.
pub const PAGE_RELOAD: &str = "Page.reload";

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// Target descriptor from the `/json` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    /// Empty when the endpoint omitted it; such targets cannot be bound.
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub target_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

impl TargetInfo {
    /// Control-channel address, when the target exposes one.
    pub fn control_url(&self) -> Option<&str> {
        self.web_socket_debugger_url
            .as_deref()
            .filter(|url| !url.is_empty())
    }

    /// Whether this target is a tab that can be driven.
    ///
    /// Targets without a type are accepted; service workers, iframes and
    /// extension backgrounds are not.
    pub fn is_page(&self) -> bool {
        self.target_type.is_empty() || self.target_type == "page"
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
