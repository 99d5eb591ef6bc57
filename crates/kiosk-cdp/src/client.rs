//! Remote control client for a browser's debug endpoint.

use std::time::Duration;

use async_trait::async_trait;
use futures::SinkExt;
use serde_json::{json, Value};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::CdpError;
use crate::protocol::{CdpRequest, TargetInfo, PAGE_NAVIGATE, PAGE_RELOAD};
use crate::request_id::RequestIdCounter;

/// Interval between reachability probes.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Ceiling for opening a control channel and writing one request.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Ceiling for a single HTTP request to the debug endpoint.
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Browser operations the launcher and tab cycler depend on.
#[async_trait]
pub trait RemoteControl: Send + Sync {
    /// Poll `GET /json` every second until it answers 200.
    ///
    /// Returns [`CdpError::Cancelled`] when `cancel` fires and
    /// [`CdpError::Unreachable`] when `deadline` passes first.
    async fn wait_until_reachable(
        &self,
        port: u16,
        deadline: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<(), CdpError>;

    /// One `GET /json`. No retry at this layer.
    async fn list_targets(&self, port: u16) -> Result<Vec<TargetInfo>, CdpError>;

    /// Write one `{id, method, params}` request on a short-lived control
    /// channel and close it without waiting for a response.
    ///
    /// Returns the request id that was used.
    async fn send(&self, control_url: &str, method: &str, params: Value) -> Result<u64, CdpError>;

    /// One `GET /json/activate/{id}`.
    async fn activate(&self, port: u16, target_id: &str) -> Result<(), CdpError>;

    /// Load `url` in the tab, bypassing the cache.
    async fn navigate(&self, control_url: &str, url: &str) -> Result<u64, CdpError> {
        self.send(control_url, PAGE_NAVIGATE, json!({ "url": url, "ignoreCache": true }))
            .await
    }

    /// Protocol-level reload, bypassing the cache.
    async fn reload(&self, control_url: &str) -> Result<u64, CdpError> {
        self.send(control_url, PAGE_RELOAD, json!({ "ignoreCache": true }))
            .await
    }
}

/// CDP client over HTTP and short-lived websockets.
pub struct CdpClient {
    host: String,
    http: reqwest::Client,
    request_ids: RequestIdCounter,
}

impl CdpClient {
    /// Client for browsers listening on `localhost`.
    pub fn new() -> Self {
        Self::with_host("localhost")
    }

    pub fn with_host(host: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            host: host.into(),
            http,
            request_ids: RequestIdCounter::new(),
        }
    }

    /// Debug endpoint base URL for `port`.
    pub fn endpoint(&self, port: u16) -> String {
        format!("http://{}:{}", self.host, port)
    }

    pub fn request_ids(&self) -> &RequestIdCounter {
        &self.request_ids
    }

    async fn probe(&self, port: u16) -> Result<(), CdpError> {
        let response = self
            .http
            .get(format!("{}/json", self.endpoint(port)))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CdpError::Http(format!("status {}", response.status())))
        }
    }
}

impl Default for CdpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteControl for CdpClient {
    async fn wait_until_reachable(
        &self,
        port: u16,
        deadline: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<(), CdpError> {
        let started = Instant::now();

        loop {
            let last_error = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CdpError::Cancelled),
                result = self.probe(port) => match result {
                    Ok(()) => {
                        debug!("Debug endpoint on port {} is reachable", port);
                        return Ok(());
                    }
                    Err(e) => e,
                },
            };
            trace!("Debug endpoint on port {} not ready: {}", port, last_error);

            if let Some(limit) = deadline {
                if started.elapsed() + POLL_INTERVAL > limit {
                    return Err(CdpError::Unreachable {
                        port,
                        reason: last_error.to_string(),
                    });
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CdpError::Cancelled),
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }

    async fn list_targets(&self, port: u16) -> Result<Vec<TargetInfo>, CdpError> {
        let url = format!("{}/json", self.endpoint(port));
        let targets: Vec<TargetInfo> = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(targets)
    }

    async fn send(&self, control_url: &str, method: &str, params: Value) -> Result<u64, CdpError> {
        if control_url.is_empty() {
            return Err(CdpError::MissingControlUrl);
        }

        let request = CdpRequest {
            id: self.request_ids.next(),
            method: method.to_string(),
            params,
        };
        let payload = serde_json::to_string(&request)?;

        let exchange = async {
            let (mut ws, _) = tokio_tungstenite::connect_async(control_url).await?;
            trace!("CDP send: {}", payload);
            let written = ws.send(Message::Text(payload.into())).await;
            // The browser may drop the channel first; closing is best-effort.
            let _ = ws.close(None).await;
            written
        };

        match tokio::time::timeout(SEND_TIMEOUT, exchange).await {
            Ok(Ok(())) => Ok(request.id),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(CdpError::Timeout(format!(
                "{} on {} after {:?}",
                method, control_url, SEND_TIMEOUT
            ))),
        }
    }

    async fn activate(&self, port: u16, target_id: &str) -> Result<(), CdpError> {
        let url = format!("{}/json/activate/{}", self.endpoint(port), target_id);
        self.http.get(&url).send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
