//! Chrome DevTools Protocol (CDP) remote control for kiosk displays.
//!
//! The browser is started with `--remote-debugging-port=<port>`; this crate
//! talks to that endpoint:
//!
//! ```text
//! GET  http://localhost:<port>/json               -> live targets (tabs)
//! GET  http://localhost:<port>/json/activate/{id} -> bring a tab to front
//! WS   ws://localhost:<port>/devtools/page/{id}   -> {id, method, params}
//! ```
//!
//! Control-channel commands are fire-and-forget: a short-lived websocket is
//! opened, one request is written, and the socket is closed without reading
//! a response. The browser processes requests on a channel in the order they
//! were sent.
//!
//! ```rust,ignore
//! let client = CdpClient::new();
//! client.wait_until_reachable(9222, None, &cancel).await?;
//! let targets = client.list_targets(9222).await?;
//! client.navigate(targets[0].control_url().unwrap(), "https://example.com").await?;
//! ```

mod client;
mod error;
mod protocol;
mod request_id;

pub use client::{CdpClient, RemoteControl};
pub use error::CdpError;
pub use protocol::*;
pub use request_id::RequestIdCounter;
