//! Process seam: starting programs and probing ports.

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Operations the launcher needs from the operating system.
#[async_trait]
pub trait ProcessHost: Send + Sync {
    /// Start `program` in the background.
    ///
    /// The process is watched on `tracker` and killed when `cancel` fires.
    fn spawn(
        &self,
        program: &str,
        args: &[String],
        tracker: &TaskTracker,
        cancel: &CancellationToken,
    ) -> std::io::Result<()>;

    /// Whether something already listens on TCP `port`.
    ///
    /// Best-effort: when the probe itself cannot run the port counts as free.
    async fn port_in_use(&self, port: u16) -> bool;
}

/// [`ProcessHost`] backed by real processes and `lsof`.
#[derive(Debug, Clone, Default)]
pub struct SystemHost;

impl SystemHost {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessHost for SystemHost {
    fn spawn(
        &self,
        program: &str,
        args: &[String],
        tracker: &TaskTracker,
        cancel: &CancellationToken,
    ) -> std::io::Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let pid = child.id();
        info!("Started {} (pid {:?})", program, pid);

        let program = program.to_string();
        let cancel = cancel.clone();
        tracker.spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => debug!("{} (pid {:?}) exited: {}", program, pid, status),
                    Err(e) => warn!("Failed to wait on {} (pid {:?}): {}", program, pid, e),
                },
                _ = cancel.cancelled() => {
                    debug!("Stopping {} (pid {:?})", program, pid);
                    let _ = child.kill().await;
                }
            }
        });

        Ok(())
    }

    async fn port_in_use(&self, port: u16) -> bool {
        let output = Command::new("lsof")
            .arg(format!("-iTCP:{}", port))
            .args(["-sTCP:LISTEN", "-Pn"])
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            // lsof exits non-zero when nothing matches.
            Ok(output) => output.status.success(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("lsof not found, assuming port {} is available", port);
                false
            }
            Err(e) => {
                warn!("Port probe for {} failed, assuming available: {}", port, e);
                false
            }
        }
    }
}
