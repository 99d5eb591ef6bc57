//! OS signal handling.
//!
//! SIGINT and SIGTERM cancel the root token. SIGHUP restarts the displays
//! from the configuration file.

use std::sync::Arc;

use kiosk_core::{CancellationToken, KioskControl};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KioskSignal {
    /// SIGTERM, SIGINT.
    Shutdown,
    /// SIGHUP.
    Reload,
}

impl std::fmt::Display for KioskSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KioskSignal::Shutdown => write!(f, "SHUTDOWN"),
            KioskSignal::Reload => write!(f, "RELOAD"),
        }
    }
}

#[derive(Clone)]
pub(crate) struct SignalHandler {
    sender: broadcast::Sender<KioskSignal>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KioskSignal> {
        self.sender.subscribe()
    }

    pub fn send(&self, signal: KioskSignal) {
        debug!("Sending signal: {}", signal);
        let _ = self.sender.send(signal);
    }

    /// Forward SIGTERM, SIGINT and SIGHUP to subscribers.
    #[cfg(unix)]
    pub fn setup_os_signals(&self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let kinds = [
            (SignalKind::terminate(), "SIGTERM", KioskSignal::Shutdown),
            (SignalKind::interrupt(), "SIGINT", KioskSignal::Shutdown),
            (SignalKind::hangup(), "SIGHUP", KioskSignal::Reload),
        ];

        for (kind, name, mapped) in kinds {
            let mut stream = signal(kind)?;
            let handler = self.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    info!("Received {}", name);
                    handler.send(mapped);
                }
            });
        }

        debug!("OS signal handlers installed");
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn setup_os_signals(&self) -> std::io::Result<()> {
        let handler = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C");
                handler.send(KioskSignal::Shutdown);
            }
        });
        Ok(())
    }
}

/// Act on signals until `root` is cancelled.
pub(crate) async fn dispatch(
    mut signals: broadcast::Receiver<KioskSignal>,
    root: CancellationToken,
    control: Arc<dyn KioskControl>,
) {
    loop {
        let signal = tokio::select! {
            _ = root.cancelled() => return,
            signal = signals.recv() => signal,
        };

        match signal {
            Ok(KioskSignal::Shutdown) => {
                info!("Shutdown requested");
                root.cancel();
                return;
            }
            Ok(KioskSignal::Reload) => {
                if let Err(e) = control.reload_displays().await {
                    warn!("Reload failed: {}", e);
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Dropped {} signals", n);
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
