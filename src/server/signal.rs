// Signal handling module (nginx-style)
//
// Supported signals:
// - SIGHUP:  Bind a new socket set on the same port, drain the old one
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::Arc;

use tokio::sync::Notify;

use reuseport::logger;

/// Signal handler state
pub struct SignalHandler {
    /// Shutdown signal (SIGTERM, SIGINT)
    pub shutdown: Notify,
    /// Rebind signal (SIGHUP)
    pub reload: Notify,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            shutdown: Notify::new(),
            reload: Notify::new(),
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Start signal handlers (Unix only)
///
/// This spawns a background task that listens for Unix signals
/// and triggers appropriate actions.
///
/// | Signal  | Action                      |
/// |---------|-----------------------------|
/// | SIGHUP  | Rebind sockets, drain old   |
/// | SIGTERM | Graceful stop               |
/// | SIGINT  | Graceful stop               |
#[cfg(unix)]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let registered = (|| {
            Ok::<_, std::io::Error>((
                signal(SignalKind::hangup())?,
                signal(SignalKind::terminate())?,
                signal(SignalKind::interrupt())?,
            ))
        })();
        let (mut sighup, mut sigterm, mut sigint) = match registered {
            Ok(signals) => signals,
            Err(e) => {
                logger::log_error(&format!("[SIGNAL] Failed to register signal handlers: {e}"));
                return;
            }
        };

        logger::log_info(&format!(
            "[SIGNAL] kill -HUP {pid} to rebind, kill {pid} or Ctrl+C to stop",
            pid = std::process::id()
        ));

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    logger::log_info("[SIGNAL] SIGHUP received, rebinding sockets");
                    handler.reload.notify_one();
                }

                _ = sigterm.recv() => {
                    logger::log_info("[SIGNAL] SIGTERM received, initiating graceful shutdown");
                    handler.shutdown.notify_one();
                    break;
                }

                _ = sigint.recv() => {
                    logger::log_info("[SIGNAL] SIGINT received (Ctrl+C), initiating graceful shutdown");
                    handler.shutdown.notify_one();
                    break;
                }
            }
        }
    });
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            logger::log_info("[SIGNAL] Ctrl+C received, initiating shutdown");
            handler.shutdown.notify_one();
        }
    });
}
