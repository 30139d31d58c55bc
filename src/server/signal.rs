// Signal handling module
//
// Supported signals:
// - SIGINT:  Shutdown (Ctrl+C)
// - SIGTERM: Shutdown (unix only)
//
// Handlers are installed when `shutdown_signal` is called, not when the returned future is
// first polled, so a signal arriving right after startup is never missed.

use std::future::Future;

use crate::logger;

/// Future that resolves when the process is asked to stop
///
/// Must be called from within a tokio runtime.
#[cfg(unix)]
pub fn shutdown_signal() -> impl Future<Output = ()> {
    use tokio::signal::unix::{signal, SignalKind};

    let interrupt = signal(SignalKind::interrupt());
    let terminate = signal(SignalKind::terminate());

    async move {
        tokio::select! {
            () = recv_or_pending(interrupt, "SIGINT") => logger::log_signal("SIGINT"),
            () = recv_or_pending(terminate, "SIGTERM") => logger::log_signal("SIGTERM"),
        }
    }
}

#[cfg(unix)]
async fn recv_or_pending(
    registered: std::io::Result<tokio::signal::unix::Signal>,
    name: &str,
) {
    match registered {
        Ok(mut signal) => {
            signal.recv().await;
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to register {name} handler: {e}"));
            std::future::pending::<()>().await;
        }
    }
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn shutdown_signal() -> impl Future<Output = ()> {
    let registered = tokio::signal::windows::ctrl_c();

    async move {
        match registered {
            Ok(mut ctrl_c) => {
                ctrl_c.recv().await;
                logger::log_signal("Ctrl+C");
            }
            Err(e) => {
                logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
                std::future::pending::<()>().await;
            }
        }
    }
}
