//! Process signals that stop the bot.

use std::future::Future;
use tokio::signal;
use tracing::error;

/// Which signal asked the bot to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl+C / SIGINT.
    Interrupt,
    /// SIGTERM, as sent by service managers and container runtimes.
    Terminate,
}

/// Resolves on the first of Ctrl+C or SIGTERM.
///
/// The SIGTERM handler is installed before this returns, so a signal sent
/// right after the call is not lost. A handler that cannot be installed is
/// logged and never fires.
pub fn shutdown_signal() -> impl Future<Output = ShutdownSignal> {
    #[cfg(unix)]
    let terminate = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(sig) => Some(sig),
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            None
        }
    };

    async move {
        let interrupt = async {
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            match terminate {
                Some(mut sig) => {
                    sig.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = interrupt => ShutdownSignal::Interrupt,
            () = terminate => ShutdownSignal::Terminate,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigterm_requests_shutdown() {
        let signalled = shutdown_signal();
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let received = tokio::time::timeout(Duration::from_secs(5), signalled)
            .await
            .unwrap();
        assert_eq!(received, ShutdownSignal::Terminate);
    }
}
