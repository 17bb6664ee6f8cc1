use std::io;

/// Ctrl-C and, on unix, SIGTERM. Handlers are registered in `install` so a
/// signal delivered before `recv` is awaited is not lost.
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    pub fn install() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                terminate: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Resolves with the name of the first signal received.
    pub async fn recv(&mut self) -> &'static str {
        #[cfg(unix)]
        {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::warn!("Ctrl-C handler failed, waiting for SIGTERM: {}", e);
                        self.terminate.recv().await;
                        return "SIGTERM";
                    }
                    "SIGINT"
                }
                _ = self.terminate.recv() => "SIGTERM",
            }
        }
        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Ctrl-C handler failed: {}", e);
                std::future::pending::<()>().await;
            }
            "SIGINT"
        }
    }
}
