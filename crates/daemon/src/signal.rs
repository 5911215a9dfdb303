//! Process signal listener
//!
//! Turns the first termination-class signal into a single shutdown
//! notification. Ctrl-C everywhere; SIGTERM, SIGHUP and SIGQUIT on Unix.

use std::fmt;
use tokio::task::JoinHandle;
use tollgate_core::application::ShutdownSender;
use tracing::{error, info};

/// Termination-class signal that stops the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
    Hangup,
    Quit,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Hangup => "SIGHUP",
            ShutdownSignal::Quit => "SIGQUIT",
        };
        f.write_str(name)
    }
}

/// Registered signal streams
///
/// Handlers are installed on construction, so a signal delivered before the
/// first `recv` is not lost.
pub struct SignalListener {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(unix)]
    hangup: tokio::signal::unix::Signal,
    #[cfg(unix)]
    quit: tokio::signal::unix::Signal,
}

impl SignalListener {
    /// Install handlers (must run inside a tokio runtime)
    pub fn register() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                terminate: signal(SignalKind::terminate())?,
                hangup: signal(SignalKind::hangup())?,
                quit: signal(SignalKind::quit())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the next termination-class signal
    pub async fn recv(&mut self) -> std::io::Result<ShutdownSignal> {
        #[cfg(unix)]
        {
            tokio::select! {
                res = tokio::signal::ctrl_c() => res.map(|_| ShutdownSignal::Interrupt),
                _ = self.terminate.recv() => Ok(ShutdownSignal::Terminate),
                _ = self.hangup.recv() => Ok(ShutdownSignal::Hangup),
                _ = self.quit.recv() => Ok(ShutdownSignal::Quit),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            Ok(ShutdownSignal::Interrupt)
        }
    }
}

/// Forward the first signal to `shutdown_tx`
///
/// If signals cannot be observed the listener triggers shutdown right away
/// rather than leave a server nobody can stop.
pub fn spawn_signal_listener(
    mut listener: SignalListener,
    shutdown_tx: ShutdownSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match listener.recv().await {
            Ok(signal) => info!(%signal, "Received shutdown signal"),
            Err(e) => error!(error = %e, "Signal listener failed"),
        }
        shutdown_tx.shutdown();
    })
}
