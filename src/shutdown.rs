//! Termination handling.
//!
//! The sampler and the signal wait run as separate tasks. They share a single watch
//! channel: [`ShutdownController::stop`] flips it, [`ShutdownSignal::stopped`] resolves once
//! it has flipped. The sampler only looks at the signal between ticks, so a tick that is
//! already running always finishes and writes its row.

use std::fmt;
use tokio::sync::watch;

/// Sending half: requests a stop.
#[derive(Debug)]
pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

/// Receiving half: observed by the sampler.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected controller/signal pair.
pub fn channel() -> (ShutdownController, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownController { tx }, ShutdownSignal { rx })
}

impl ShutdownController {
    /// Request a stop. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Another signal observing this controller.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl ShutdownSignal {
    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once a stop is requested or the controller is dropped. Cancel-safe.
    pub async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Process signals that end a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGHUP
    Hangup,
    /// SIGPIPE
    BrokenPipe,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Terminate => "SIGTERM",
            TerminationSignal::Hangup => "SIGHUP",
            TerminationSignal::BrokenPipe => "SIGPIPE",
        };
        f.write_str(name)
    }
}

/// Installed handlers for the signals that end a run.
///
/// Install before starting the sampler so an early signal is not lost to the default
/// disposition.
#[derive(Debug)]
pub struct TerminationListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(unix)]
    hangup: tokio::signal::unix::Signal,
    #[cfg(unix)]
    pipe: tokio::signal::unix::Signal,
}

impl TerminationListener {
    /// Register SIGINT, SIGTERM, SIGHUP and SIGPIPE handlers.
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
            pipe: signal(SignalKind::pipe())?,
        })
    }

    /// Ctrl+C is the only termination request off unix.
    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next termination signal.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> TerminationSignal {
        tokio::select! {
            _ = self.interrupt.recv() => TerminationSignal::Interrupt,
            _ = self.terminate.recv() => TerminationSignal::Terminate,
            _ = self.hangup.recv() => TerminationSignal::Hangup,
            _ = self.pipe.recv() => TerminationSignal::BrokenPipe,
        }
    }

    /// Wait for Ctrl+C.
    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> TerminationSignal {
        // An error here means no handler could be installed; nothing else can stop the run
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        TerminationSignal::Interrupt
    }
}
