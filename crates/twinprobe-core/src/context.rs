//! Interrupt coordination between a probe and its operator.
//!
//! A probe holds an [`InterruptContext`]; whoever may stop it (a Ctrl-C
//! handler, a test) holds the matching [`InterruptHandle`]. The flag is
//! single-writer: once raised it stays raised for the lifetime of the run.

use std::sync::Arc;

use tokio::sync::watch;

/// Receiving side of the interrupt flag.
#[derive(Debug, Clone)]
pub struct InterruptContext {
    rx: watch::Receiver<bool>,
}

impl InterruptContext {
    /// Creates a new context and the handle that raises it.
    #[must_use]
    pub fn new() -> (Self, InterruptHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { rx }, InterruptHandle { tx: Arc::new(tx) })
    }

    /// Creates a context that can never be interrupted.
    #[must_use]
    pub fn detached() -> Self {
        Self::new().0
    }

    /// Returns true if an interrupt has been requested.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until an interrupt is requested.
    ///
    /// Never completes if every handle has been dropped without raising
    /// the flag.
    pub async fn interrupted(&mut self) {
        if self.rx.wait_for(|raised| *raised).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Handle for raising the interrupt flag.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl InterruptHandle {
    /// Raises the interrupt flag. Idempotent.
    ///
    /// Returns true if this call raised it.
    pub fn interrupt(&self) -> bool {
        !self.tx.send_replace(true)
    }

    /// Returns true if the flag has been raised.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Raises `handle` when the process receives Ctrl-C.
///
/// Spawns a background task; the task ends after the first signal.
pub fn interrupt_on_ctrl_c(handle: InterruptHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupted by operator");
                handle.interrupt();
            }
            Err(e) => tracing::warn!(error = %e, "failed to listen for Ctrl+C"),
        }
    })
}
