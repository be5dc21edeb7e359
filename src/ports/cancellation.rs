//! Cancellation signal for in-flight replies.
//!
//! A `tokio::sync::watch` pair: the store keeps the [`CancelHandle`] for the
//! turn in flight and fires it on `clear()`, the transport holds the
//! [`CancelSignal`] and checks it between chunk reads.

use tokio::sync::watch;

/// Sending half, owned by whoever may abandon the reply.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Fires the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving half, passed into the transport.
///
/// Dropping the [`CancelHandle`] counts as cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// Creates a connected handle/signal pair.
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx: Some(rx) })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// Returns true if the reply has been abandoned.
    pub fn is_cancelled(&self) -> bool {
        match &self.rx {
            Some(rx) => *rx.borrow() || rx.has_changed().is_err(),
            None => false,
        }
    }

    /// Resolves once the signal fires (or its handle is dropped).
    pub async fn cancelled(&mut self) {
        match self.rx.as_mut() {
            Some(rx) => {
                let _ = rx.wait_for(|cancelled| *cancelled).await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
