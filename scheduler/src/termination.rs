//! Shutdown signaling: a broadcast channel the scheduler's background
//! tasks all subscribe to. Grounded on the teacher's
//! `daemon::termination` `Terminator`/`InterruptReceiver` pair, trimmed
//! down to a single `Shutdown` signal — this scheduler has nothing like
//! the teacher's three distinct OS-signal kinds to distinguish, since
//! spec.md §5 only asks for "orchestrator shutdown", not per-signal
//! behavior.

use tokio::sync::broadcast;

/// The sending half. Cloning shares the same underlying channel.
#[derive(Debug, Clone)]
pub struct Terminator {
    tx: broadcast::Sender<()>,
}

impl Terminator {
    #[must_use]
    pub fn new(tx: broadcast::Sender<()>) -> Self {
        Self { tx }
    }

    /// Broadcasts shutdown to every subscriber.
    ///
    /// # Errors
    /// Returns an error if every receiver has already been dropped.
    pub fn shutdown(&self) -> Result<(), broadcast::error::SendError<()>> {
        self.tx.send(())?;
        Ok(())
    }
}

/// The receiving half a background task awaits on.
pub struct ShutdownReceiver {
    rx: broadcast::Receiver<()>,
}

impl ShutdownReceiver {
    #[must_use]
    pub fn new(rx: broadcast::Receiver<()>) -> Self {
        Self { rx }
    }

    /// Resolves once shutdown has been signaled.
    pub async fn recv(&mut self) {
        let _ = self.rx.recv().await;
    }

    #[must_use]
    pub fn resubscribe(&self) -> Self {
        Self {
            rx: self.rx.resubscribe(),
        }
    }
}

/// Creates a fresh shutdown channel pair.
#[must_use]
pub fn create_shutdown() -> (Terminator, ShutdownReceiver) {
    let (tx, rx) = broadcast::channel(1);
    (Terminator::new(tx), ShutdownReceiver::new(rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receiver_observes_shutdown() {
        let (terminator, mut rx) = create_shutdown();
        terminator.shutdown().unwrap();
        rx.recv().await;
    }

    #[tokio::test]
    async fn resubscribed_receiver_also_observes_shutdown() {
        let (terminator, rx) = create_shutdown();
        let mut rx2 = rx.resubscribe();
        terminator.shutdown().unwrap();
        rx2.recv().await;
    }
}
