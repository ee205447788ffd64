//! Shutdown coordination.

use tokio::sync::broadcast;

/// Fan-out shutdown notice for the server and background tasks.
///
/// Cloning shares the same channel; any clone can trigger it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Notify every subscriber. Triggering with no subscribers is a no-op.
    pub fn trigger(&self) {
        let receivers = self.tx.send(()).unwrap_or(0);
        tracing::debug!(receivers, "Shutdown triggered");
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once `rx` sees a shutdown notice or its sender is gone.
pub async fn wait(mut rx: broadcast::Receiver<()>) {
    // Lagged and Closed both mean there is nothing left to wait for.
    let _ = rx.recv().await;
}
