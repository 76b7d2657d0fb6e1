use std::sync::Arc;

use tokio::sync::watch;

/// Monotonic revision bumped whenever catalog, transaction or user data
/// changes. Readers compare revisions to decide when to re-fetch.
#[derive(Clone)]
pub struct Invalidation {
    tx: Arc<watch::Sender<u64>>,
}

impl Invalidation {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn bump(&self, reason: &'static str) -> u64 {
        self.tx.send_modify(|rev| *rev += 1);
        let rev = *self.tx.borrow();
        tracing::debug!(revision = rev, reason, "data invalidated");
        rev
    }

    pub fn current(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for Invalidation {
    fn default() -> Self {
        Self::new()
    }
}
