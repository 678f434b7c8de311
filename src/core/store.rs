//! Session state store
//!
//! Single source of truth for the observable [`ValidationState`]. Every
//! mutation goes through one merge operation that replaces the snapshot
//! wholesale, so observers never see a half-applied update.

use tokio::sync::watch;

use crate::types::ValidationState;

/// Holds the current snapshot and notifies observers on every replacement
#[derive(Debug)]
pub struct StateStore {
    tx: watch::Sender<ValidationState>,
}

impl StateStore {
    pub fn new(initial: ValidationState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> ValidationState {
        self.tx.borrow().clone()
    }

    /// Merge update: clone the current snapshot, apply the mutation, replace
    /// the whole value, notify observers
    pub fn apply(&self, update: impl FnOnce(&mut ValidationState)) {
        let mut next = self.snapshot();
        update(&mut next);
        // Send failure only means no observer is subscribed; the store's own
        // copy is still replaced
        let _ = self.tx.send(next);
    }

    /// Replace the snapshot outright (session start/reset)
    pub fn replace(&self, state: ValidationState) {
        let _ = self.tx.send(state);
    }

    /// Observe snapshots; each change delivers the full consistent state
    pub fn subscribe(&self) -> watch::Receiver<ValidationState> {
        self.tx.subscribe()
    }
}
