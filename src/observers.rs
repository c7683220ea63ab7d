//! Tombstoned observer-slot storage shared by signals and streams.
//!
//! Slots are append-only: a registration gets the next index and keeps it for
//! the lifetime of the node. Cancelling nulls the slot (a tombstone) instead
//! of compacting the vector, so indices held by outstanding subscriptions are
//! never invalidated and a stale double-cancel can never hit a stranger's
//! slot. The trade-off is that slot storage grows monotonically with
//! subscribe/cancel churn on a long-lived node.

use std::sync::Arc;

/// Shared callback invoked with a borrowed value on every publication.
pub(crate) type ObserverFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Append-only slot arena for a node's observers.
pub(crate) struct ObserverSet<T> {
    slots: Vec<Option<ObserverFn<T>>>,
}

impl<T> ObserverSet<T> {
    pub(crate) fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Registers an observer and returns its stable slot index.
    pub(crate) fn insert(&mut self, observer: ObserverFn<T>) -> usize {
        let index = self.slots.len();
        self.slots.push(Some(observer));
        index
    }

    /// Tombstones a slot. Out-of-range or already-cleared slots are no-ops.
    pub(crate) fn clear(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
    }

    /// Clones the active observers in registration order.
    ///
    /// Publication iterates this snapshot after releasing the node lock, so
    /// observers registered or cancelled mid-delivery affect later
    /// publications only.
    pub(crate) fn snapshot(&self) -> Vec<ObserverFn<T>> {
        self.slots.iter().flatten().cloned().collect()
    }

    /// Number of active (non-tombstoned) observers.
    pub(crate) fn active(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

impl<T> Default for ObserverSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
