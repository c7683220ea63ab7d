//! The subscribe seam shared by value cells and event channels.
//!
//! [`Signal`](crate::Signal) and [`Stream`](crate::Stream) both expose
//! `subscribe`; this trait names that common surface so code like
//! [`Actor::subscribe`](crate::Actor::subscribe) can accept either source
//! generically. Implementations delegate to the inherent `subscribe` of the
//! concrete node.

use crate::subscription::Subscription;

/// A source of published values that observers can register against.
pub trait Observable {
    /// The value type delivered to observers.
    type Item;

    /// Registers `callback` to run on every publication after this call.
    ///
    /// The returned [`Subscription`] deregisters the callback when cancelled
    /// or dropped; `keep_alive` on the downstream node is the usual home for
    /// it. Callbacks run on whichever thread performs the delivery, so they
    /// must be `Send + Sync`.
    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Self::Item) + Send + Sync + 'static;
}
