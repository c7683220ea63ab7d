//! Cancellation token tying an observer registration to a scope.
//!
//! Every `subscribe` call on a [`Signal`](crate::Signal) or
//! [`Stream`](crate::Stream) returns a [`Subscription`]. Holding it keeps the
//! observer registered; cancelling it (explicitly or by dropping) deregisters
//! the observer. The token is move-only and fires its cancel action at most
//! once, so double-cancel and cancel-after-drop cannot occur.
//!
//! The cancel action holds only a weak reference back to the node it came
//! from. A token can therefore outlive its node; cancelling then is a no-op.

use std::fmt;

/// Owned registration handle; cancels on drop.
///
/// Obtained from `subscribe`. Call [`unsubscribe`](Subscription::unsubscribe)
/// to cancel early, hand it to a node's `keep_alive` to tie it to that node's
/// lifetime, or simply let it fall out of scope.
#[must_use = "dropping a subscription immediately cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Creates a token that runs `cancel` the first time it is cancelled.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Creates an inert token. Cancelling it is a no-op.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// Cancels the registration. Idempotent: the second and later calls do
    /// nothing, as does cancelling an [`empty`](Subscription::empty) token.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Whether the token still holds a pending cancel action.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn unsubscribe_fires_the_cancel_action_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&fired);
        let mut subscription = Subscription::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        });

        assert!(subscription.is_active());
        subscription.unsubscribe();
        subscription.unsubscribe();

        assert!(!subscription.is_active());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_cancels_an_armed_token() {
        let fired = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&fired);
        {
            let _subscription = Subscription::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_after_unsubscribe_does_not_fire_again() {
        let fired = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&fired);
        {
            let mut subscription = Subscription::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
            subscription.unsubscribe();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_token_is_inert() {
        let mut subscription = Subscription::empty();
        assert!(!subscription.is_active());
        subscription.unsubscribe();

        let mut defaulted = Subscription::default();
        defaulted.unsubscribe();
    }
}
