//! Push-based mutable value cell.
//!
//! A [`Signal`] always holds a current value. Writing a new one notifies the
//! observers that were registered at the moment of the write; reading never
//! blocks on propagation. Derived signals are built with [`map`] and
//! [`combine`] (and their scheduled `_via` twins), which seed the derived
//! cell eagerly from the current upstream value(s) and then keep it updated.
//!
//! # Delivery modes
//!
//! * [`Signal::set`] — direct: observers run synchronously on the writing
//!   thread, after the cell's lock is released.
//! * [`Signal::set_via`] — scheduled: the value is stored synchronously, but
//!   observer invocation is packaged into a [`Task`] and spawned on the
//!   given scheduler; `run()` on that scheduler waits until the delivery and
//!   anything it triggered have finished.
//!
//! Both modes snapshot the observer list and the new value under the lock,
//! then deliver outside it, so observers may freely read, write, subscribe,
//! or cancel on any signal (including this one) without deadlocking.
//!
//! # Lifetimes
//!
//! Observers registered on a signal keep whatever they capture alive; a
//! derived signal's update closure captures the derived cell, so an upstream
//! signal keeps its derived signals alive. The reverse direction is weak: a
//! [`Subscription`] holds only a weak reference to the node it came from, and
//! [`combine`]'s recompute closure holds weak references to its inputs.
//! Dropping every handle to an upstream signal therefore tears the edge down
//! instead of leaking a cycle; a derived signal that outlives its inputs
//! simply stops updating.

use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::observable::Observable;
use crate::observers::{ObserverFn, ObserverSet};
use crate::scheduler::SchedulerHandle;
use crate::subscription::Subscription;
use crate::task::Task;

/// State guarded by the signal lock.
struct SignalInner<T> {
    value: T,
    observers: ObserverSet<T>,
}

/// Heap part shared by all handles to one signal.
struct SignalShared<T> {
    inner: Mutex<SignalInner<T>>,
    /// Subscriptions tied to this signal's lifetime via
    /// [`Signal::keep_alive`]; cancelled when the last handle drops.
    retained: Mutex<Vec<Subscription>>,
}

/// Shared mutable value cell with change notification.
///
/// Cloning a `Signal` clones a handle to the same cell. The cell lives until
/// the last handle drops — including handles captured inside observer
/// closures of other nodes, which is how derivation chains stay alive.
pub struct Signal<T> {
    shared: Arc<SignalShared<T>>,
}

impl<T> Signal<T> {
    /// Creates a cell holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(SignalShared {
                inner: Mutex::new(SignalInner {
                    value: initial,
                    observers: ObserverSet::new(),
                }),
                retained: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns a clone of the current value.
    ///
    /// Never waits on in-flight propagation; between a `set` and the end of
    /// its observer deliveries, reads already see the new value.
    pub fn value(&self) -> T
    where
        T: Clone,
    {
        self.shared
            .inner
            .lock()
            .expect("signal lock poisoned")
            .value
            .clone()
    }

    /// Stores `value` and delivers it to current observers on this thread.
    ///
    /// The observer list and the new value are snapshotted under the lock;
    /// invocation happens after release, in subscription order. Observers
    /// added or cancelled during delivery take effect from the next write.
    pub fn set(&self, value: T)
    where
        T: Clone,
    {
        let (current, observers) = self.store(value);
        for observer in &observers {
            (**observer)(&current);
        }
    }

    /// Stores `value` synchronously and spawns the observer deliveries as a
    /// task on `scheduler`.
    ///
    /// The write is visible to [`value`](Signal::value) immediately; the
    /// notifications run when the scheduler next drives the task. A delivery
    /// task is spawned even with no observers registered, keeping write cost
    /// uniform.
    pub fn set_via(&self, scheduler: &SchedulerHandle, value: T)
    where
        T: Clone + Send + 'static,
    {
        let (current, observers) = self.store(value);
        scheduler.spawn(Task::new(async move {
            for observer in &observers {
                (**observer)(&current);
            }
        }));
    }

    /// Registers `callback` for every write after this call.
    ///
    /// Returns the [`Subscription`] that deregisters it. The callback slot is
    /// tombstoned on cancel, never reused, so a stale token can never detach
    /// a later observer.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
        T: Send + 'static,
    {
        let index = {
            let mut inner = self.shared.inner.lock().expect("signal lock poisoned");
            inner.observers.insert(Arc::new(callback) as ObserverFn<T>)
        };
        trace!(slot = index, "signal observer registered");
        let node = Arc::downgrade(&self.shared);
        Subscription::new(move || cancel_slot(&node, index))
    }

    /// Ties `subscription` to this signal's lifetime.
    ///
    /// Derived nodes retain their upstream subscriptions this way, so the
    /// edge is cancelled exactly when the derived node goes away.
    pub fn keep_alive(&self, subscription: Subscription) {
        self.shared
            .retained
            .lock()
            .expect("signal lock poisoned")
            .push(subscription);
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.shared
            .inner
            .lock()
            .expect("signal lock poisoned")
            .observers
            .active()
    }

    /// Replaces the value and snapshots (new value, active observers).
    fn store(&self, value: T) -> (T, Vec<ObserverFn<T>>)
    where
        T: Clone,
    {
        let mut inner = self.shared.inner.lock().expect("signal lock poisoned");
        inner.value = value;
        (inner.value.clone(), inner.observers.snapshot())
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").finish_non_exhaustive()
    }
}

impl<T> Observable for Signal<T>
where
    T: Send + 'static,
{
    type Item = T;

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Signal::subscribe(self, callback)
    }
}

/// Tombstones `index` on the node behind `node`, if it is still alive.
fn cancel_slot<T>(node: &Weak<SignalShared<T>>, index: usize) {
    if let Some(shared) = node.upgrade() {
        let mut inner = shared.inner.lock().expect("signal lock poisoned");
        inner.observers.clear(index);
        trace!(slot = index, "signal observer cancelled");
    }
}

/// Reads the current value of a possibly-shared cell.
fn current_value<T: Clone>(shared: &SignalShared<T>) -> T {
    shared
        .inner
        .lock()
        .expect("signal lock poisoned")
        .value
        .clone()
}

// ============================================================================
// Combinators
// ============================================================================

/// Derived signal holding `transform(&input.value())`, direct delivery.
///
/// Seeded eagerly at build time, then recomputed on every upstream write.
/// The upstream subscription is retained by the derived signal, so the edge
/// lives exactly as long as the output does.
pub fn map<T, R, F>(input: &Signal<T>, transform: F) -> Signal<R>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
    F: Fn(&T) -> R + Send + Sync + 'static,
{
    let output = Signal::new(transform(&input.value()));
    let forward = {
        let output = output.clone();
        move |value: &T| output.set(transform(value))
    };
    output.keep_alive(input.subscribe(forward));
    output
}

/// Like [`map`], but derived updates propagate through `scheduler`.
pub fn map_via<T, R, F>(scheduler: &SchedulerHandle, input: &Signal<T>, transform: F) -> Signal<R>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
    F: Fn(&T) -> R + Send + Sync + 'static,
{
    let output = Signal::new(transform(&input.value()));
    let forward = {
        let output = output.clone();
        let scheduler = scheduler.clone();
        move |value: &T| output.set_via(&scheduler, transform(value))
    };
    output.keep_alive(input.subscribe(forward));
    output
}

/// Derived signal holding `combiner(&left.value(), &right.value())`, direct
/// delivery.
///
/// Each input update independently triggers a recompute that reads both
/// inputs' latest values; two inputs updated back-to-back produce two output
/// updates. The recompute closure holds weak references to the inputs (strong
/// ones would keep each input alive from its own observer list); once an
/// input is gone the output stops updating.
pub fn combine<A, B, R, F>(left: &Signal<A>, right: &Signal<B>, combiner: F) -> Signal<R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    R: Clone + Send + 'static,
    F: Fn(&A, &B) -> R + Send + Sync + 'static,
{
    let output = Signal::new(combiner(&left.value(), &right.value()));
    let recompute: Arc<dyn Fn() + Send + Sync> = {
        let left = Arc::downgrade(&left.shared);
        let right = Arc::downgrade(&right.shared);
        let output = output.clone();
        Arc::new(move || {
            let (Some(left), Some(right)) = (left.upgrade(), right.upgrade()) else {
                return;
            };
            let value = combiner(&current_value(&left), &current_value(&right));
            output.set(value);
        })
    };
    let trigger = Arc::clone(&recompute);
    output.keep_alive(left.subscribe(move |_| (*trigger)()));
    output.keep_alive(right.subscribe(move |_| (*recompute)()));
    output
}

/// Like [`combine`], but derived updates propagate through `scheduler`.
pub fn combine_via<A, B, R, F>(
    scheduler: &SchedulerHandle,
    left: &Signal<A>,
    right: &Signal<B>,
    combiner: F,
) -> Signal<R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    R: Clone + Send + 'static,
    F: Fn(&A, &B) -> R + Send + Sync + 'static,
{
    let output = Signal::new(combiner(&left.value(), &right.value()));
    let recompute: Arc<dyn Fn() + Send + Sync> = {
        let left = Arc::downgrade(&left.shared);
        let right = Arc::downgrade(&right.shared);
        let output = output.clone();
        let scheduler = scheduler.clone();
        Arc::new(move || {
            let (Some(left), Some(right)) = (left.upgrade(), right.upgrade()) else {
                return;
            };
            let value = combiner(&current_value(&left), &current_value(&right));
            output.set_via(&scheduler, value);
        })
    };
    let trigger = Arc::clone(&recompute);
    output.keep_alive(left.subscribe(move |_| (*trigger)()));
    output.keep_alive(right.subscribe(move |_| (*recompute)()));
    output
}
