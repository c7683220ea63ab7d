//! Push-based event channel.
//!
//! A [`Stream`] carries discrete values with no notion of "current": each
//! [`emit`](Stream::emit) is delivered to the observers registered at that
//! moment and is then gone. A subscriber registered after an emission never
//! sees it. Pipelines are built with [`map`], [`filter`] and [`fold`] (and
//! their scheduled `_via` twins); `fold` crosses back into signal land by
//! accumulating emissions into a [`Signal`].
//!
//! Delivery modes, observer tombstoning and lifetime rules match
//! [`Signal`](crate::signal): direct emission runs observers on the emitting
//! thread after the lock is released; scheduled emission spawns the delivery
//! as a [`Task`]; upstream subscriptions are retained by the derived node via
//! [`keep_alive`](Stream::keep_alive).

use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::observable::Observable;
use crate::observers::{ObserverFn, ObserverSet};
use crate::scheduler::SchedulerHandle;
use crate::signal::Signal;
use crate::subscription::Subscription;
use crate::task::Task;

/// State guarded by the stream lock.
struct StreamInner<T> {
    observers: ObserverSet<T>,
}

/// Heap part shared by all handles to one stream.
struct StreamShared<T> {
    inner: Mutex<StreamInner<T>>,
    /// Subscriptions tied to this stream's lifetime via
    /// [`Stream::keep_alive`].
    retained: Mutex<Vec<Subscription>>,
}

/// Shared event channel with multicast delivery.
///
/// Cloning a `Stream` clones a handle to the same channel; the channel lives
/// until the last handle (including those captured by downstream update
/// closures) drops.
pub struct Stream<T> {
    shared: Arc<StreamShared<T>>,
}

impl<T> Stream<T> {
    /// Creates a channel with no observers.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(StreamShared {
                inner: Mutex::new(StreamInner {
                    observers: ObserverSet::new(),
                }),
                retained: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Delivers `value` to current observers on this thread.
    ///
    /// The observer list is snapshotted under the lock and invoked after
    /// release, in subscription order; observers added or cancelled during
    /// delivery take effect from the next emission.
    pub fn emit(&self, value: T) {
        let observers = self.snapshot();
        for observer in &observers {
            (**observer)(&value);
        }
    }

    /// Spawns the delivery of `value` as a task on `scheduler`.
    ///
    /// The observer snapshot is taken now; the callbacks run when the
    /// scheduler drives the task. A delivery task is spawned even with no
    /// observers registered, keeping emission cost uniform.
    pub fn emit_via(&self, scheduler: &SchedulerHandle, value: T)
    where
        T: Send + 'static,
    {
        let observers = self.snapshot();
        scheduler.spawn(Task::new(async move {
            for observer in &observers {
                (**observer)(&value);
            }
        }));
    }

    /// Registers `callback` for every emission after this call.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
        T: Send + 'static,
    {
        let index = {
            let mut inner = self.shared.inner.lock().expect("stream lock poisoned");
            inner.observers.insert(Arc::new(callback) as ObserverFn<T>)
        };
        trace!(slot = index, "stream observer registered");
        let node = Arc::downgrade(&self.shared);
        Subscription::new(move || cancel_slot(&node, index))
    }

    /// Ties `subscription` to this stream's lifetime.
    pub fn keep_alive(&self, subscription: Subscription) {
        self.shared
            .retained
            .lock()
            .expect("stream lock poisoned")
            .push(subscription);
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.shared
            .inner
            .lock()
            .expect("stream lock poisoned")
            .observers
            .active()
    }

    fn snapshot(&self) -> Vec<ObserverFn<T>> {
        self.shared
            .inner
            .lock()
            .expect("stream lock poisoned")
            .observers
            .snapshot()
    }
}

impl<T> Default for Stream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

impl<T> Observable for Stream<T>
where
    T: Send + 'static,
{
    type Item = T;

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Stream::subscribe(self, callback)
    }
}

/// Tombstones `index` on the node behind `node`, if it is still alive.
fn cancel_slot<T>(node: &Weak<StreamShared<T>>, index: usize) {
    if let Some(shared) = node.upgrade() {
        let mut inner = shared.inner.lock().expect("stream lock poisoned");
        inner.observers.clear(index);
        trace!(slot = index, "stream observer cancelled");
    }
}

// ============================================================================
// Combinators
// ============================================================================

/// Stream of `transform(&value)` for every upstream emission, direct
/// delivery.
pub fn map<T, R, F>(input: &Stream<T>, transform: F) -> Stream<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(&T) -> R + Send + Sync + 'static,
{
    let output = Stream::new();
    let forward = {
        let output = output.clone();
        move |value: &T| output.emit(transform(value))
    };
    output.keep_alive(input.subscribe(forward));
    output
}

/// Like [`map`], but transformed emissions propagate through `scheduler`.
pub fn map_via<T, R, F>(scheduler: &SchedulerHandle, input: &Stream<T>, transform: F) -> Stream<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(&T) -> R + Send + Sync + 'static,
{
    let output = Stream::new();
    let forward = {
        let output = output.clone();
        let scheduler = scheduler.clone();
        move |value: &T| output.emit_via(&scheduler, transform(value))
    };
    output.keep_alive(input.subscribe(forward));
    output
}

/// Stream of the upstream emissions for which `predicate` holds, direct
/// delivery.
pub fn filter<T, P>(input: &Stream<T>, predicate: P) -> Stream<T>
where
    T: Clone + Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    let output = Stream::new();
    let forward = {
        let output = output.clone();
        move |value: &T| {
            if predicate(value) {
                output.emit(value.clone());
            }
        }
    };
    output.keep_alive(input.subscribe(forward));
    output
}

/// Like [`filter`], but passing emissions propagate through `scheduler`.
pub fn filter_via<T, P>(scheduler: &SchedulerHandle, input: &Stream<T>, predicate: P) -> Stream<T>
where
    T: Clone + Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    let output = Stream::new();
    let forward = {
        let output = output.clone();
        let scheduler = scheduler.clone();
        move |value: &T| {
            if predicate(value) {
                output.emit_via(&scheduler, value.clone());
            }
        }
    };
    output.keep_alive(input.subscribe(forward));
    output
}

/// Signal accumulating upstream emissions, direct delivery.
///
/// Starts at `seed`; each emission replaces the accumulator with
/// `fold_fn(accumulator, &value)` and publishes it. Emissions are folded in
/// the order this subscription observes them.
pub fn fold<T, Acc, F>(input: &Stream<T>, seed: Acc, fold_fn: F) -> Signal<Acc>
where
    T: Send + 'static,
    Acc: Clone + Send + 'static,
    F: Fn(Acc, &T) -> Acc + Send + Sync + 'static,
{
    let output = Signal::new(seed);
    let forward = {
        let output = output.clone();
        move |value: &T| {
            let next = fold_fn(output.value(), value);
            output.set(next);
        }
    };
    output.keep_alive(input.subscribe(forward));
    output
}

/// Like [`fold`], but accumulator updates propagate through `scheduler`.
pub fn fold_via<T, Acc, F>(
    scheduler: &SchedulerHandle,
    input: &Stream<T>,
    seed: Acc,
    fold_fn: F,
) -> Signal<Acc>
where
    T: Send + 'static,
    Acc: Clone + Send + 'static,
    F: Fn(Acc, &T) -> Acc + Send + Sync + 'static,
{
    let output = Signal::new(seed);
    let forward = {
        let output = output.clone();
        let scheduler = scheduler.clone();
        move |value: &T| {
            let next = fold_fn(output.value(), value);
            output.set_via(&scheduler, next);
        }
    };
    output.keep_alive(input.subscribe(forward));
    output
}
