//! Facade binding the reactive combinators to one scheduler.
//!
//! Every scheduled (`_via`) operation takes a [`SchedulerHandle`];
//! [`ReactiveContext`] carries that handle once so call sites build graphs
//! without threading it through every call. Pure forwarding — nothing here
//! adds behavior over the free functions in [`signal`](crate::signal) and
//! [`stream`](crate::stream).

use crate::actor::Actor;
use crate::scheduler::SchedulerHandle;
use crate::signal::{self, Signal};
use crate::stream::{self, Stream};
use crate::task::Task;

/// Scheduler-bound constructor set for reactive graphs and actors.
///
/// ```
/// use spindle::{ReactiveContext, Scheduler};
///
/// let scheduler = Scheduler::new(1);
/// let ctx = ReactiveContext::new(scheduler.handle());
///
/// let celsius = ctx.signal(20.0_f64);
/// let fahrenheit = ctx.signal_map(&celsius, |c| c * 9.0 / 5.0 + 32.0);
///
/// celsius.set_via(ctx.scheduler(), 25.0);
/// scheduler.run();
/// assert_eq!(fahrenheit.value(), 77.0);
/// ```
#[derive(Debug, Clone)]
pub struct ReactiveContext {
    scheduler: SchedulerHandle,
}

impl ReactiveContext {
    /// Binds a context to `scheduler`.
    pub fn new(scheduler: SchedulerHandle) -> Self {
        Self { scheduler }
    }

    /// The bound scheduler handle.
    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Spawns `task` on the bound scheduler.
    pub fn spawn(&self, task: Task) {
        self.scheduler.spawn(task);
    }

    /// Creates an independent [`Signal`] holding `initial`.
    pub fn signal<T>(&self, initial: T) -> Signal<T> {
        Signal::new(initial)
    }

    /// Creates an independent [`Stream`].
    pub fn stream<T>(&self) -> Stream<T> {
        Stream::new()
    }

    /// Creates an [`Actor`] bound to this context's scheduler.
    pub fn actor(&self) -> Actor {
        Actor::new(&self.scheduler)
    }

    /// [`signal::map_via`] with the bound scheduler.
    pub fn signal_map<T, R, F>(&self, input: &Signal<T>, transform: F) -> Signal<R>
    where
        T: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        signal::map_via(&self.scheduler, input, transform)
    }

    /// [`signal::combine_via`] with the bound scheduler.
    pub fn signal_combine<A, B, R, F>(
        &self,
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
        signal::combine_via(&self.scheduler, left, right, combiner)
    }

    /// [`stream::map_via`] with the bound scheduler.
    pub fn stream_map<T, R, F>(&self, input: &Stream<T>, transform: F) -> Stream<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        stream::map_via(&self.scheduler, input, transform)
    }

    /// [`stream::filter_via`] with the bound scheduler.
    pub fn stream_filter<T, P>(&self, input: &Stream<T>, predicate: P) -> Stream<T>
    where
        T: Clone + Send + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        stream::filter_via(&self.scheduler, input, predicate)
    }

    /// [`stream::fold_via`] with the bound scheduler.
    pub fn stream_fold<T, Acc, F>(&self, input: &Stream<T>, seed: Acc, fold_fn: F) -> Signal<Acc>
    where
        T: Send + 'static,
        Acc: Clone + Send + 'static,
        F: Fn(Acc, &T) -> Acc + Send + Sync + 'static,
    {
        stream::fold_via(&self.scheduler, input, seed, fold_fn)
    }
}
