//! Mailbox-serialized execution context.
//!
//! An [`Actor`] owns a [`Mailbox`] of deferred closures and a run loop
//! [`Task`] that executes them one at a time. Whatever thread posts a
//! message, the message body runs inside the actor's loop, so state owned by
//! the actor needs no further synchronization. The loop is cooperative: when
//! the mailbox is empty it yields its worker instead of blocking, and it
//! keeps polling until [`stop`](Actor::stop).
//!
//! # Stopping
//!
//! `stop` flips the running flag and then posts a no-op sentinel so a loop
//! that is just about to yield wakes up and observes the flag. The flag is
//! re-checked before every pop, which means messages queued behind the stop
//! point are dropped with the actor — the usual pattern is to make stopping
//! itself a message, `actor.post({ let actor = actor.clone(); move || actor.stop() })`,
//! so everything posted before it still runs.
//!
//! # Reactive integration
//!
//! [`subscribe`](Actor::subscribe) adapts any [`Observable`] so its
//! deliveries are marshalled into the mailbox instead of running on the
//! delivering thread. [`set`](Actor::set) and [`emit`](Actor::emit) go the
//! other way: they post the mutation so it executes on the actor's turn,
//! propagating through the actor's scheduler.
//!
//! # Example
//!
//! ```
//! use spindle::{Actor, Scheduler, Signal};
//!
//! let scheduler = Scheduler::new(1);
//! let actor = Actor::new(&scheduler.handle());
//! let temperature = Signal::new(0_i32);
//!
//! scheduler.spawn(actor.run());
//! actor.set(&temperature, 42);
//! let stopper = actor.clone();
//! actor.post(move || stopper.stop());
//! scheduler.run();
//!
//! assert_eq!(temperature.value(), 42);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::mailbox::Mailbox;
use crate::observable::Observable;
use crate::scheduler::SchedulerHandle;
use crate::signal::Signal;
use crate::stream::Stream;
use crate::subscription::Subscription;
use crate::task::{yield_now, Task};

/// A deferred closure queued in an actor's mailbox.
pub type Message = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle hook; consumed on first use.
type Hook = Option<Box<dyn FnOnce() + Send>>;

struct ActorInner {
    mailbox: Mailbox<Message>,
    /// Cleared by `stop`; the run loop re-checks it before every pop.
    running: AtomicBool,
    /// Set by the first `run` call; later calls are surfaced as a bug.
    run_claimed: AtomicBool,
    on_start: Mutex<Hook>,
    on_stop: Mutex<Hook>,
}

/// Handle to a mailbox-serialized execution context.
///
/// Cloning is cheap and shares the mailbox and flags; any clone may post,
/// subscribe or stop. The message loop itself is the [`Task`] returned by
/// [`run`](Actor::run) — spawn it exactly once.
#[derive(Clone)]
pub struct Actor {
    inner: Arc<ActorInner>,
    scheduler: SchedulerHandle,
}

impl Actor {
    /// Creates an actor bound to `scheduler`, with no lifecycle hooks.
    pub fn new(scheduler: &SchedulerHandle) -> Self {
        Self::builder(scheduler).build()
    }

    /// Returns a builder for configuring lifecycle hooks.
    pub fn builder(scheduler: &SchedulerHandle) -> ActorBuilder {
        ActorBuilder {
            scheduler: scheduler.clone(),
            on_start: None,
            on_stop: None,
        }
    }

    /// Queues `message` to run inside the actor's loop. Never blocks.
    ///
    /// Messages posted after [`stop`](Actor::stop) are accepted but will not
    /// run; they are dropped with the mailbox.
    pub fn post<F>(&self, message: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.mailbox.push(Box::new(message));
    }

    /// Requests the run loop to exit.
    ///
    /// Sets the flag first, then posts a no-op sentinel so an idle loop has a
    /// message to wake up on. Messages already popped keep running to
    /// completion; the loop exits before popping anything further.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::Release);
        self.inner.mailbox.push(Box::new(|| {}));
        debug!("actor stop requested");
    }

    /// Whether the loop is still accepting turns.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Number of messages currently waiting in the mailbox.
    pub fn pending_messages(&self) -> usize {
        self.inner.mailbox.len()
    }

    /// Builds the actor's message loop as a spawnable [`Task`].
    ///
    /// Runs `on_start`, then pops and executes messages one at a time,
    /// yielding its worker whenever the mailbox is empty, until
    /// [`stop`](Actor::stop); finally runs `on_stop`. The loop task holds the
    /// actor state alive for as long as it runs.
    pub fn run(&self) -> Task {
        if self.inner.run_claimed.swap(true, Ordering::AcqRel) {
            warn!("actor run() requested more than once; messages will race between loops");
        }
        let inner = Arc::clone(&self.inner);
        Task::new(async move {
            if let Some(hook) = inner.on_start.lock().expect("actor hook lock poisoned").take() {
                hook();
            }
            while inner.running.load(Ordering::Acquire) {
                match inner.mailbox.pop() {
                    Some(message) => message(),
                    None => yield_now().await,
                }
            }
            if let Some(hook) = inner.on_stop.lock().expect("actor hook lock poisoned").take() {
                hook();
            }
            debug!("actor loop exited");
        })
    }

    /// Routes `source`'s deliveries into this actor's mailbox.
    ///
    /// The registered observer clones each delivered value and posts a
    /// message invoking `handler` with it, so the handler only ever executes
    /// inside the run loop — never on the delivering thread. Cancel the
    /// returned [`Subscription`] to detach.
    pub fn subscribe<S, F>(&self, source: &S, handler: F) -> Subscription
    where
        S: Observable,
        S::Item: Clone + Send + 'static,
        F: Fn(S::Item) + Send + Sync + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let handler = Arc::new(handler);
        source.subscribe(move |value: &S::Item| {
            let handler = Arc::clone(&handler);
            let value = value.clone();
            inner.mailbox.push(Box::new(move || (*handler)(value)));
        })
    }

    /// Posts a message that writes `value` into `signal` on the actor's
    /// turn, with delivery scheduled on the actor's scheduler.
    pub fn set<T>(&self, signal: &Signal<T>, value: T)
    where
        T: Clone + Send + 'static,
    {
        let scheduler = self.scheduler.clone();
        let signal = signal.clone();
        self.post(move || signal.set_via(&scheduler, value));
    }

    /// Posts a message that emits `value` on `stream` on the actor's turn,
    /// with delivery scheduled on the actor's scheduler.
    pub fn emit<T>(&self, stream: &Stream<T>, value: T)
    where
        T: Send + 'static,
    {
        let scheduler = self.scheduler.clone();
        let stream = stream.clone();
        self.post(move || stream.emit_via(&scheduler, value));
    }
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("running", &self.is_running())
            .field("pending", &self.pending_messages())
            .finish()
    }
}

/// Fluent configuration for an [`Actor`].
pub struct ActorBuilder {
    scheduler: SchedulerHandle,
    on_start: Hook,
    on_stop: Hook,
}

impl ActorBuilder {
    /// Hook executed once, inside the run task, before the first message.
    #[must_use]
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_start = Some(Box::new(hook));
        self
    }

    /// Hook executed once, inside the run task, after the loop exits.
    #[must_use]
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_stop = Some(Box::new(hook));
        self
    }

    /// Builds the actor in the running state.
    pub fn build(self) -> Actor {
        Actor {
            inner: Arc::new(ActorInner {
                mailbox: Mailbox::new(),
                running: AtomicBool::new(true),
                run_claimed: AtomicBool::new(false),
                on_start: Mutex::new(self.on_start),
                on_stop: Mutex::new(self.on_stop),
            }),
            scheduler: self.scheduler,
        }
    }
}

impl std::fmt::Debug for ActorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorBuilder")
            .field("on_start", &self.on_start.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scheduler;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn executes_posted_messages_in_order() {
        let scheduler = Scheduler::new(1);
        let actor = Actor::new(&scheduler.handle());
        let log = Arc::new(Mutex::new(Vec::new()));

        scheduler.spawn(actor.run());
        for n in 0..5 {
            let log = Arc::clone(&log);
            actor.post(move || log.lock().unwrap().push(n));
        }
        let stopper = actor.clone();
        actor.post(move || stopper.stop());
        scheduler.run();

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(!actor.is_running());
    }

    #[test]
    fn lifecycle_hooks_bracket_the_message_loop() {
        let scheduler = Scheduler::new(1);
        let events = Arc::new(Mutex::new(Vec::new()));

        let started = Arc::clone(&events);
        let stopped = Arc::clone(&events);
        let actor = Actor::builder(&scheduler.handle())
            .on_start(move || started.lock().unwrap().push("start"))
            .on_stop(move || stopped.lock().unwrap().push("stop"))
            .build();

        scheduler.spawn(actor.run());
        let during = Arc::clone(&events);
        actor.post(move || during.lock().unwrap().push("message"));
        let stopper = actor.clone();
        actor.post(move || stopper.stop());
        scheduler.run();

        assert_eq!(*events.lock().unwrap(), vec!["start", "message", "stop"]);
    }

    #[test]
    fn stop_skips_messages_queued_after_the_flag_flip() {
        let scheduler = Scheduler::new(1);
        let actor = Actor::new(&scheduler.handle());
        let hits = Arc::new(AtomicUsize::new(0));

        // Stop before the loop ever runs: the flag is already down when the
        // run task takes its first turn, so the queued message never runs.
        actor.stop();
        let count = Arc::clone(&hits);
        actor.post(move || {
            count.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.spawn(actor.run());
        scheduler.run();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(actor.pending_messages(), 2, "sentinel and message remain");
    }

    #[test]
    fn set_routes_through_the_actor_and_scheduler() {
        let scheduler = Scheduler::new(1);
        let actor = Actor::new(&scheduler.handle());
        let signal = Signal::new(0_i32);

        scheduler.spawn(actor.run());
        actor.set(&signal, 42);
        let stopper = actor.clone();
        actor.post(move || stopper.stop());
        scheduler.run();

        assert_eq!(signal.value(), 42);
    }

    #[test]
    fn subscribe_marshals_deliveries_into_the_loop() {
        let scheduler = Scheduler::new(1);
        let actor = Actor::new(&scheduler.handle());
        let stream = Stream::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        let subscription = actor.subscribe(&stream, move |value: i32| {
            log.lock().unwrap().push(value);
        });
        stream.keep_alive(subscription);

        scheduler.spawn(actor.run());
        stream.emit(7);
        stream.emit(8);
        let stopper = actor.clone();
        actor.post(move || stopper.stop());
        scheduler.run();

        assert_eq!(*seen.lock().unwrap(), vec![7, 8]);
    }
}
