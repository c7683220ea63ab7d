//! Cooperative multi-threaded task scheduler with a push-based reactive
//! graph and mailbox actors.
//!
//! Three layers, each usable on its own:
//!
//! 1. **Scheduler** — a fixed pool of worker threads drains one shared FIFO
//!    queue of [`Task`]s. Tasks are never preempted; [`yield_now`] is the
//!    single suspension point, and [`Scheduler::run`] blocks until the whole
//!    system is quiescent (empty queue, idle workers), re-checking the
//!    predicate so tasks that spawn tasks extend the wait.
//! 2. **Reactive graph** — [`Signal`] (always-valued cell) and [`Stream`]
//!    (discrete events) with eagerly-seeded combinators ([`signal::map`],
//!    [`signal::combine`], [`stream::filter`], [`stream::fold`], …). Every
//!    operation exists in two delivery modes: direct (observers run on the
//!    writing thread) and scheduled (`_via` — delivery runs as a spawned
//!    task). [`Subscription`] tokens cancel on drop; derived nodes retain
//!    their upstream edges via `keep_alive`.
//! 3. **Actors** — an [`Actor`] owns a [`Mailbox`] of deferred closures and
//!    a run-loop task that executes them strictly one at a time,
//!    [`subscribe`](Actor::subscribe)-ing reactive sources so their
//!    callbacks are marshalled into the mailbox instead of running on the
//!    delivering thread.
//!
//! # Guarantees
//!
//! - A task in the ready queue is held exactly once; polling and queueing
//!   pass the task by value, so double-execution is unrepresentable.
//! - `run()` returns only at a true fixed point: no queued tasks, no task
//!   mid-poll.
//! - Reads ([`Signal::value`]) never block on propagation; writes snapshot
//!   observers under the node lock and deliver after releasing it, so
//!   callbacks can freely re-enter the graph.
//! - Observer slots are tombstoned, never compacted: a cancel token can
//!   never detach an observer it did not create.
//! - A panicking task is logged and aborts the process — failures are never
//!   silently dropped.
//!
//! # Example
//!
//! ```
//! use spindle::{signal, Scheduler, Signal};
//!
//! let scheduler = Scheduler::new(2);
//! let handle = scheduler.handle();
//!
//! let celsius = Signal::new(0.0_f64);
//! let fahrenheit = signal::map_via(&handle, &celsius, |c| c * 9.0 / 5.0 + 32.0);
//!
//! celsius.set_via(&handle, 100.0);
//! scheduler.run();
//! assert_eq!(fahrenheit.value(), 212.0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actor;
pub mod context;
pub mod mailbox;
pub mod observable;
mod observers;
pub mod scheduler;
pub mod signal;
pub mod stream;
pub mod subscription;
pub mod task;

pub use actor::{Actor, ActorBuilder, Message};
pub use context::ReactiveContext;
pub use mailbox::Mailbox;
pub use observable::Observable;
pub use scheduler::{BuildError, Scheduler, SchedulerBuilder, SchedulerHandle};
pub use signal::Signal;
pub use stream::Stream;
pub use subscription::Subscription;
pub use task::{yield_now, Task, YieldNow};
