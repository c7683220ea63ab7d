//! Unit of cooperative work owned by the scheduler.
//!
//! A [`Task`] wraps a boxed future with no output. Tasks are created from an
//! `async` block (or any `Future<Output = ()>`), handed to the scheduler with
//! `spawn`, and driven to completion by worker threads. The only way a task
//! gives up its worker voluntarily is [`yield_now`]; every `Pending` poll is
//! treated by the scheduler as an explicit yield and the task is re-queued at
//! the back of the ready queue.
//!
//! # Design
//!
//! - A `Task` exclusively owns its future. The value itself moves between the
//!   ready queue and the polling worker, so "queued at most once" and "polled
//!   by at most one worker" hold structurally rather than by bookkeeping.
//! - Dropping a `Task` drops the future without polling it again. Locals held
//!   across a suspension point are torn down by their own destructors; the
//!   remainder of the body never runs.
//!
//! # Example
//!
//! ```
//! use spindle::{yield_now, Scheduler, Task};
//!
//! let scheduler = Scheduler::new(1);
//! scheduler.spawn(Task::new(async {
//!     // do a slice of work, then give other tasks a turn
//!     yield_now().await;
//!     // continue here on a later turn
//! }));
//! scheduler.run();
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A spawnable unit of cooperative work.
///
/// Owns a `Future<Output = ()>`; the scheduler polls it until completion.
/// Dropping a `Task` cancels it: the future is torn down at its current
/// suspension point and the rest of the body does not run.
#[must_use = "a task does nothing until spawned on a scheduler"]
pub struct Task {
    future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
}

impl Task {
    /// Wraps a future into a spawnable task.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            future: Box::pin(future),
        }
    }

    /// Polls the underlying future. Called only by scheduler workers.
    pub(crate) fn poll(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        self.future.as_mut().poll(cx)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

/// Suspends the current task until its next scheduler turn.
///
/// This is the single suspension point of the runtime. The returned future is
/// `Pending` exactly once; the worker that observes the `Pending` re-queues
/// the task at the back of the ready queue, so resumption may happen on any
/// worker thread. The waker is signalled before returning `Pending`, which
/// keeps the future well-behaved under executors that rely on wakes.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`].
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
