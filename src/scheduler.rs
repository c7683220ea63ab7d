//! Cooperative multi-threaded task scheduler.
//!
//! A fixed pool of OS worker threads drains one shared FIFO ready queue of
//! [`Task`]s. Workers poll a task until it either completes or yields; a
//! yielded task goes to the back of the queue and resumes later, possibly on
//! a different worker. Tasks are never preempted: between suspension points a
//! task owns its worker outright.
//!
//! # Design
//!
//! - One `Mutex<CoreState>` holds the ready queue, the count of tasks
//!   currently held by workers, and the shutdown flag. Keeping the count
//!   under the same lock as the queue makes the quiescence predicate of
//!   [`Scheduler::run`] exact: it can never observe "queue empty, nothing
//!   active" while a worker still holds a task it might re-queue.
//! - Two condvars on that mutex: `work` parks idle workers, `idle` parks
//!   quiescence waiters. The same split a bounded channel uses for its two
//!   wait conditions.
//! - Readiness is structural. A task is ready exactly when it sits in the
//!   queue, so the waker passed to `poll` carries no information and wakes
//!   are no-ops; the worker itself re-queues a task that returned `Pending`.
//! - A panic inside a task body is fatal: it is logged and the process
//!   aborts. Task failures are never swallowed.
//!
//! # Example
//!
//! ```
//! use spindle::{Scheduler, Task};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let scheduler = Scheduler::new(2);
//! let counter = Arc::new(AtomicUsize::new(0));
//! for _ in 0..4 {
//!     let counter = Arc::clone(&counter);
//!     scheduler.spawn(Task::new(async move {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     }));
//! }
//! scheduler.run();
//! assert_eq!(counter.load(Ordering::SeqCst), 4);
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::io;
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process;
use std::sync::{Arc, Condvar, Mutex};
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::task::Task;

// ============================================================================
// Errors and configuration
// ============================================================================

/// Failure to construct a [`Scheduler`].
///
/// The only fallible step is spawning the worker threads.
#[derive(Debug, Error)]
#[error("failed to spawn scheduler worker thread")]
pub struct BuildError {
    #[from]
    source: io::Error,
}

/// Fluent configuration for a [`Scheduler`].
///
/// ```
/// use spindle::Scheduler;
///
/// let scheduler = Scheduler::builder()
///     .worker_threads(2)
///     .thread_name_prefix("pipeline")
///     .build()
///     .unwrap();
/// assert_eq!(scheduler.worker_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerBuilder {
    worker_threads: Option<usize>,
    thread_name_prefix: String,
}

impl SchedulerBuilder {
    /// Creates a builder with default settings: one worker per available
    /// core, threads named `spindle-worker-{index}`.
    pub fn new() -> Self {
        Self {
            worker_threads: None,
            thread_name_prefix: "spindle".to_owned(),
        }
    }

    /// Sets the number of worker threads. `0` is clamped to `1`.
    #[must_use]
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = Some(count);
        self
    }

    /// Sets the prefix used for worker thread names
    /// (`{prefix}-worker-{index}`).
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Spawns the workers and returns the running scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if a worker thread cannot be spawned; workers
    /// spawned before the failure are shut down and joined first.
    pub fn build(self) -> Result<Scheduler, BuildError> {
        let workers = self.worker_threads.unwrap_or_else(default_worker_count).max(1);
        let core = Arc::new(Core {
            state: Mutex::new(CoreState {
                ready: VecDeque::new(),
                active: 0,
                shutdown: false,
            }),
            work: Condvar::new(),
            idle: Condvar::new(),
            workers,
        });

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let worker_core = Arc::clone(&core);
            let spawned = thread::Builder::new()
                .name(format!("{}-worker-{index}", self.thread_name_prefix))
                .spawn(move || worker_loop(&worker_core, index));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    core.begin_shutdown();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(BuildError::from(source));
                }
            }
        }

        debug!(workers, "scheduler started");
        Ok(Scheduler { core, workers: handles })
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_worker_count() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

// ============================================================================
// Shared core
// ============================================================================

/// State guarded by the core mutex.
#[derive(Debug)]
struct CoreState {
    /// Tasks ready to be polled, in resumption order.
    ready: VecDeque<Task>,
    /// Tasks currently held by a worker mid-poll.
    active: usize,
    /// Once set, workers exit instead of picking up more work.
    shutdown: bool,
}

/// State shared between the scheduler, its handles, and its workers.
#[derive(Debug)]
struct Core {
    state: Mutex<CoreState>,
    /// Signalled when the ready queue gains a task or shutdown begins.
    work: Condvar,
    /// Signalled when the scheduler may have reached quiescence.
    idle: Condvar,
    workers: usize,
}

impl Core {
    fn spawn(&self, task: Task) {
        let mut state = self.state.lock().expect("scheduler state lock poisoned");
        if state.shutdown {
            drop(state);
            // Tear the task down outside the lock; its destructors may spawn.
            drop(task);
            warn!("task spawned after scheduler shutdown was dropped");
            return;
        }
        state.ready.push_back(task);
        let queued = state.ready.len();
        drop(state);
        self.work.notify_one();
        trace!(queued, "task spawned");
    }

    fn run(&self) {
        let mut state = self.state.lock().expect("scheduler state lock poisoned");
        while !(state.ready.is_empty() && state.active == 0) {
            state = self
                .idle
                .wait(state)
                .expect("scheduler state lock poisoned");
        }
    }

    fn begin_shutdown(&self) {
        self.state
            .lock()
            .expect("scheduler state lock poisoned")
            .shutdown = true;
        self.work.notify_all();
    }

    fn queued_tasks(&self) -> usize {
        self.state
            .lock()
            .expect("scheduler state lock poisoned")
            .ready
            .len()
    }

    fn active_tasks(&self) -> usize {
        self.state
            .lock()
            .expect("scheduler state lock poisoned")
            .active
    }

    fn is_quiescent(&self) -> bool {
        let state = self.state.lock().expect("scheduler state lock poisoned");
        state.ready.is_empty() && state.active == 0
    }
}

/// Waker whose wakes are no-ops.
///
/// Ready tasks live in the queue, so there is nothing for a wake to record;
/// this exists only to satisfy the `poll` contract.
struct NoopWaker;

impl Wake for NoopWaker {
    fn wake(self: Arc<Self>) {}

    fn wake_by_ref(self: &Arc<Self>) {}
}

// ============================================================================
// Worker loop
// ============================================================================

fn worker_loop(core: &Core, worker: usize) {
    debug!(worker, "scheduler worker started");
    let waker = Waker::from(Arc::new(NoopWaker));
    let mut cx = Context::from_waker(&waker);

    loop {
        let mut task = {
            let mut state = core.state.lock().expect("scheduler state lock poisoned");
            loop {
                if state.shutdown {
                    debug!(worker, "scheduler worker stopping");
                    return;
                }
                if let Some(task) = state.ready.pop_front() {
                    state.active += 1;
                    break task;
                }
                state = core
                    .work
                    .wait(state)
                    .expect("scheduler state lock poisoned");
            }
        };

        trace!(worker, "resuming task");
        let outcome = catch_unwind(AssertUnwindSafe(|| task.poll(&mut cx)));

        match outcome {
            Ok(Poll::Pending) => {
                // An explicit yield: back of the queue, same critical section
                // as the active decrement so quiescence stays exact.
                let mut state = core.state.lock().expect("scheduler state lock poisoned");
                state.active -= 1;
                state.ready.push_back(task);
                drop(state);
                core.work.notify_one();
            }
            Ok(Poll::Ready(())) => {
                trace!(worker, "task completed");
                // Destructors run outside the lock; they may spawn or touch
                // reactive nodes.
                drop(task);
                let mut state = core.state.lock().expect("scheduler state lock poisoned");
                state.active -= 1;
                let quiescent = state.ready.is_empty() && state.active == 0;
                drop(state);
                if quiescent {
                    core.idle.notify_all();
                }
            }
            Err(payload) => {
                error!(
                    worker,
                    panic = panic_message(payload.as_ref()),
                    "task panicked; aborting process"
                );
                process::abort();
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

// ============================================================================
// Public surface
// ============================================================================

/// Owner of the worker threads.
///
/// Spawn work with [`spawn`](Scheduler::spawn) (or through a
/// [`SchedulerHandle`]), then block on [`run`](Scheduler::run) until the
/// system goes quiescent. Dropping the scheduler stops the workers after
/// their current task and drops whatever is still queued; `run` is the way
/// to drain.
#[derive(Debug)]
pub struct Scheduler {
    core: Arc<Core>,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Starts a scheduler with `workers` threads (`0` is clamped to `1`).
    ///
    /// # Panics
    ///
    /// Panics if the worker threads cannot be spawned; use
    /// [`builder`](Scheduler::builder) for a fallible construction.
    pub fn new(workers: usize) -> Self {
        Self::builder()
            .worker_threads(workers)
            .build()
            .expect("failed to spawn scheduler worker threads")
    }

    /// Returns a builder for custom configuration.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    /// Returns a cheap cloneable handle that can spawn from any thread.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            core: Arc::clone(&self.core),
        }
    }

    /// Moves `task` into the ready queue.
    pub fn spawn(&self, task: Task) {
        self.core.spawn(task);
    }

    /// Blocks until the ready queue is empty and no worker holds a task.
    ///
    /// The predicate is re-checked under the scheduler lock on every wake, so
    /// tasks that spawn further tasks (or yield in a loop) extend the wait
    /// until the whole system truly runs dry. Work spawned after `run`
    /// returns needs another `run` call.
    ///
    /// Must not be called from inside a task: the calling task would count as
    /// active and the wait could never finish.
    pub fn run(&self) {
        self.core.run();
    }

    /// Number of tasks waiting in the ready queue right now.
    pub fn queued_tasks(&self) -> usize {
        self.core.queued_tasks()
    }

    /// Number of tasks currently being polled by workers.
    pub fn active_tasks(&self) -> usize {
        self.core.active_tasks()
    }

    /// Whether the scheduler is quiescent at this instant.
    pub fn is_quiescent(&self) -> bool {
        self.core.is_quiescent()
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.core.workers
    }
}

impl Default for Scheduler {
    /// Starts a scheduler with one worker per available core.
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("failed to spawn scheduler worker threads")
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.core.begin_shutdown();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("scheduler worker thread panicked during shutdown");
            }
        }
        // Workers are gone; tear down whatever never got to run. Collected
        // first so task destructors run without the lock held.
        let leftover: Vec<Task> = {
            let mut state = self.core.state.lock().expect("scheduler state lock poisoned");
            state.ready.drain(..).collect()
        };
        if !leftover.is_empty() {
            debug!(dropped = leftover.len(), "dropping queued tasks at scheduler shutdown");
        }
        drop(leftover);
    }
}

/// Cheap cloneable spawning handle.
///
/// Holds the scheduler core alive for spawning but cannot wait for
/// quiescence; [`Scheduler::run`] stays with the owner. Spawning on a handle
/// whose scheduler has shut down drops the task and logs a warning.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    core: Arc<Core>,
}

impl SchedulerHandle {
    /// Moves `task` into the ready queue.
    pub fn spawn(&self, task: Task) {
        self.core.spawn(task);
    }

    /// Number of tasks waiting in the ready queue right now.
    pub fn queued_tasks(&self) -> usize {
        self.core.queued_tasks()
    }

    /// Number of tasks currently being polled by workers.
    pub fn active_tasks(&self) -> usize {
        self.core.active_tasks()
    }

    /// Whether the scheduler is quiescent at this instant.
    pub fn is_quiescent(&self) -> bool {
        self.core.is_quiescent()
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.core.workers
    }
}
