//! Strictly ordered, mutually exclusive execution over any backend.
//!
//! A [`SerialExecutor`] owns a private degree-1 [`ConcurrentExecutor`], the
//! *lane*, and a non-owning reference to the *backend* that actually runs
//! the work. `add` queues a coordinator on the lane. The lane's single
//! worker takes coordinators in FIFO order; each one hands the real task to
//! the backend and then blocks the lane worker on a one-shot completion
//! signal until that task has returned. Only then does the next coordinator
//! start.
//!
//! Blocking the lane worker, never the caller of `add`, is what keeps two
//! tasks from overlapping even when the backend runs many things at once.
//! The backend stays free to run unrelated work while the lane waits.
//!
//! Each `SerialExecutor` therefore costs exactly one parked thread while a
//! task is in flight; the backlog behind it is queue memory, which
//! `ExecutorConfig::max_queue_depth` bounds if backpressure is wanted.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::{debug, error};

use super::{
    AbstractExecutorRef, ConcurrentExecutor, Executor, ExecutorError, FailureHandler, Task,
    TaskFailure,
};
use crate::config::ExecutorConfig;
use crate::util::clock::duration_ms;

/// Executor adapter enforcing mutual exclusion and FIFO order over an
/// arbitrary backend.
///
/// Guarantees, for the tasks given to one `SerialExecutor`:
///
/// 1. No two of them ever run at the same time.
/// 2. They run in submission order, and each one's side effects are visible
///    to the next.
///
/// Dropping a `SerialExecutor` waits for every accepted task, like
/// [`ConcurrentExecutor`].
///
/// # Failures
///
/// Problems that surface after `add` returned go to the failure handler:
/// a panicking task (`TaskFailure::Panicked`), a backend that refused the
/// task (`TaskFailure::Rejected`), or a backend that destroyed it unrun
/// (`TaskFailure::Dropped`). A backend that holds the task and never runs it
/// leaves the lane blocked; this is logged at error level every
/// `stall_warning` interval and never retried.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use prometheus_executors::core::{AbstractExecutorRef, ConcurrentExecutor, ExecutorExt, SerialExecutor};
///
/// let pool = Arc::new(ConcurrentExecutor::with_degree(8)?);
/// let serial = SerialExecutor::new(AbstractExecutorRef::new(&pool))?;
/// serial.add_fn(|| println!("one"))?;
/// serial.add_fn(|| println!("two"))?; // starts after "one" has returned
/// ```
pub struct SerialExecutor {
    // Declared first: dropping the lane drains it while the backend
    // reference is still in place.
    lane: ConcurrentExecutor,
    backend: AbstractExecutorRef,
    stall_warning: Duration,
    on_failure: FailureHandler,
}

impl SerialExecutor {
    /// Serialize work onto `backend` with default settings.
    ///
    /// # Errors
    ///
    /// `ExecutorError::Spawn` if the lane thread cannot be started.
    pub fn new(backend: AbstractExecutorRef) -> Result<Self, ExecutorError> {
        Self::with_config(
            backend,
            ExecutorConfig::new().with_thread_name("serial-lane"),
        )
    }

    /// Serialize work onto `backend`. The lane always has degree 1 whatever
    /// `config.degree` says; the remaining fields apply to the lane.
    ///
    /// # Errors
    ///
    /// - `ExecutorError::InvalidConfig` if the configuration is invalid
    /// - `ExecutorError::Spawn` if the lane thread cannot be started
    pub fn with_config(
        backend: AbstractExecutorRef,
        config: ExecutorConfig,
    ) -> Result<Self, ExecutorError> {
        let on_failure = config.on_failure.handler();
        Self::with_failure_handler(backend, config, on_failure)
    }

    /// Like [`SerialExecutor::with_config`], reporting failures to
    /// `on_failure`.
    ///
    /// # Errors
    ///
    /// Same as [`SerialExecutor::with_config`].
    pub fn with_failure_handler(
        backend: AbstractExecutorRef,
        config: ExecutorConfig,
        on_failure: FailureHandler,
    ) -> Result<Self, ExecutorError> {
        let config = config.with_degree(1);
        let stall_warning = config.stall_warning();
        let lane = ConcurrentExecutor::with_failure_handler(config, Arc::clone(&on_failure))?;
        debug!(lane = lane.id(), "serial executor created");
        Ok(Self {
            lane,
            backend,
            stall_warning,
            on_failure,
        })
    }

    /// The executor that runs the tasks.
    #[must_use]
    pub const fn underlying_executor(&self) -> &AbstractExecutorRef {
        &self.backend
    }

    /// Block until every accepted task has finished.
    pub fn wait_idle(&self) {
        self.lane.wait_idle();
    }

    fn coordinator(&self, task: Task) -> Task {
        let handoff = Handoff {
            lane: self.lane.id(),
            backend: self.backend.clone(),
            stall_warning: self.stall_warning,
            on_failure: Arc::clone(&self.on_failure),
        };
        Task::new(move || handoff.run(task))
    }
}

impl Executor for SerialExecutor {
    /// Queue `task` on the lane. `Ok` means the lane accepted it; the backend
    /// only sees the task later, so a backend refusal (including `QueueFull`
    /// or `Spawn` exhaustion) is never returned here. It reaches the failure
    /// handler as `TaskFailure::Rejected`.
    fn add(&self, task: Task) -> Result<(), ExecutorError> {
        if !self.backend.is_attached() {
            return Err(ExecutorError::Detached);
        }
        self.lane.add(self.coordinator(task))
    }

    /// The timer lives on the lane; when it fires, the task takes its place
    /// in the lane queue behind whatever was submitted before that moment.
    fn add_at(&self, deadline: Instant, task: Task) -> Result<(), ExecutorError> {
        if !self.backend.is_attached() {
            return Err(ExecutorError::Detached);
        }
        self.lane.add_at(deadline, self.coordinator(task))
    }

    fn uninitiated_task_count(&self) -> usize {
        self.lane.uninitiated_task_count()
    }
}

impl fmt::Debug for SerialExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialExecutor")
            .field("lane", &self.lane)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// Coordinator state, run on the lane worker.
struct Handoff {
    lane: u64,
    backend: AbstractExecutorRef,
    stall_warning: Duration,
    on_failure: FailureHandler,
}

impl Handoff {
    fn run(self, task: Task) {
        let (done_tx, done_rx) = bounded::<Result<(), TaskFailure>>(1);
        let lane = self.lane;
        let delegated = Task::new(move || {
            // Dropping the serial executor from inside its own task must not
            // wait on that task.
            let _scope = super::worker_pool::RunningScope::enter(lane);
            let _ = done_tx.send(task.run_guarded());
        });

        if let Err(e) = self.backend.add(delegated) {
            error!(lane = self.lane, error = %e, "backend refused serial task");
            (self.on_failure)(&TaskFailure::Rejected(e));
            return;
        }

        let mut waited = Duration::ZERO;
        loop {
            match done_rx.recv_timeout(self.stall_warning) {
                Ok(Ok(())) => return,
                Ok(Err(failure)) => {
                    (self.on_failure)(&failure);
                    return;
                }
                Err(RecvTimeoutError::Timeout) => {
                    waited += self.stall_warning;
                    error!(
                        lane = self.lane,
                        waited_ms = duration_ms(waited),
                        "serial lane stalled: backend has not completed the delegated task"
                    );
                }
                Err(RecvTimeoutError::Disconnected) => {
                    error!(lane = self.lane, "backend dropped a serial task without running it");
                    (self.on_failure)(&TaskFailure::Dropped);
                    return;
                }
            }
        }
    }
}
