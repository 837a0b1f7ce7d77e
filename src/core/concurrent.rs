//! Configurable worker-pool executor with drain-on-destroy semantics.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

use super::worker_pool::{
    is_running_within, next_executor_id, shared_pool, ExecutorCounters, ExecutorStats, RunningScope,
    WorkerPool,
};
use super::{Executor, ExecutorError, FailureHandler, Task};
use crate::config::{Degree, ExecutorConfig};

/// Outstanding-work bookkeeping for one executor.
#[derive(Default)]
struct Tracker {
    counters: ExecutorCounters,
    /// Accepted tasks (including pending timers) that have not finished.
    unfinished: Mutex<usize>,
    idle: Condvar,
}

impl Tracker {
    fn release(&self) {
        let mut unfinished = self.unfinished.lock();
        *unfinished -= 1;
        if *unfinished == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut unfinished = self.unfinished.lock();
        self.idle.wait_while(&mut unfinished, |n| *n > 0);
    }
}

/// Travels with an accepted task. Dropping it, whether after the task ran
/// or because the task was discarded unrun, releases the task's slot in the
/// tracker exactly once.
struct Admission {
    tracker: Arc<Tracker>,
    started: bool,
}

impl Admission {
    fn new(tracker: Arc<Tracker>) -> Self {
        *tracker.unfinished.lock() += 1;
        tracker.counters.uninitiated_tasks.fetch_add(1, Ordering::Relaxed);
        Self {
            tracker,
            started: false,
        }
    }

    fn run(mut self, executor_id: u64, task: Task, on_failure: &FailureHandler) {
        self.started = true;
        let counters = &self.tracker.counters;
        counters.uninitiated_tasks.fetch_sub(1, Ordering::Relaxed);
        counters.active_tasks.fetch_add(1, Ordering::Relaxed);

        let _scope = RunningScope::enter(executor_id);
        match task.run_guarded() {
            Ok(()) => {
                counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
            }
            Err(failure) => {
                counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                on_failure(&failure);
            }
        }
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        let counters = &self.tracker.counters;
        if self.started {
            counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
        } else {
            counters.uninitiated_tasks.fetch_sub(1, Ordering::Relaxed);
        }
        self.tracker.release();
    }
}

/// Executor backed by a worker pool, configured by concurrency degree.
///
/// - **Degree 0** (`Degree::Shared`): tasks run on the process-wide shared
///   pool. No ordering guarantee.
/// - **Degree 1** (`Degree::Serial`): one dedicated worker. Tasks run one at
///   a time in submission order.
/// - **Degree N** (`Degree::Concurrent`): N dedicated workers. No ordering
///   guarantee.
///
/// Timed tasks register a one-shot timer on the same pool; when it fires the
/// task is queued exactly as `add` would queue it.
///
/// # Drop
///
/// Dropping the executor blocks until every accepted task has finished,
/// including tasks whose timers have not fired yet. Nothing is cancelled.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_executors::core::{ConcurrentExecutor, ExecutorExt};
///
/// let lane = ConcurrentExecutor::with_degree(1)?;
/// lane.add_fn(|| println!("first"))?;
/// lane.add_fn(|| println!("second"))?;
/// drop(lane); // waits for both
/// ```
pub struct ConcurrentExecutor {
    id: u64,
    config: ExecutorConfig,
    /// Dedicated pool; `None` for the shared pool.
    dedicated: Option<WorkerPool>,
    tracker: Arc<Tracker>,
    on_failure: FailureHandler,
}

impl ConcurrentExecutor {
    /// Create an executor from configuration, using the configured failure
    /// policy.
    ///
    /// # Errors
    ///
    /// - `ExecutorError::InvalidConfig` if the configuration is invalid
    /// - `ExecutorError::Spawn` if worker threads cannot be started
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        let on_failure = config.on_failure.handler();
        Self::with_failure_handler(config, on_failure)
    }

    /// Create an executor that reports task failures to `on_failure`.
    ///
    /// # Errors
    ///
    /// Same as [`ConcurrentExecutor::new`].
    pub fn with_failure_handler(
        config: ExecutorConfig,
        on_failure: FailureHandler,
    ) -> Result<Self, ExecutorError> {
        config.validate().map_err(ExecutorError::InvalidConfig)?;

        let dedicated = match config.degree().worker_count() {
            Some(workers) => Some(WorkerPool::spawn(
                &config.thread_name,
                workers,
                config.max_queue_depth,
                config.thread_stack_size,
            )?),
            None => None,
        };

        let executor = Self {
            id: next_executor_id(),
            config,
            dedicated,
            tracker: Arc::new(Tracker::default()),
            on_failure,
        };
        debug!(
            executor = executor.id,
            degree = ?executor.degree(),
            "concurrent executor created"
        );
        Ok(executor)
    }

    /// Executor with `degree` workers and default settings.
    ///
    /// # Errors
    ///
    /// `ExecutorError::Spawn` if worker threads cannot be started.
    pub fn with_degree(degree: usize) -> Result<Self, ExecutorError> {
        Self::new(ExecutorConfig::new().with_degree(degree))
    }

    /// Executor on the process-wide shared pool. The pool itself is started
    /// on first submission.
    #[must_use]
    pub fn shared() -> Self {
        let config = ExecutorConfig::new();
        Self {
            id: next_executor_id(),
            on_failure: config.on_failure.handler(),
            config,
            dedicated: None,
            tracker: Arc::new(Tracker::default()),
        }
    }

    /// Concurrency degree.
    #[must_use]
    pub const fn degree(&self) -> Degree {
        self.config.degree()
    }

    /// Configuration this executor was built from.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Process-unique id, as it appears in logs.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Current statistics. Advisory, like `uninitiated_task_count`.
    #[must_use]
    pub fn stats(&self) -> ExecutorStats {
        let workers = self.dedicated.as_ref().map_or(0, WorkerPool::worker_count);
        self.tracker.counters.snapshot(workers)
    }

    /// Block until every accepted task, including pending timers, has
    /// finished. The executor stays usable afterwards.
    ///
    /// Called from inside one of this executor's own tasks it would wait on
    /// itself, so it logs a warning and returns immediately instead.
    pub fn wait_idle(&self) {
        if is_running_within(self.id) {
            warn!(executor = self.id, "wait_idle called from one of the executor's own tasks");
            return;
        }
        self.tracker.wait_idle();
    }

    fn pool(&self) -> Result<&WorkerPool, ExecutorError> {
        match &self.dedicated {
            Some(pool) => Ok(pool),
            None => shared_pool(),
        }
    }

    fn wrap(&self, task: Task) -> Task {
        let executor_id = self.id;
        let admission = Admission::new(Arc::clone(&self.tracker));
        let on_failure = Arc::clone(&self.on_failure);
        Task::new(move || admission.run(executor_id, task, &on_failure))
    }
}

impl Executor for ConcurrentExecutor {
    fn add(&self, task: Task) -> Result<(), ExecutorError> {
        let pool = self.pool()?;
        pool.submit(self.wrap(task))?;
        self.tracker.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn add_at(&self, deadline: Instant, task: Task) -> Result<(), ExecutorError> {
        let pool = self.pool()?;
        pool.schedule(deadline, self.wrap(task))?;
        self.tracker.counters.scheduled_tasks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn uninitiated_task_count(&self) -> usize {
        self.tracker.counters.uninitiated_tasks.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for ConcurrentExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentExecutor")
            .field("id", &self.id)
            .field("degree", &self.degree())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Drop for ConcurrentExecutor {
    fn drop(&mut self) {
        if !is_running_within(self.id) {
            self.tracker.wait_idle();
            if let Some(pool) = &self.dedicated {
                pool.shutdown();
            }
            debug!(executor = self.id, "concurrent executor drained and dropped");
            return;
        }

        // Waiting here would wait on the task doing the dropping. Hand the
        // drain and the pool shutdown to a reaper thread instead.
        error!(
            executor = self.id,
            "executor dropped from inside one of its own tasks; draining in the background"
        );
        let tracker = Arc::clone(&self.tracker);
        let pool = self.dedicated.take();
        let reaper = thread::Builder::new()
            .name(format!("{}-reaper", self.config.thread_name))
            .spawn(move || {
                tracker.wait_idle();
                drop(pool);
            });
        if let Err(e) = reaper {
            error!(executor = self.id, error = %e, "failed to spawn reaper thread");
        }
    }
}
