//! One dedicated OS thread per task.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{log_failures, Executor, ExecutorError, FailureHandler, Task};

static THREAD_PER_TASK_EXECUTOR: OnceLock<ThreadPerTaskExecutor> = OnceLock::new();

/// Spawns a new thread for every task; the thread runs that one task and
/// exits.
///
/// There is no pool to host timers, so `add_at` and `add_after` return
/// [`ExecutorError::TimersUnsupported`].
///
/// Dropping an owned instance joins every thread it spawned. The singleton
/// from [`ThreadPerTaskExecutor::get`] is never dropped.
pub struct ThreadPerTaskExecutor {
    threads: Mutex<Vec<JoinHandle<()>>>,
    spawned: AtomicU64,
    /// Threads spawned whose task has not started yet.
    uninitiated: Arc<AtomicUsize>,
    on_failure: FailureHandler,
}

impl ThreadPerTaskExecutor {
    /// The process-wide instance.
    pub fn get() -> &'static Self {
        THREAD_PER_TASK_EXECUTOR.get_or_init(Self::new)
    }

    /// An owned instance that logs task failures.
    #[must_use]
    pub fn new() -> Self {
        Self::with_failure_handler(log_failures())
    }

    /// An owned instance reporting task failures to `on_failure`.
    #[must_use]
    pub fn with_failure_handler(on_failure: FailureHandler) -> Self {
        Self {
            threads: Mutex::new(Vec::new()),
            spawned: AtomicU64::new(0),
            uninitiated: Arc::new(AtomicUsize::new(0)),
            on_failure,
        }
    }

    /// Threads spawned and not yet joined.
    #[must_use]
    pub fn live_threads(&self) -> usize {
        self.threads.lock().len()
    }

    /// Join threads that already exited.
    fn reap(threads: &mut Vec<JoinHandle<()>>) {
        let mut i = 0;
        while i < threads.len() {
            if threads[i].is_finished() {
                let handle = threads.swap_remove(i);
                if handle.join().is_err() {
                    warn!("thread-per-task thread panicked outside its task guard");
                }
            } else {
                i += 1;
            }
        }
    }
}

impl Default for ThreadPerTaskExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for ThreadPerTaskExecutor {
    fn add(&self, task: Task) -> Result<(), ExecutorError> {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let uninitiated = Arc::clone(&self.uninitiated);
        let on_failure = Arc::clone(&self.on_failure);

        let mut threads = self.threads.lock();
        Self::reap(&mut threads);

        uninitiated.fetch_add(1, Ordering::Relaxed);
        let counter = Arc::clone(&uninitiated);
        let spawned = thread::Builder::new()
            .name(format!("thread-per-task-{n}"))
            .spawn(move || {
                counter.fetch_sub(1, Ordering::Relaxed);
                if let Err(failure) = task.run_guarded() {
                    on_failure(&failure);
                }
            });

        match spawned {
            Ok(handle) => {
                threads.push(handle);
                Ok(())
            }
            Err(e) => {
                uninitiated.fetch_sub(1, Ordering::Relaxed);
                warn!(error = %e, "failed to spawn thread for task");
                Err(ExecutorError::Spawn(e))
            }
        }
    }

    fn uninitiated_task_count(&self) -> usize {
        self.uninitiated.load(Ordering::Relaxed)
    }
}

impl Drop for ThreadPerTaskExecutor {
    fn drop(&mut self) {
        let threads = std::mem::take(self.threads.get_mut());
        let count = threads.len();
        let current = thread::current().id();
        for handle in threads {
            if handle.thread().id() == current {
                warn!("thread-per-task executor dropped from one of its own tasks");
                continue;
            }
            if handle.join().is_err() {
                warn!("thread-per-task thread panicked outside its task guard");
            }
        }
        debug!(joined = count, "thread-per-task executor dropped");
    }
}
