//! Tokio runtime executor implementation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tracing::warn;

use crate::core::{log_failures, Executor, ExecutorError, FailureHandler, Task, TaskFailure};

/// Runs tasks on a tokio runtime's blocking pool; timed tasks sleep on the
/// runtime's timer first.
///
/// Dropping a `TokioExecutor` does not wait for submitted work; the runtime
/// owns it. Submitting to a runtime that has shut down still returns `Ok`;
/// the task is dropped unrun and reported as `TaskFailure::Dropped`.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: Handle,
    on_failure: FailureHandler,
    uninitiated: Arc<AtomicUsize>,
}

impl TokioExecutor {
    /// Create a `TokioExecutor` from a tokio runtime handle.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self::with_failure_handler(handle, log_failures())
    }

    /// Create a `TokioExecutor` reporting task failures to `on_failure`.
    #[must_use]
    pub fn with_failure_handler(handle: Handle, on_failure: FailureHandler) -> Self {
        Self {
            handle,
            on_failure,
            uninitiated: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Use the runtime the caller is running inside.
    ///
    /// # Errors
    ///
    /// `ExecutorError::Detached` outside a tokio runtime.
    pub fn current() -> Result<Self, ExecutorError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| ExecutorError::Detached)
    }

    fn blocking_job(&self, task: Task) -> impl FnOnce() + Send + 'static {
        let job = BlockingJob::new(task, &self.uninitiated, &self.on_failure);
        move || job.run()
    }
}

/// A task on its way to the blocking pool. A shut-down runtime drops it
/// unrun; that is reported as `TaskFailure::Dropped`.
struct BlockingJob {
    task: Option<Task>,
    uninitiated: Arc<AtomicUsize>,
    on_failure: FailureHandler,
}

impl BlockingJob {
    fn new(task: Task, uninitiated: &Arc<AtomicUsize>, on_failure: &FailureHandler) -> Self {
        uninitiated.fetch_add(1, Ordering::Relaxed);
        Self {
            task: Some(task),
            uninitiated: Arc::clone(uninitiated),
            on_failure: Arc::clone(on_failure),
        }
    }

    fn run(mut self) {
        if let Some(task) = self.task.take() {
            self.uninitiated.fetch_sub(1, Ordering::Relaxed);
            if let Err(failure) = task.run_guarded() {
                (self.on_failure)(&failure);
            }
        }
    }
}

impl Drop for BlockingJob {
    fn drop(&mut self) {
        if self.task.take().is_some() {
            self.uninitiated.fetch_sub(1, Ordering::Relaxed);
            warn!("tokio runtime dropped a task without running it");
            (self.on_failure)(&TaskFailure::Dropped);
        }
    }
}

impl Executor for TokioExecutor {
    fn add(&self, task: Task) -> Result<(), ExecutorError> {
        let job = self.blocking_job(task);
        self.handle.spawn_blocking(job);
        Ok(())
    }

    fn add_at(&self, deadline: Instant, task: Task) -> Result<(), ExecutorError> {
        let job = self.blocking_job(task);
        let handle = self.handle.clone();
        self.handle.spawn(async move {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            handle.spawn_blocking(job);
        });
        Ok(())
    }

    fn uninitiated_task_count(&self) -> usize {
        self.uninitiated.load(Ordering::Relaxed)
    }
}
