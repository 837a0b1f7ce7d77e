//! Process-wide default executor.

use std::sync::OnceLock;
use std::time::Instant;

use super::{ConcurrentExecutor, Executor, ExecutorError, ExecutorStats, Task};

static SYSTEM_EXECUTOR: OnceLock<SystemExecutor> = OnceLock::new();

/// The process-wide default executor: a [`ConcurrentExecutor`] on the shared
/// pool, created on first access.
///
/// Every call to [`SystemExecutor::get`] returns the same instance. There is
/// no shutdown: the instance is a static and is never dropped, so work still
/// pending when the process exits is abandoned. Call
/// [`SystemExecutor::wait_idle`] before returning from `main` to drain it, or
/// construct a [`ConcurrentExecutor`] when deterministic teardown matters.
pub struct SystemExecutor {
    executor: ConcurrentExecutor,
}

impl SystemExecutor {
    /// The process-wide instance.
    pub fn get() -> &'static Self {
        SYSTEM_EXECUTOR.get_or_init(|| Self {
            executor: ConcurrentExecutor::shared(),
        })
    }

    /// Block until everything submitted so far has finished.
    pub fn wait_idle(&self) {
        self.executor.wait_idle();
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> ExecutorStats {
        self.executor.stats()
    }
}

impl Executor for SystemExecutor {
    fn add(&self, task: Task) -> Result<(), ExecutorError> {
        self.executor.add(task)
    }

    fn add_at(&self, deadline: Instant, task: Task) -> Result<(), ExecutorError> {
        self.executor.add_at(deadline, task)
    }

    fn uninitiated_task_count(&self) -> usize {
        self.executor.uninitiated_task_count()
    }
}
