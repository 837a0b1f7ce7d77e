//! The unit of work accepted by every executor, and the failure channel for
//! work that goes wrong after it was accepted.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use super::error::TaskFailure;

/// A deferred, zero-argument unit of work that runs exactly once.
///
/// ```
/// use prometheus_executors::core::Task;
///
/// let task = Task::new(|| println!("hello"));
/// task.run();
/// ```
pub struct Task {
    job: Box<dyn FnOnce() + Send + 'static>,
}

impl Task {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self { job: Box::new(f) }
    }

    /// Run the task on the current thread. A panic unwinds to the caller.
    pub fn run(self) {
        (self.job)();
    }

    /// Run the task, converting an unwinding panic into a [`TaskFailure`].
    ///
    /// # Errors
    ///
    /// Returns `TaskFailure::Panicked` if the task body panicked.
    pub fn run_guarded(self) -> Result<(), TaskFailure> {
        panic::catch_unwind(AssertUnwindSafe(self.job)).map_err(|payload| TaskFailure::Panicked {
            message: panic_message(payload.as_ref()),
        })
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

/// Receives every [`TaskFailure`] an executor observes.
pub type FailureHandler = Arc<dyn Fn(&TaskFailure) + Send + Sync>;

/// Handler that reports failures through `tracing` at error level.
#[must_use]
pub fn log_failures() -> FailureHandler {
    Arc::new(|failure: &TaskFailure| {
        error!(failure = %failure, "task failed");
    })
}

/// Handler that reports the failure and then aborts the process.
#[must_use]
pub fn abort_on_failure() -> FailureHandler {
    Arc::new(|failure: &TaskFailure| {
        error!(failure = %failure, "task failed, aborting process");
        std::process::abort();
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
