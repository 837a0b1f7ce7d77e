//! The executor capability set.

use std::time::{Duration, Instant, SystemTime};

use super::{ExecutorError, Task};
use crate::util::clock::{deadline_after, deadline_from_system_time};

/// Anything that accepts [`Task`]s for execution.
///
/// `add` is mandatory. Timed submission is optional: executors without a
/// timer facility keep the default `add_at`, which returns
/// [`ExecutorError::TimersUnsupported`].
///
/// Every method is non-blocking from the caller's point of view. An `Err`
/// means the task was not accepted and has been dropped; an `Ok` means it
/// will run exactly once.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_executors::core::{ConcurrentExecutor, Executor, Task};
/// use std::time::Duration;
///
/// let pool = ConcurrentExecutor::with_degree(4)?;
/// pool.add(Task::new(|| println!("now")))?;
/// pool.add_after(Duration::from_millis(200), Task::new(|| println!("later")))?;
/// ```
pub trait Executor: Send + Sync {
    /// Run `task` soon, exactly once, on some worker.
    ///
    /// # Errors
    ///
    /// Resource exhaustion or shutdown of the executor.
    fn add(&self, task: Task) -> Result<(), ExecutorError>;

    /// Run `task` no earlier than `deadline`. Deadlines in the past are due
    /// immediately.
    ///
    /// # Errors
    ///
    /// `TimersUnsupported` unless the executor overrides this method.
    fn add_at(&self, deadline: Instant, task: Task) -> Result<(), ExecutorError> {
        let _ = (deadline, task);
        Err(ExecutorError::TimersUnsupported)
    }

    /// Run `task` no earlier than `delay` after this call.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::add_at`], plus `DeadlineOverflow`.
    fn add_after(&self, delay: Duration, task: Task) -> Result<(), ExecutorError> {
        let deadline = deadline_after(delay)?;
        self.add_at(deadline, task)
    }

    /// Like [`Executor::add_at`] with a wall-clock deadline.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::add_at`].
    fn add_at_system_time(&self, at: SystemTime, task: Task) -> Result<(), ExecutorError> {
        let deadline = deadline_from_system_time(at)?;
        self.add_at(deadline, task)
    }

    /// Tasks accepted but not yet started. Advisory only: the value may be
    /// stale by the time the caller reads it.
    fn uninitiated_task_count(&self) -> usize {
        0
    }
}

/// Closure-taking conveniences over [`Executor`].
pub trait ExecutorExt: Executor {
    /// `add(Task::new(f))`.
    ///
    /// # Errors
    ///
    /// See [`Executor::add`].
    fn add_fn<F>(&self, f: F) -> Result<(), ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.add(Task::new(f))
    }

    /// `add_at(deadline, Task::new(f))`.
    ///
    /// # Errors
    ///
    /// See [`Executor::add_at`].
    fn add_fn_at<F>(&self, deadline: Instant, f: F) -> Result<(), ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.add_at(deadline, Task::new(f))
    }

    /// `add_after(delay, Task::new(f))`.
    ///
    /// # Errors
    ///
    /// See [`Executor::add_after`].
    fn add_fn_after<F>(&self, delay: Duration, f: F) -> Result<(), ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.add_after(delay, Task::new(f))
    }
}

impl<E: Executor + ?Sized> ExecutorExt for E {}
