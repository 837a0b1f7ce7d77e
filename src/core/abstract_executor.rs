//! Type-erased executors.
//!
//! [`AbstractExecutor`] owns any [`Executor`]; [`AbstractExecutorRef`] points
//! at one without owning it. Both forward every call unchanged: no extra
//! queueing, buffering, or ordering.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant, SystemTime};

use super::{Executor, ExecutorError, Task};

/// Owning, type-erased executor. The wrapped executor lives exactly as long
/// as this value.
///
/// ```rust,ignore
/// use prometheus_executors::core::{AbstractExecutor, ConcurrentExecutor, ExecutorExt};
///
/// let executor = AbstractExecutor::new(ConcurrentExecutor::with_degree(8)?);
/// executor.add_fn(|| println!("hi from AbstractExecutor"))?;
/// let handle = executor.handle();
/// handle.add_fn(|| println!("hi through a reference"))?;
/// ```
pub struct AbstractExecutor {
    // Sole strong reference; handles only ever hold `Weak`s.
    inner: Arc<dyn Executor>,
}

impl AbstractExecutor {
    /// Take ownership of `executor`.
    pub fn new<E>(executor: E) -> Self
    where
        E: Executor + 'static,
    {
        Self {
            inner: Arc::new(executor),
        }
    }

    /// Non-owning reference to this executor.
    #[must_use]
    pub fn handle(&self) -> AbstractExecutorRef {
        AbstractExecutorRef {
            target: Target::Weak(Arc::downgrade(&self.inner)),
        }
    }
}

impl Executor for AbstractExecutor {
    fn add(&self, task: Task) -> Result<(), ExecutorError> {
        self.inner.add(task)
    }

    fn add_at(&self, deadline: Instant, task: Task) -> Result<(), ExecutorError> {
        self.inner.add_at(deadline, task)
    }

    fn add_after(&self, delay: Duration, task: Task) -> Result<(), ExecutorError> {
        self.inner.add_after(delay, task)
    }

    fn add_at_system_time(&self, at: SystemTime, task: Task) -> Result<(), ExecutorError> {
        self.inner.add_at_system_time(at, task)
    }

    fn uninitiated_task_count(&self) -> usize {
        self.inner.uninitiated_task_count()
    }
}

impl fmt::Debug for AbstractExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractExecutor").finish_non_exhaustive()
    }
}

#[derive(Clone)]
enum Target {
    Weak(Weak<dyn Executor>),
    Static(&'static dyn Executor),
}

/// Non-owning, cloneable reference to an executor.
///
/// # Lifetime
///
/// The reference never keeps its target alive. Whoever owns the target must
/// keep it alive for as long as work should flow through the reference.
/// Once the target has been dropped, every call fails with
/// [`ExecutorError::Detached`]; `is_attached` reports this ahead of time.
/// Tasks accepted before the drop are unaffected: the target drains them as
/// part of its own destruction.
#[derive(Clone)]
pub struct AbstractExecutorRef {
    target: Target,
}

impl AbstractExecutorRef {
    /// Reference an executor held in an `Arc`.
    pub fn new<E>(executor: &Arc<E>) -> Self
    where
        E: Executor + 'static,
    {
        let weak: Weak<E> = Arc::downgrade(executor);
        Self {
            target: Target::Weak(weak),
        }
    }

    /// Reference an executor that lives for the rest of the process, such as
    /// [`SystemExecutor::get`](crate::core::SystemExecutor::get).
    #[must_use]
    pub fn from_static(executor: &'static dyn Executor) -> Self {
        Self {
            target: Target::Static(executor),
        }
    }

    /// False once the referenced executor has been dropped.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        match &self.target {
            Target::Weak(weak) => weak.strong_count() > 0,
            Target::Static(_) => true,
        }
    }

    fn with_target<R>(
        &self,
        f: impl FnOnce(&dyn Executor) -> Result<R, ExecutorError>,
    ) -> Result<R, ExecutorError> {
        match &self.target {
            Target::Weak(weak) => {
                let strong = weak.upgrade().ok_or(ExecutorError::Detached)?;
                f(strong.as_ref())
            }
            Target::Static(executor) => f(*executor),
        }
    }
}

impl<E> From<&Arc<E>> for AbstractExecutorRef
where
    E: Executor + 'static,
{
    fn from(executor: &Arc<E>) -> Self {
        Self::new(executor)
    }
}

impl Executor for AbstractExecutorRef {
    fn add(&self, task: Task) -> Result<(), ExecutorError> {
        self.with_target(|executor| executor.add(task))
    }

    fn add_at(&self, deadline: Instant, task: Task) -> Result<(), ExecutorError> {
        self.with_target(|executor| executor.add_at(deadline, task))
    }

    fn add_after(&self, delay: Duration, task: Task) -> Result<(), ExecutorError> {
        self.with_target(|executor| executor.add_after(delay, task))
    }

    fn add_at_system_time(&self, at: SystemTime, task: Task) -> Result<(), ExecutorError> {
        self.with_target(|executor| executor.add_at_system_time(at, task))
    }

    fn uninitiated_task_count(&self) -> usize {
        self.with_target(|executor| Ok(executor.uninitiated_task_count()))
            .unwrap_or(0)
    }
}

impl fmt::Debug for AbstractExecutorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractExecutorRef")
            .field("attached", &self.is_attached())
            .finish()
    }
}
