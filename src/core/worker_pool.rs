//! Thread pool backend shared by every [`ConcurrentExecutor`].
//!
//! This is the backend collaborator the executors are layered on: it accepts
//! a task and runs it exactly once on some worker, accepts one-shot timers
//! that never fire early, and on shutdown blocks until its workers exit.
//! Bookkeeping of *which* work belongs to which executor lives in
//! [`ConcurrentExecutor`]; the pool only moves tasks onto threads.
//!
//! Two flavours exist:
//!
//! - **Dedicated**: N named OS threads owned by one executor and joined when
//!   that executor is dropped.
//! - **Shared**: a single process-wide pool, created on first use and never
//!   torn down, used by every executor configured with degree 0.
//!
//! [`ConcurrentExecutor`]: crate::core::ConcurrentExecutor

mod native;
mod timer;

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::shared_pool_threads;
use crate::core::ExecutorError;

pub(crate) use native::WorkerPool;

/// Statistics about executor utilization.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutorStats {
    /// Dedicated worker threads (0 for the shared pool).
    pub worker_count: usize,

    /// Tasks accepted through `add`.
    pub submitted_tasks: u64,

    /// Tasks accepted through `add_at`/`add_after`.
    pub scheduled_tasks: u64,

    /// Currently executing tasks.
    pub active_tasks: u64,

    /// Tasks that returned normally.
    pub completed_tasks: u64,

    /// Tasks that panicked.
    pub failed_tasks: u64,

    /// Accepted tasks that have not started yet, including pending timers.
    pub uninitiated_tasks: usize,
}

/// Internal counters for executor statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct ExecutorCounters {
    pub submitted_tasks: AtomicU64,
    pub scheduled_tasks: AtomicU64,
    pub active_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub uninitiated_tasks: AtomicUsize,
}

impl ExecutorCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize) -> ExecutorStats {
        ExecutorStats {
            worker_count,
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            scheduled_tasks: self.scheduled_tasks.load(Ordering::Relaxed),
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            uninitiated_tasks: self.uninitiated_tasks.load(Ordering::Relaxed),
        }
    }
}

static NEXT_EXECUTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id used in logs and in the running-scope check.
pub(crate) fn next_executor_id() -> u64 {
    NEXT_EXECUTOR_ID.fetch_add(1, Ordering::Relaxed)
}

thread_local! {
    /// Executors whose tasks are currently on this thread's stack.
    static RUNNING: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// Marks the current thread as running a task of executor `id` until dropped.
pub(crate) struct RunningScope {
    id: u64,
}

impl RunningScope {
    pub fn enter(id: u64) -> Self {
        RUNNING.with(|running| running.borrow_mut().push(id));
        Self { id }
    }
}

impl Drop for RunningScope {
    fn drop(&mut self) {
        RUNNING.with(|running| {
            let mut running = running.borrow_mut();
            if let Some(pos) = running.iter().rposition(|id| *id == self.id) {
                running.remove(pos);
            }
        });
    }
}

/// True when the current thread is inside a task of executor `id`.
pub(crate) fn is_running_within(id: u64) -> bool {
    RUNNING.with(|running| running.borrow().contains(&id))
}

static SHARED_POOL: OnceLock<WorkerPool> = OnceLock::new();
static SHARED_POOL_INIT: Mutex<()> = parking_lot::const_mutex(());

/// The process-wide pool, spawned on first use.
///
/// Spawn failures are returned to the caller and the next call tries again.
pub(crate) fn shared_pool() -> Result<&'static WorkerPool, ExecutorError> {
    if let Some(pool) = SHARED_POOL.get() {
        return Ok(pool);
    }
    let _init = SHARED_POOL_INIT.lock();
    if let Some(pool) = SHARED_POOL.get() {
        return Ok(pool);
    }
    let pool = WorkerPool::spawn("shared-pool", shared_pool_threads(), None, None)?;
    Ok(SHARED_POOL.get_or_init(|| pool))
}
