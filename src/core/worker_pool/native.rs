//! Native implementation of the worker pool using OS threads.
//!
//! # Design Principles
//!
//! - **No polling**: workers block on channel `recv`; timers block on a
//!   Condvar until the earliest deadline
//! - **Drain on shutdown**: dropping the sender only disconnects the channel
//!   once every queued task has been received, so nothing is abandoned
//! - **Panic containment**: a task that escapes its own guard is logged and
//!   the worker keeps serving the queue

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::timer::TimerQueue;
use crate::core::{ExecutorError, Task};

/// A set of worker threads draining one task channel, plus a timer queue
/// feeding the same channel.
pub(crate) struct WorkerPool {
    /// Thread name prefix, also used in logs.
    name: String,

    /// Task sender (to workers). Option allows clean shutdown by dropping.
    task_tx: Mutex<Option<Sender<Task>>>,

    /// Capacity of the task channel, `None` when unbounded.
    capacity: Option<usize>,

    /// One-shot timers that enqueue onto `task_tx` when due.
    timers: TimerQueue,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Number of workers spawned at construction.
    worker_count: usize,

    /// Shutdown flag (lock-free atomic).
    shutdown: AtomicBool,
}

impl WorkerPool {
    /// Spawn `worker_count` threads named `{name}-{worker_id}`.
    ///
    /// # Errors
    ///
    /// `ExecutorError::Spawn` if any thread cannot be started; threads that
    /// did start are shut down again before returning.
    pub fn spawn(
        name: &str,
        worker_count: usize,
        capacity: Option<usize>,
        stack_size: Option<usize>,
    ) -> Result<Self, ExecutorError> {
        let (task_tx, task_rx) = capacity.map_or_else(unbounded::<Task>, bounded::<Task>);

        let pool = Self {
            name: name.to_string(),
            timers: TimerQueue::new(name, task_tx.clone(), stack_size),
            task_tx: Mutex::new(Some(task_tx)),
            capacity,
            workers: Mutex::new(Vec::with_capacity(worker_count)),
            worker_count,
            shutdown: AtomicBool::new(false),
        };

        for worker_id in 0..worker_count {
            let worker = spawn_worker(name, worker_id, task_rx.clone(), stack_size)?;
            pool.workers.lock().push(worker);
        }

        info!(
            pool = name,
            worker_count = worker_count,
            capacity = ?capacity,
            "worker pool started"
        );

        Ok(pool)
    }

    /// Number of worker threads.
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Enqueue a task without blocking.
    ///
    /// # Errors
    ///
    /// - `ExecutorError::QueueFull` if the bounded channel is at capacity
    /// - `ExecutorError::ShutDown` if the pool has been shut down
    pub fn submit(&self, task: Task) -> Result<(), ExecutorError> {
        let task_tx = self.task_tx.lock();
        let Some(task_tx) = task_tx.as_ref() else {
            return Err(ExecutorError::ShutDown);
        };

        match task_tx.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let capacity = self.capacity.unwrap_or_default();
                warn!(pool = %self.name, capacity = capacity, "worker pool queue is full");
                Err(ExecutorError::QueueFull { capacity })
            }
            Err(TrySendError::Disconnected(_)) => Err(ExecutorError::ShutDown),
        }
    }

    /// Register a one-shot timer that enqueues `task` once `deadline` passes.
    ///
    /// # Errors
    ///
    /// - `ExecutorError::ShutDown` if the pool has been shut down
    /// - `ExecutorError::Spawn` if the timer thread cannot be started
    pub fn schedule(&self, deadline: Instant, task: Task) -> Result<(), ExecutorError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(ExecutorError::ShutDown);
        }
        self.timers.schedule(deadline, task)
    }

    /// Stop accepting work and join every thread.
    ///
    /// Pending timers still fire and queued tasks still run before the
    /// threads exit. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!(pool = %self.name, "shutting down worker pool");

        // The timer thread holds its own sender; it must go first.
        self.timers.shutdown();

        // Drop the sender to unblock all workers waiting on recv()
        {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
        }

        let current = thread::current().id();
        let mut workers = self.workers.lock();
        for (worker_id, worker) in workers.drain(..).enumerate() {
            if worker.thread().id() == current {
                warn!(pool = %self.name, worker_id = worker_id, "not joining the calling worker");
                continue;
            }
            if worker.join().is_err() {
                warn!(pool = %self.name, worker_id = worker_id, "worker panicked");
            }
        }

        info!(pool = %self.name, worker_count = self.worker_count, "worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn a worker thread.
fn spawn_worker(
    name: &str,
    worker_id: usize,
    task_rx: Receiver<Task>,
    stack_size: Option<usize>,
) -> Result<JoinHandle<()>, ExecutorError> {
    let mut builder = thread::Builder::new().name(format!("{name}-{worker_id}"));
    if let Some(stack_size) = stack_size {
        builder = builder.stack_size(stack_size);
    }

    let pool = name.to_string();
    let handle = builder.spawn(move || {
        debug!(pool = %pool, worker_id = worker_id, "worker thread started");

        // recv() keeps returning queued tasks after the sender is dropped and
        // only errors once the channel is both empty and disconnected.
        while let Ok(task) = task_rx.recv() {
            if panic::catch_unwind(AssertUnwindSafe(|| task.run())).is_err() {
                error!(pool = %pool, worker_id = worker_id, "panic escaped task guard");
            }
        }

        debug!(pool = %pool, worker_id = worker_id, "worker thread exiting");
    })?;

    Ok(handle)
}
