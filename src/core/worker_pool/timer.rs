//! One-shot timers for a worker pool.
//!
//! A single thread per pool owns a min-heap of pending timers and sleeps on a
//! Condvar until the earliest deadline. When a timer is due its task is sent
//! to the pool's channel, exactly as a direct submission would be. The thread
//! is spawned on the first `schedule` call.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error};

use crate::core::{ExecutorError, Task};

struct TimerEntry {
    deadline: Instant,
    /// Submission order; breaks ties between equal deadlines.
    seq: u64,
    task: Task,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    // Reversed so BinaryHeap pops the earliest deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct TimerState {
    heap: BinaryHeap<TimerEntry>,
    next_seq: u64,
    shutdown: bool,
}

#[derive(Default)]
struct TimerShared {
    state: Mutex<TimerState>,
    condvar: Condvar,
}

pub(super) struct TimerQueue {
    name: String,
    shared: Arc<TimerShared>,
    /// Handed to the timer thread when it is spawned.
    task_tx: Mutex<Option<Sender<Task>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    stack_size: Option<usize>,
}

impl TimerQueue {
    pub fn new(pool: &str, task_tx: Sender<Task>, stack_size: Option<usize>) -> Self {
        Self {
            name: format!("{pool}-timer"),
            shared: Arc::new(TimerShared::default()),
            task_tx: Mutex::new(Some(task_tx)),
            thread: Mutex::new(None),
            stack_size,
        }
    }

    pub fn schedule(&self, deadline: Instant, task: Task) -> Result<(), ExecutorError> {
        self.ensure_thread()?;

        let mut state = self.shared.state.lock();
        if state.shutdown {
            return Err(ExecutorError::ShutDown);
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        let earliest = state.heap.peek().is_none_or(|next| deadline < next.deadline);
        state.heap.push(TimerEntry { deadline, seq, task });
        drop(state);

        if earliest {
            self.shared.condvar.notify_one();
        }
        Ok(())
    }

    fn ensure_thread(&self) -> Result<(), ExecutorError> {
        let mut thread = self.thread.lock();
        if thread.is_some() {
            return Ok(());
        }
        let Some(task_tx) = self.task_tx.lock().clone() else {
            return Err(ExecutorError::ShutDown);
        };

        let mut builder = thread::Builder::new().name(self.name.clone());
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        let shared = Arc::clone(&self.shared);
        let name = self.name.clone();
        *thread = Some(builder.spawn(move || run_timers(&name, &shared, &task_tx))?);
        Ok(())
    }

    /// Fire every pending timer when it comes due, then stop the thread.
    pub fn shutdown(&self) {
        self.shared.state.lock().shutdown = true;
        self.shared.condvar.notify_all();

        if let Some(handle) = self.thread.lock().take() {
            if handle.join().is_err() {
                error!(timer = %self.name, "timer thread panicked");
            }
        }
        self.task_tx.lock().take();
    }
}

impl Drop for TimerQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_timers(name: &str, shared: &TimerShared, task_tx: &Sender<Task>) {
    debug!(timer = %name, "timer thread started");

    let mut state = shared.state.lock();
    loop {
        let next_deadline = state.heap.peek().map(|entry| entry.deadline);
        match next_deadline {
            Some(deadline) if deadline <= Instant::now() => {
                if let Some(entry) = state.heap.pop() {
                    MutexGuard::unlocked(&mut state, || fire(name, task_tx, entry.task));
                }
            }
            Some(deadline) => {
                // Wakes early on notify or spuriously; the loop re-checks.
                shared.condvar.wait_until(&mut state, deadline);
            }
            None if state.shutdown => break,
            None => shared.condvar.wait(&mut state),
        }
    }

    debug!(timer = %name, "timer thread exiting");
}

fn fire(name: &str, task_tx: &Sender<Task>, task: Task) {
    // Blocking send: a bounded queue applies backpressure to the timer
    // thread instead of dropping a task that was already accepted.
    if task_tx.send(task).is_err() {
        error!(timer = %name, "worker channel closed before timer task could be enqueued");
    }
}
