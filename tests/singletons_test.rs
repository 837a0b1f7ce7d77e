//! Integration tests for the process-wide executors

use prometheus_executors::core::{
    AbstractExecutorRef, ExecutorExt, SystemExecutor, ThreadPerTaskExecutor,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn test_system_executor_is_one_instance() {
    let a = SystemExecutor::get();
    let b = std::thread::spawn(|| SystemExecutor::get() as *const SystemExecutor as usize)
        .join()
        .unwrap();
    assert_eq!(a as *const SystemExecutor as usize, b);
}

#[test]
fn test_system_executor_runs_work_concurrently() {
    let executor = SystemExecutor::get();
    let barrier = Arc::new(std::sync::Barrier::new(3));
    let (tx, rx) = crossbeam_channel::unbounded();

    for _ in 0..3 {
        let barrier = Arc::clone(&barrier);
        let tx = tx.clone();
        executor
            .add_fn(move || {
                barrier.wait();
                tx.send(()).unwrap();
            })
            .unwrap();
    }

    for _ in 0..3 {
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}

#[test]
fn test_system_executor_wait_idle() {
    let executor = SystemExecutor::get();
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..4 {
        let done = Arc::clone(&done);
        executor
            .add_fn(move || {
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    executor.wait_idle();
    assert_eq!(done.load(Ordering::SeqCst), 4);
}

#[test]
fn test_thread_per_task_is_one_instance() {
    assert!(std::ptr::eq(ThreadPerTaskExecutor::get(), ThreadPerTaskExecutor::get()));
}

#[test]
fn test_thread_per_task_uses_distinct_threads() {
    let executor = ThreadPerTaskExecutor::new();
    let ids = Arc::new(Mutex::new(HashSet::new()));
    let barrier = Arc::new(std::sync::Barrier::new(4));

    for _ in 0..4 {
        let ids = Arc::clone(&ids);
        let barrier = Arc::clone(&barrier);
        executor
            .add_fn(move || {
                ids.lock().unwrap().insert(std::thread::current().id());
                barrier.wait();
            })
            .unwrap();
    }

    // Dropping joins every spawned thread.
    drop(executor);
    assert_eq!(ids.lock().unwrap().len(), 4);
}

#[test]
fn test_thread_per_task_thread_names() {
    let executor = ThreadPerTaskExecutor::new();
    let (tx, rx) = crossbeam_channel::bounded(1);
    executor
        .add_fn(move || {
            tx.send(std::thread::current().name().map(str::to_owned)).unwrap();
        })
        .unwrap();
    let name = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert!(name.starts_with("thread-per-task-"));
}

#[test]
fn test_static_reference_never_detaches() {
    let handle = AbstractExecutorRef::from_static(SystemExecutor::get());
    assert!(handle.is_attached());
    let (tx, rx) = crossbeam_channel::bounded(1);
    handle.add_fn(move || tx.send(()).unwrap()).unwrap();
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
}
