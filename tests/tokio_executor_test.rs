//! Integration tests for TokioExecutor
#![cfg(feature = "tokio-runtime")]

use prometheus_executors::core::{
    AbstractExecutorRef, Executor, ExecutorExt, SerialExecutor, Task, TaskFailure,
};
use prometheus_executors::runtime::TokioExecutor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn test_add_runs_on_blocking_pool() {
    let rt = runtime();
    let executor = TokioExecutor::new(rt.handle().clone());
    let (tx, rx) = crossbeam_channel::bounded(1);

    executor.add_fn(move || tx.send(()).unwrap()).unwrap();
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
}

#[test]
fn test_add_at_waits_for_deadline() {
    let rt = runtime();
    let executor = TokioExecutor::new(rt.handle().clone());
    let (tx, rx) = crossbeam_channel::bounded(1);
    let start = Instant::now();

    executor
        .add_at(
            start + Duration::from_millis(50),
            Task::new(move || tx.send(Instant::now()).unwrap()),
        )
        .unwrap();

    let fired = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(fired.duration_since(start) >= Duration::from_millis(50));
}

#[test]
fn test_panics_reach_failure_handler() {
    let rt = runtime();
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    let (tx, rx) = crossbeam_channel::bounded(1);
    let executor = TokioExecutor::with_failure_handler(
        rt.handle().clone(),
        Arc::new(move |f: &TaskFailure| {
            sink.lock().unwrap().push(f.to_string());
            tx.send(()).unwrap();
        }),
    );

    executor.add_fn(|| panic!("tokio boom")).unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(failures.lock().unwrap()[0].contains("tokio boom"));
}

#[test]
fn test_shut_down_runtime_reports_dropped_tasks() {
    let rt = runtime();
    let handle = rt.handle().clone();
    rt.shutdown_timeout(Duration::from_millis(100));

    let (tx, rx) = crossbeam_channel::unbounded();
    let executor = TokioExecutor::with_failure_handler(
        handle,
        Arc::new(move |f: &TaskFailure| tx.send(f.to_string()).unwrap()),
    );
    let ran = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&ran);
    executor.add_fn(move || flag.store(true, Ordering::SeqCst)).unwrap();
    let flag = Arc::clone(&ran);
    executor
        .add_fn_after(Duration::from_millis(1), move || flag.store(true, Ordering::SeqCst))
        .unwrap();

    for _ in 0..2 {
        let failure = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(failure, "task was dropped before it ran");
    }
    assert!(!ran.load(Ordering::SeqCst));
    assert_eq!(executor.uninitiated_task_count(), 0);
}

#[test]
fn test_current_outside_runtime_is_detached() {
    assert!(TokioExecutor::current().is_err());
}

#[test]
fn test_serial_over_tokio_keeps_order() {
    let rt = runtime();
    let backend = Arc::new(TokioExecutor::new(rt.handle().clone()));
    let serial = SerialExecutor::new(AbstractExecutorRef::new(&backend)).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for i in 0..10 {
        let seen = Arc::clone(&seen);
        serial.add_fn(move || seen.lock().unwrap().push(i)).unwrap();
    }

    drop(serial);
    assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
}
