//! Tests for builder modules

use prometheus_executors::builders::{build_executors, load_config, ExecutorBuilder};
use prometheus_executors::config::{Degree, ExecutorsConfig, FailurePolicy};
use prometheus_executors::core::{AbstractExecutorRef, ExecutorExt, TaskFailure};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_builder_defaults() {
    let builder = ExecutorBuilder::new("pool1");
    assert_eq!(builder.name(), "pool1");
    assert_eq!(builder.config().degree(), Degree::Shared);
    assert_eq!(builder.config().on_failure, FailurePolicy::Log);
}

#[test]
fn test_builder_builds_working_executor() {
    let executor = ExecutorBuilder::new("builder-test")
        .degree(3)
        .max_queue_depth(64)
        .build()
        .unwrap();
    assert_eq!(executor.degree(), Degree::Concurrent(3));
    assert_eq!(executor.stats().worker_count, 3);

    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    executor.add_fn(move || {
        c.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    drop(executor);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_builder_custom_failure_handler() {
    let failures = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&failures);
    let executor = ExecutorBuilder::new("failing")
        .degree(1)
        .on_failure(Arc::new(move |_: &TaskFailure| {
            sink.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .unwrap();

    executor.add_fn(|| panic!("builder boom")).unwrap();
    executor.wait_idle();
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[test]
fn test_build_serial_ignores_degree() {
    let backend = Arc::new(ExecutorBuilder::new("backend").degree(4).build().unwrap());
    let serial = ExecutorBuilder::new("lane")
        .degree(8)
        .build_serial(AbstractExecutorRef::new(&backend))
        .unwrap();
    serial.add_fn(|| {}).unwrap();
    serial.wait_idle();
}

#[test]
fn test_build_executors_from_config() {
    let cfg = ExecutorsConfig::from_json_str(
        r#"{ "executors": { "a": { "degree": 2 }, "b": { "degree": 0 } } }"#,
    )
    .unwrap();
    let executors = build_executors(&cfg).unwrap();
    assert_eq!(executors.len(), 2);
    assert_eq!(executors["a"].degree(), Degree::Concurrent(2));
    assert_eq!(executors["b"].degree(), Degree::Shared);
}

#[test]
fn test_load_config_missing_file_has_context() {
    let err = load_config("/nonexistent/executors.json").unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/executors.json"));
}

#[test]
fn test_load_config_from_file() {
    let path = std::env::temp_dir().join(format!("executors-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "executors": { "io": { "degree": 2 } } }"#).unwrap();
    let cfg = load_config(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(cfg.executors.contains_key("io"));
}
