//! Tests for error types

use prometheus_executors::core::{ExecutorError, TaskFailure};
use std::error::Error as _;

#[test]
fn test_queue_full_error() {
    let err = ExecutorError::QueueFull { capacity: 16 };
    assert_eq!(format!("{err}"), "task queue is full (capacity 16)");
}

#[test]
fn test_detached_is_not_exhaustion() {
    assert!(!ExecutorError::Detached.is_resource_exhaustion());
    assert!(!ExecutorError::TimersUnsupported.is_resource_exhaustion());
}

#[test]
fn test_dropped_failure_message() {
    assert_eq!(TaskFailure::Dropped.to_string(), "task was dropped before it ran");
}

#[test]
fn test_rejected_failure_chains_source() {
    let failure = TaskFailure::Rejected(ExecutorError::ShutDown);
    assert!(failure.to_string().starts_with("backend rejected task: "));
    assert!(failure.source().is_some());
}
