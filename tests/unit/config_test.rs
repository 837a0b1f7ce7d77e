//! Tests for configuration validation

use prometheus_executors::config::{Degree, ExecutorConfig, ExecutorsConfig, FailurePolicy};
use std::time::Duration;

#[test]
fn test_default_config_is_valid_and_shared() {
    let cfg = ExecutorConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.degree(), Degree::Shared);
    assert_eq!(cfg.on_failure, FailurePolicy::Log);
    assert_eq!(cfg.stall_warning(), Duration::from_secs(10));
}

#[test]
fn test_degree_mapping() {
    assert_eq!(Degree::from_count(0), Degree::Shared);
    assert_eq!(Degree::from_count(1), Degree::Serial);
    assert_eq!(Degree::from_count(6), Degree::Concurrent(6));
    assert_eq!(Degree::Shared.worker_count(), None);
    assert_eq!(Degree::Concurrent(6).worker_count(), Some(6));
}

#[test]
fn test_queue_depth_needs_dedicated_pool() {
    let cfg = ExecutorConfig::new().with_max_queue_depth(8);
    assert!(cfg.validate().is_err());
    assert!(cfg.with_degree(2).validate().is_ok());
}

#[test]
fn test_zero_values_rejected() {
    assert!(ExecutorConfig::new().with_degree(1).with_max_queue_depth(0).validate().is_err());
    assert!(ExecutorConfig::new().with_thread_stack_size(0).validate().is_err());
    assert!(ExecutorConfig::new().with_thread_name("  ").validate().is_err());
    assert!(ExecutorConfig::new().with_stall_warning(Duration::ZERO).validate().is_err());
}

#[test]
fn test_executors_config_from_json() {
    let json = r#"{
        "executors": {
            "io": { "degree": 4, "max_queue_depth": 128 },
            "ordered": { "degree": 1, "thread_name": "ordered", "on_failure": "abort" }
        }
    }"#;
    let cfg = ExecutorsConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.executors["io"].degree(), Degree::Concurrent(4));
    assert_eq!(cfg.executors["io"].max_queue_depth, Some(128));
    assert_eq!(cfg.executors["io"].thread_name, "executor");
    assert_eq!(cfg.executors["ordered"].on_failure, FailurePolicy::Abort);
}

#[test]
fn test_executors_config_names_invalid_entry() {
    let json = r#"{ "executors": { "bad": { "max_queue_depth": 4 } } }"#;
    let err = ExecutorsConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("bad"));
}

#[test]
fn test_empty_executors_config_rejected() {
    assert!(ExecutorsConfig::from_json_str(r#"{ "executors": {} }"#).is_err());
}
