//! Tests for utility functions

use prometheus_executors::core::ExecutorError;
use prometheus_executors::util::{deadline_after, deadline_from_system_time, duration_ms, remaining_until};
use std::time::{Duration, Instant, SystemTime};

#[test]
fn test_deadline_after_is_in_future() {
    let before = Instant::now();
    let deadline = deadline_after(Duration::from_millis(500)).unwrap();
    assert!(deadline >= before + Duration::from_millis(500));
}

#[test]
fn test_deadline_after_overflow() {
    assert!(matches!(
        deadline_after(Duration::MAX),
        Err(ExecutorError::DeadlineOverflow)
    ));
}

#[test]
fn test_wall_clock_in_past_clamps_to_now() {
    let before = Instant::now();
    let deadline = deadline_from_system_time(SystemTime::now() - Duration::from_secs(3600)).unwrap();
    assert!(deadline >= before);
    assert_eq!(remaining_until(deadline), Duration::ZERO);
}

#[test]
fn test_wall_clock_in_future() {
    let deadline = deadline_from_system_time(SystemTime::now() + Duration::from_secs(60)).unwrap();
    assert!(remaining_until(deadline) > Duration::from_secs(55));
}

#[test]
fn test_duration_ms() {
    assert_eq!(duration_ms(Duration::from_millis(1500)), 1500);
    assert_eq!(duration_ms(Duration::MAX), u64::MAX);
}
