//! Deadline arithmetic shared by the timed `add_*` operations.

use std::time::{Duration, Instant, SystemTime};

use crate::core::ExecutorError;

/// Deadline `delay` from now, computed once at call time.
///
/// # Errors
///
/// `ExecutorError::DeadlineOverflow` if the instant is not representable.
pub fn deadline_after(delay: Duration) -> Result<Instant, ExecutorError> {
    Instant::now()
        .checked_add(delay)
        .ok_or(ExecutorError::DeadlineOverflow)
}

/// Convert a wall-clock deadline into a monotonic one. Times in the past
/// clamp to now.
///
/// # Errors
///
/// `ExecutorError::DeadlineOverflow` if the instant is not representable.
pub fn deadline_from_system_time(at: SystemTime) -> Result<Instant, ExecutorError> {
    match at.duration_since(SystemTime::now()) {
        Ok(remaining) => deadline_after(remaining),
        Err(_) => Ok(Instant::now()),
    }
}

/// Time left until `deadline`, zero once it has passed.
#[must_use]
pub fn remaining_until(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Milliseconds as `u64`, saturating.
#[must_use]
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
