//! Error types for executor operations.

use thiserror::Error;

/// Errors returned to the caller of `add`, `add_at`, and `add_after`.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The bounded task queue refused the task.
    #[error("task queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },
    /// The operating system refused to start a thread.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// The executor no longer accepts work.
    #[error("executor has been shut down")]
    ShutDown,
    /// An `AbstractExecutorRef` outlived the executor it points at.
    #[error("referenced executor no longer exists")]
    Detached,
    /// The executor only implements `add`.
    #[error("executor does not support timed tasks")]
    TimersUnsupported,
    /// The requested delay cannot be represented as a deadline.
    #[error("deadline is too far in the future")]
    DeadlineOverflow,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ExecutorError {
    /// True when the backend ran out of capacity (queue slots or threads).
    #[must_use]
    pub const fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::Spawn(_))
    }
}

/// Failures that happen after a task was accepted.
///
/// These never reach the caller of `add`; they are delivered to the
/// executor's [`FailureHandler`](crate::core::FailureHandler).
#[derive(Debug, Error)]
pub enum TaskFailure {
    /// The task body panicked.
    #[error("task panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
    /// The task was destroyed without ever running.
    #[error("task was dropped before it ran")]
    Dropped,
    /// A backend refused a task that was handed to it asynchronously.
    #[error("backend rejected task: {0}")]
    Rejected(#[source] ExecutorError),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_exhaustion_classification() {
        assert!(ExecutorError::QueueFull { capacity: 4 }.is_resource_exhaustion());
        let io = std::io::Error::new(std::io::ErrorKind::WouldBlock, "no threads");
        assert!(ExecutorError::Spawn(io).is_resource_exhaustion());
        assert!(!ExecutorError::ShutDown.is_resource_exhaustion());
        assert!(!ExecutorError::TimersUnsupported.is_resource_exhaustion());
    }

    #[test]
    fn test_rejected_keeps_source() {
        use std::error::Error as _;

        let failure = TaskFailure::Rejected(ExecutorError::Detached);
        assert_eq!(
            failure.to_string(),
            "backend rejected task: referenced executor no longer exists"
        );
        assert!(failure.source().is_some());
    }
}
