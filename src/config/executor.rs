//! Executor configuration structures.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{abort_on_failure, log_failures, FailureHandler};

/// Environment variable overriding the shared pool size.
pub const SHARED_THREADS_ENV: &str = "PROMETHEUS_EXECUTOR_SHARED_THREADS";

/// Concurrency degree of a `ConcurrentExecutor`, derived from its worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degree {
    /// Tasks run on the process-wide shared pool; no ordering guarantee.
    Shared,
    /// One dedicated worker; FIFO and mutually exclusive.
    Serial,
    /// N dedicated workers; no ordering guarantee.
    Concurrent(usize),
}

impl Degree {
    /// Map a configured worker count (0 = shared) to a degree.
    #[must_use]
    pub const fn from_count(count: usize) -> Self {
        match count {
            0 => Self::Shared,
            1 => Self::Serial,
            n => Self::Concurrent(n),
        }
    }

    /// Dedicated worker threads, `None` for the shared pool.
    #[must_use]
    pub const fn worker_count(self) -> Option<usize> {
        match self {
            Self::Shared => None,
            Self::Serial => Some(1),
            Self::Concurrent(n) => Some(n),
        }
    }
}

/// What an executor does with a task that panicked or was lost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report through `tracing` at error level and keep running.
    #[default]
    Log,
    /// Report, then abort the process.
    Abort,
}

impl FailurePolicy {
    /// Handler implementing this policy.
    #[must_use]
    pub fn handler(self) -> FailureHandler {
        match self {
            Self::Log => log_failures(),
            Self::Abort => abort_on_failure(),
        }
    }
}

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Worker count: 0 = shared pool, 1 = serial lane, >1 = dedicated pool.
    pub degree: usize,
    /// Bound on queued tasks; `None` for unbounded. Dedicated pools only.
    pub max_queue_depth: Option<usize>,
    /// Prefix for worker thread names.
    pub thread_name: String,
    /// Stack size for worker threads; platform default when `None`.
    pub thread_stack_size: Option<usize>,
    /// How long a serial lane waits on its backend before logging a stall.
    pub stall_warning_ms: u64,
    /// Failure handling for tasks run by this executor.
    pub on_failure: FailurePolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            degree: 0,
            max_queue_depth: None,
            thread_name: "executor".to_string(),
            thread_stack_size: None,
            stall_warning_ms: 10_000,
            on_failure: FailurePolicy::Log,
        }
    }
}

impl ExecutorConfig {
    /// Default configuration: shared pool, unbounded, log failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    /// Bound the task queue.
    #[must_use]
    pub const fn with_max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = Some(depth);
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the worker stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Set the serial-lane stall warning interval.
    #[must_use]
    pub fn with_stall_warning(mut self, interval: Duration) -> Self {
        self.stall_warning_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the failure policy.
    #[must_use]
    pub const fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Concurrency degree.
    #[must_use]
    pub const fn degree(&self) -> Degree {
        Degree::from_count(self.degree)
    }

    /// Stall warning interval.
    #[must_use]
    pub const fn stall_warning(&self) -> Duration {
        Duration::from_millis(self.stall_warning_ms)
    }

    /// Validate executor configuration values.
    ///
    /// # Errors
    ///
    /// A description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_name.trim().is_empty() {
            return Err("thread_name must not be empty".into());
        }
        if self.max_queue_depth == Some(0) {
            return Err("max_queue_depth must be greater than 0".into());
        }
        if self.max_queue_depth.is_some() && self.degree == 0 {
            return Err("max_queue_depth requires a dedicated pool (degree >= 1)".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        if self.stall_warning_ms == 0 {
            return Err("stall_warning_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Build configuration from `PROMETHEUS_EXECUTOR_*` environment
    /// variables, loading a `.env` file first if present. Unset variables
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// A description of the first unparsable or invalid value.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();

        if let Some(degree) = env_parse::<usize>("PROMETHEUS_EXECUTOR_DEGREE")? {
            cfg.degree = degree;
        }
        if let Some(depth) = env_parse::<usize>("PROMETHEUS_EXECUTOR_MAX_QUEUE_DEPTH")? {
            cfg.max_queue_depth = Some(depth);
        }
        if let Ok(name) = env::var("PROMETHEUS_EXECUTOR_THREAD_NAME") {
            cfg.thread_name = name;
        }
        if let Some(bytes) = env_parse::<usize>("PROMETHEUS_EXECUTOR_THREAD_STACK_SIZE")? {
            cfg.thread_stack_size = Some(bytes);
        }
        if let Some(ms) = env_parse::<u64>("PROMETHEUS_EXECUTOR_STALL_WARNING_MS")? {
            cfg.stall_warning_ms = ms;
        }
        if let Ok(policy) = env::var("PROMETHEUS_EXECUTOR_ON_FAILURE") {
            cfg.on_failure = match policy.as_str() {
                "log" => FailurePolicy::Log,
                "abort" => FailurePolicy::Abort,
                other => return Err(format!("PROMETHEUS_EXECUTOR_ON_FAILURE: unknown policy `{other}`")),
            };
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

/// Root configuration: named executors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutorsConfig {
    /// Map of executor name to configuration.
    pub executors: HashMap<String, ExecutorConfig>,
}

impl ExecutorsConfig {
    /// Validate all executors and ensure at least one exists.
    ///
    /// # Errors
    ///
    /// A description naming the first invalid executor.
    pub fn validate(&self) -> Result<(), String> {
        if self.executors.is_empty() {
            return Err("at least one executor must be defined".into());
        }
        for (name, executor) in &self.executors {
            executor
                .validate()
                .map_err(|e| format!("executor `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Size of the process-wide shared pool: `PROMETHEUS_EXECUTOR_SHARED_THREADS`
/// if set to a positive number, otherwise four threads per CPU with a floor
/// of eight.
#[must_use]
pub fn shared_pool_threads() -> usize {
    let _ = dotenvy::dotenv();
    env::var(SHARED_THREADS_ENV)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| (num_cpus::get() * 4).max(8))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, String> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("{key}: cannot parse `{raw}`")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_from_count() {
        assert_eq!(Degree::from_count(0), Degree::Shared);
        assert_eq!(Degree::from_count(1), Degree::Serial);
        assert_eq!(Degree::from_count(8), Degree::Concurrent(8));
        assert_eq!(Degree::Shared.worker_count(), None);
        assert_eq!(Degree::Concurrent(3).worker_count(), Some(3));
    }

    #[test]
    fn test_builder_methods() {
        let cfg = ExecutorConfig::new()
            .with_degree(4)
            .with_max_queue_depth(16)
            .with_thread_name("io")
            .with_stall_warning(Duration::from_secs(2))
            .with_failure_policy(FailurePolicy::Abort);
        assert_eq!(cfg.degree(), Degree::Concurrent(4));
        assert_eq!(cfg.max_queue_depth, Some(16));
        assert_eq!(cfg.thread_name, "io");
        assert_eq!(cfg.stall_warning(), Duration::from_secs(2));
        assert_eq!(cfg.on_failure, FailurePolicy::Abort);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_queue_depth_requires_dedicated_pool() {
        let cfg = ExecutorConfig::new().with_max_queue_depth(4);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let cfg: ExecutorConfig = serde_json::from_str(r#"{ "degree": 2 }"#).unwrap();
        assert_eq!(cfg.degree, 2);
        assert_eq!(cfg.thread_name, "executor");
        assert_eq!(cfg.stall_warning_ms, 10_000);
        assert_eq!(cfg.on_failure, FailurePolicy::Log);
    }
}
