//! Builders to construct executors from configuration.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::config::{ExecutorConfig, ExecutorsConfig, FailurePolicy};
use crate::core::{
    AbstractExecutorRef, AppResult, ConcurrentExecutor, ExecutorError, FailureHandler,
    SerialExecutor,
};

/// Fluent construction of a [`ConcurrentExecutor`] or [`SerialExecutor`].
///
/// ```rust,ignore
/// let executor = ExecutorBuilder::new("ingest").degree(4).max_queue_depth(256).build()?;
/// ```
#[derive(Clone)]
pub struct ExecutorBuilder {
    name: String,
    config: ExecutorConfig,
    on_failure: Option<FailureHandler>,
}

impl ExecutorBuilder {
    /// Start from defaults; `name` becomes the worker thread name prefix.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let config = ExecutorConfig::new().with_thread_name(name.clone());
        Self {
            name,
            config,
            on_failure: None,
        }
    }

    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(name: impl Into<String>, config: ExecutorConfig) -> Self {
        Self {
            name: name.into(),
            config,
            on_failure: None,
        }
    }

    /// Builder name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration assembled so far.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Worker count.
    #[must_use]
    pub fn degree(mut self, degree: usize) -> Self {
        self.config = self.config.with_degree(degree);
        self
    }

    /// Bound the queue.
    #[must_use]
    pub fn max_queue_depth(mut self, depth: usize) -> Self {
        self.config = self.config.with_max_queue_depth(depth);
        self
    }

    /// Worker thread name prefix.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.with_thread_name(name);
        self
    }

    /// Failure policy; ignored once [`ExecutorBuilder::on_failure`] is set.
    #[must_use]
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config = self.config.with_failure_policy(policy);
        self
    }

    /// Custom failure handler.
    #[must_use]
    pub fn on_failure(mut self, handler: FailureHandler) -> Self {
        self.on_failure = Some(handler);
        self
    }

    fn handler(&self) -> FailureHandler {
        self.on_failure
            .clone()
            .unwrap_or_else(|| self.config.on_failure.handler())
    }

    /// Build a concurrent executor.
    ///
    /// # Errors
    ///
    /// Invalid configuration or thread spawn failure.
    pub fn build(self) -> Result<ConcurrentExecutor, ExecutorError> {
        let handler = self.handler();
        ConcurrentExecutor::with_failure_handler(self.config, handler)
    }

    /// Build a serial executor over `backend`. The configured degree is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Invalid configuration or thread spawn failure.
    pub fn build_serial(self, backend: AbstractExecutorRef) -> Result<SerialExecutor, ExecutorError> {
        let handler = self.handler();
        SerialExecutor::with_failure_handler(backend, self.config, handler)
    }
}

/// Build one executor per configured entry.
///
/// # Errors
///
/// `ExecutorError::InvalidConfig` if the configuration is invalid, or the
/// first construction failure.
pub fn build_executors(
    cfg: &ExecutorsConfig,
) -> Result<HashMap<String, ConcurrentExecutor>, ExecutorError> {
    cfg.validate()
        .map_err(|e| ExecutorError::InvalidConfig(format!("config invalid: {e}")))?;

    let mut executors = HashMap::new();
    for (name, executor_cfg) in &cfg.executors {
        let executor = ExecutorBuilder::from_config(name.clone(), executor_cfg.clone()).build()?;
        executors.insert(name.clone(), executor);
    }
    info!(count = executors.len(), "executors built from configuration");
    Ok(executors)
}

/// Read and validate an [`ExecutorsConfig`] from a JSON file.
///
/// # Errors
///
/// I/O, parse, or validation failure, with the path attached.
pub fn load_config(path: impl AsRef<Path>) -> AppResult<ExecutorsConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading executor config {}", path.display()))?;
    ExecutorsConfig::from_json_str(&raw)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("invalid executor config {}", path.display()))
}
