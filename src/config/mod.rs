//! Configuration models for executors and the shared pool.

pub mod executor;

pub use executor::{shared_pool_threads, Degree, ExecutorConfig, ExecutorsConfig, FailurePolicy};
