//! # Prometheus Executors
//!
//! Interchangeable executors behind one small interface.
//!
//! A [`Task`](core::Task) is a boxed `FnOnce` with no result. Anything that
//! implements [`Executor`](core::Executor) accepts tasks to run now or at a
//! deadline. Callers that must not care which executor they got hold an
//! [`AbstractExecutor`](core::AbstractExecutor) (owning) or an
//! [`AbstractExecutorRef`](core::AbstractExecutorRef) (non-owning).
//!
//! ## Executors
//!
//! - [`ConcurrentExecutor`](core::ConcurrentExecutor): degree 0 shares a
//!   process-wide pool, degree 1 is a serial lane, degree N owns N workers.
//!   Dropping it waits for every accepted task, timers included.
//! - [`SerialExecutor`](core::SerialExecutor): runs tasks one at a time, in
//!   submission order, on another executor's threads.
//! - [`SystemExecutor`](core::SystemExecutor): process-wide default, never
//!   torn down.
//! - [`ThreadPerTaskExecutor`](core::ThreadPerTaskExecutor): one OS thread
//!   per task, no timers.
//! - `TokioExecutor` (feature `tokio-runtime`): a tokio runtime's blocking
//!   pool.
//!
//! ```rust,ignore
//! use prometheus_executors::core::{AbstractExecutorRef, ConcurrentExecutor, ExecutorExt, SerialExecutor};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let pool = Arc::new(ConcurrentExecutor::with_degree(8)?);
//! let serial = SerialExecutor::new(AbstractExecutorRef::new(&pool))?;
//!
//! serial.add_fn(|| println!("first"))?;
//! serial.add_fn_after(Duration::from_millis(50), || println!("later"))?;
//! pool.add_fn(|| println!("unordered"))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Tasks, the executor interface, and the executor implementations.
pub mod core;
/// Configuration models for executors.
pub mod config;
/// Builders to construct executors from configuration.
pub mod builders;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::core::{
    AbstractExecutor, AbstractExecutorRef, ConcurrentExecutor, Executor, ExecutorError,
    ExecutorExt, SerialExecutor, SystemExecutor, Task, TaskFailure, ThreadPerTaskExecutor,
};
