//! Adapters that run tasks on an async runtime.

#[cfg(feature = "tokio-runtime")]
pub mod tokio_executor;

#[cfg(feature = "tokio-runtime")]
pub use tokio_executor::TokioExecutor;
