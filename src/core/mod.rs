//! Tasks, the executor interface, and the executor implementations.

pub mod error;
pub mod task;
pub mod executor;
pub mod abstract_executor;
mod worker_pool;
pub mod concurrent;
pub mod serial;
pub mod system;
pub mod thread_per_task;

pub use error::{AppResult, ExecutorError, TaskFailure};
pub use task::{abort_on_failure, log_failures, FailureHandler, Task};
pub use executor::{Executor, ExecutorExt};
pub use abstract_executor::{AbstractExecutor, AbstractExecutorRef};
pub use worker_pool::ExecutorStats;
pub use concurrent::ConcurrentExecutor;
pub use serial::SerialExecutor;
pub use system::SystemExecutor;
pub use thread_per_task::ThreadPerTaskExecutor;
