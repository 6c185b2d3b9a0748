use async_trait::async_trait;
use board_core::WorkerResult;
use thiserror::Error;

/// Failures a worker may raise during execution. The runner converts
/// these into a failed task state; they never abort a pass.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker execution failed: {0}")]
    Execution(String),

    #[error("Worker backend unavailable: {0}")]
    Unavailable(String),
}

/// The capability that performs the actual analysis for one role.
///
/// Implementations must be reentrant and safe to call repeatedly with the
/// same description; failures are raised as errors, never returned as
/// silent empty results.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn execute(&self, description: &str) -> std::result::Result<WorkerResult, WorkerError>;
}
