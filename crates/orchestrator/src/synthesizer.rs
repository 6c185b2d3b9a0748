use async_trait::async_trait;
use board_core::{Plan, SynthesisReport, WorkerResult, WorkerRole};
use thiserror::Error;
use uuid::Uuid;

/// One completed task's output, handed to the synthesizer.
#[derive(Debug, Clone)]
pub struct TaskOutput {
    pub task_id: Uuid,
    pub role: WorkerRole,
    pub description: String,
    pub result: WorkerResult,
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Synthesis generation failed: {0}")]
    Generation(String),

    #[error("Synthesis output unparseable: {0}")]
    Parse(String),
}

/// Consumes all completed task outputs for a plan and produces one final
/// report. Pure function of its inputs; any model calls are its own
/// concern.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        plan: &Plan,
        outputs: &[TaskOutput],
    ) -> std::result::Result<SynthesisReport, SynthesisError>;
}
