use async_trait::async_trait;
use board_core::{WorkerResult, WorkerRole};
use orchestrator::{Worker, WorkerError};
use tracing::info;

use crate::ollama::OllamaClient;
use crate::prompts;

// The model gives no usable self-assessment, so specialist outputs carry
// a fixed confidence.
const DEFAULT_CONFIDENCE: f64 = 0.8;

/// An LLM-backed specialist for one executive role.
pub struct SpecialistWorker {
    role: WorkerRole,
    client: OllamaClient,
}

impl SpecialistWorker {
    pub fn new(role: WorkerRole, client: OllamaClient) -> Self {
        Self { role, client }
    }
}

#[async_trait]
impl Worker for SpecialistWorker {
    async fn execute(&self, description: &str) -> Result<WorkerResult, WorkerError> {
        info!(role = %self.role, "Specialist executing task");

        let prompt = prompts::specialist_prompt(self.role, description);
        let content = self
            .client
            .generate(&prompt)
            .await
            .map_err(|e| WorkerError::Unavailable(e.to_string()))?;

        if content.trim().is_empty() {
            return Err(WorkerError::Execution(format!(
                "{} specialist returned an empty analysis",
                self.role
            )));
        }

        Ok(WorkerResult::new(content, DEFAULT_CONFIDENCE))
    }
}
