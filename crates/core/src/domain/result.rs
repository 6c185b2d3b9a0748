use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structured output of one worker execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    pub content: String,
    /// Clamped to [0, 1] at construction.
    pub confidence: f64,
    pub citations: Vec<String>,
}

impl WorkerResult {
    pub fn new(content: impl Into<String>, confidence: f64) -> Self {
        Self {
            content: content.into(),
            confidence: confidence.clamp(0.0, 1.0),
            citations: Vec::new(),
        }
    }

    pub fn with_citations(mut self, citations: Vec<String>) -> Self {
        self.citations = citations;
        self
    }
}

/// The synthesized strategic output produced from all completed task
/// outputs of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub synthesized_strategy: String,
    #[serde(default)]
    pub contributing_agents: Vec<String>,
    #[serde(default)]
    pub identified_risks: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub confidence_score: f64,
}

/// One persisted synthesis result per plan, replaced only if synthesis is
/// explicitly re-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResult {
    pub plan_id: Uuid,
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
