use async_trait::async_trait;
use board_core::{Plan, SynthesisReport};
use orchestrator::{SynthesisError, Synthesizer, TaskOutput};
use tracing::info;

use crate::ollama::OllamaClient;
use crate::prompts;

/// Borrowed view of one specialist analysis for prompt assembly.
pub(crate) struct SynthesisInput<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// The CEO: folds all specialist analyses into one strategic plan.
pub struct BoardSynthesizer {
    client: OllamaClient,
}

impl BoardSynthesizer {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Synthesizer for BoardSynthesizer {
    async fn synthesize(
        &self,
        plan: &Plan,
        outputs: &[TaskOutput],
    ) -> Result<SynthesisReport, SynthesisError> {
        info!(plan_id = %plan.id, analyses = outputs.len(), "Synthesizing final plan");

        let inputs: Vec<SynthesisInput<'_>> = outputs
            .iter()
            .map(|o| SynthesisInput {
                role: o.role.as_str(),
                content: &o.result.content,
            })
            .collect();

        let prompt = prompts::synthesis_prompt(&plan.original_goal, &inputs);
        let raw = self
            .client
            .generate(&prompt)
            .await
            .map_err(|e| SynthesisError::Generation(e.to_string()))?;

        let mut report: SynthesisReport = serde_json::from_str(extract_json(&raw))
            .map_err(|e| SynthesisError::Parse(format!("{e}; output was: {raw}")))?;

        if report.contributing_agents.is_empty() {
            report.contributing_agents = outputs.iter().map(|o| o.role.to_string()).collect();
        }
        report.confidence_score = report.confidence_score.clamp(0.0, 1.0);

        Ok(report)
    }
}

/// Models wrap JSON in prose or markdown fences more often than not; take
/// the outermost object literal.
fn extract_json(raw: &str) -> &str {
    let start = raw.find('{');
    let end = raw.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}
