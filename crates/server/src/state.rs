use orchestrator::{PlanRunner, Synthesizer, WorkerRegistry};
use std::sync::Arc;
use store::StateStore;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub store: StateStore,
    pub registry: Arc<WorkerRegistry>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

impl AppState {
    pub fn new(
        store: StateStore,
        registry: Arc<WorkerRegistry>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            store,
            registry,
            synthesizer,
        }
    }

    pub fn runner(&self) -> PlanRunner {
        PlanRunner::new(
            self.store.clone(),
            self.registry.clone(),
            self.synthesizer.clone(),
        )
    }

    /// Kicks off one pass over the plan's pending tasks in the background.
    /// Handlers reply immediately; progress lands in the event log.
    pub fn spawn_pass(&self, plan_id: Uuid) {
        let runner = self.runner();
        tokio::spawn(async move {
            match runner.run_pass(plan_id).await {
                Ok(summary) => {
                    tracing::info!(
                        plan_id = %plan_id,
                        executed = summary.executed,
                        completed = summary.completed,
                        failed = summary.failed,
                        plan_status = summary.plan_status.as_str(),
                        "Plan pass finished"
                    );
                }
                Err(e) => {
                    tracing::error!(plan_id = %plan_id, error = %e, "Plan pass failed");
                }
            }
        });
    }
}
