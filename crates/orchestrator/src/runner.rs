use board_core::{Plan, PlanStatus, Task, TaskState, WorkerResult};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use store::StateStore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};
use crate::registry::WorkerRegistry;
use crate::synthesizer::{Synthesizer, TaskOutput};

/// Outcome of one pass over a plan's pending tasks.
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub plan_id: Uuid,
    pub executed: usize,
    pub completed: usize,
    pub failed: usize,
    pub plan_status: PlanStatus,
}

/// Executes a plan's outstanding work: one sequential pass over all
/// currently-pending tasks, then the plan-level aggregate and, when every
/// task has completed, synthesis of the final result.
///
/// The runner holds no state of its own; all durable effects go through
/// the store, whose terminal-state guard arbitrates races with concurrent
/// cancel calls.
pub struct PlanRunner {
    store: StateStore,
    registry: Arc<WorkerRegistry>,
    synthesizer: Arc<dyn Synthesizer>,
}

impl PlanRunner {
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

    pub async fn run_pass(&self, plan_id: Uuid) -> Result<PassSummary> {
        let plan = self
            .store
            .get_plan(plan_id)
            .await?
            .ok_or(OrchestratorError::PlanNotFound(plan_id))?;

        if plan.status.is_terminal() {
            info!(plan_id = %plan_id, status = plan.status.as_str(), "Plan is terminal, nothing to run");
            return Ok(self.noop_summary(plan_id, plan.status));
        }

        // Fresh read at pass start; tasks added or retried later belong to
        // the next pass.
        let pending = self.store.list_pending_tasks(plan_id).await?;
        if pending.is_empty() {
            debug!(plan_id = %plan_id, "No pending tasks");
            return Ok(self.noop_summary(plan_id, plan.status));
        }

        info!(plan_id = %plan_id, pending = pending.len(), "Starting pass");

        let mut pass_outputs: HashMap<Uuid, WorkerResult> = HashMap::new();
        let mut completed = 0usize;
        let mut failed = 0usize;

        for task in &pending {
            match self.run_task(task, &mut pass_outputs).await? {
                TaskState::Completed => completed += 1,
                TaskState::Failed => failed += 1,
                other => {
                    debug!(task_id = %task.id, state = other.as_str(), "Task left pass in non-final state");
                }
            }
        }

        let plan_status = self.settle_plan(plan_id, &pass_outputs).await?;

        info!(
            plan_id = %plan_id,
            executed = pending.len(),
            completed,
            failed,
            plan_status = plan_status.as_str(),
            "Pass finished"
        );

        Ok(PassSummary {
            plan_id,
            executed: pending.len(),
            completed,
            failed,
            plan_status,
        })
    }

    /// Drive one task to a final state for this pass and report the state
    /// the store actually landed on. Worker and dispatch failures become
    /// failed tasks; only storage faults propagate.
    async fn run_task(
        &self,
        task: &Task,
        pass_outputs: &mut HashMap<Uuid, WorkerResult>,
    ) -> Result<TaskState> {
        let Some(worker) = self.registry.resolve(task.role) else {
            // configuration error, not a retryable worker failure
            warn!(task_id = %task.id, role = %task.role, "No worker registered for role");
            let after = self
                .store
                .set_task_state(
                    task.id,
                    TaskState::Failed,
                    Some(&format!("no worker registered for role {}", task.role)),
                )
                .await?;
            return Ok(after.state);
        };

        self.store
            .set_task_state(task.id, TaskState::InProgress, None)
            .await?;

        debug!(task_id = %task.id, role = %task.role, attempt = task.attempts, "Executing task");

        match worker.execute(&task.description).await {
            Ok(result) => {
                // The task may have been cancelled while the worker ran;
                // the store's terminal guard turns this write into a no-op
                // and the snapshot tells us which way the race went.
                let after = self
                    .store
                    .set_task_state(task.id, TaskState::Completed, None)
                    .await?;

                if after.state == TaskState::Completed {
                    self.store
                        .log_event(
                            task.plan_id,
                            Some(task.id),
                            "task_completed",
                            json!({
                                "role": task.role.as_str(),
                                "confidence": result.confidence,
                                "content": result.content,
                                "citations": result.citations,
                                "attempt": after.attempts,
                            }),
                        )
                        .await?;
                    pass_outputs.insert(task.id, result);
                } else {
                    info!(
                        task_id = %task.id,
                        state = after.state.as_str(),
                        "Worker result discarded, task no longer in progress"
                    );
                }
                Ok(after.state)
            }
            Err(e) => {
                warn!(task_id = %task.id, role = %task.role, error = %e, "Worker failed");
                let after = self
                    .store
                    .set_task_state(task.id, TaskState::Failed, Some(&e.to_string()))
                    .await?;
                Ok(after.state)
            }
        }
    }

    /// Compute the plan aggregate over all of its tasks and persist the
    /// resulting status. All-completed plans go through synthesis.
    async fn settle_plan(
        &self,
        plan_id: Uuid,
        pass_outputs: &HashMap<Uuid, WorkerResult>,
    ) -> Result<PlanStatus> {
        // Re-read: the plan may have been cancelled while workers ran.
        let plan = self
            .store
            .get_plan(plan_id)
            .await?
            .ok_or(OrchestratorError::PlanNotFound(plan_id))?;
        if plan.status.is_terminal() {
            return Ok(plan.status);
        }

        let tasks = self.store.list_tasks(plan_id).await?;
        let failed = tasks
            .iter()
            .filter(|t| matches!(t.state, TaskState::Failed | TaskState::Escalated))
            .count();
        let unfinished = tasks
            .iter()
            .filter(|t| matches!(t.state, TaskState::Pending | TaskState::InProgress))
            .count();
        let completed: Vec<&Task> = tasks
            .iter()
            .filter(|t| t.state == TaskState::Completed)
            .collect();

        if unfinished > 0 {
            // work scheduled after this pass's read; leave the plan as-is
            debug!(plan_id = %plan_id, unfinished, "Plan still has unfinished tasks after pass");
            return Ok(plan.status);
        }

        if failed == 0 && !completed.is_empty() {
            self.finalize_plan(&plan, &completed, pass_outputs).await
        } else if completed.is_empty() {
            let plan = self.store.close_plan(plan_id, PlanStatus::Failed).await?;
            Ok(plan.status)
        } else {
            // recoverable: failed tasks can be retried, so the plan stays open
            let plan = self
                .store
                .close_plan(plan_id, PlanStatus::PartiallyCompleted)
                .await?;
            Ok(plan.status)
        }
    }

    async fn finalize_plan(
        &self,
        plan: &Plan,
        completed: &[&Task],
        pass_outputs: &HashMap<Uuid, WorkerResult>,
    ) -> Result<PlanStatus> {
        let mut outputs = Vec::with_capacity(completed.len());
        for task in completed {
            let result = match pass_outputs.get(&task.id) {
                Some(result) => result.clone(),
                // completed in an earlier pass: recover from the event log
                None => self.recover_output(task).await?,
            };
            outputs.push(TaskOutput {
                task_id: task.id,
                role: task.role,
                description: task.description.clone(),
                result,
            });
        }

        match self.synthesizer.synthesize(plan, &outputs).await {
            Ok(report) => {
                let content = serde_json::to_value(&report)?;
                self.store.save_final_result(plan.id, content).await?;
                let plan = self.store.close_plan(plan.id, PlanStatus::Closed).await?;
                info!(plan_id = %plan.id, "Plan synthesized and closed");
                Ok(plan.status)
            }
            Err(e) => {
                // completed task work is kept; an operator can re-run
                warn!(plan_id = %plan.id, error = %e, "Synthesis failed");
                self.store
                    .log_event(
                        plan.id,
                        None,
                        "synthesis_failed",
                        json!({ "error": e.to_string() }),
                    )
                    .await?;
                let plan = self
                    .store
                    .close_plan(plan.id, PlanStatus::SynthesisFailed)
                    .await?;
                Ok(plan.status)
            }
        }
    }

    /// Rebuild a completed task's output from its `task_completed` event.
    async fn recover_output(&self, task: &Task) -> Result<WorkerResult> {
        let events = self
            .store
            .list_events(task.plan_id, Some(task.id), 50)
            .await?;

        let Some(event) = events.into_iter().find(|e| e.kind == "task_completed") else {
            warn!(task_id = %task.id, "Completed task has no task_completed event");
            return Ok(WorkerResult::new("", 0.0));
        };

        let content = event.payload["content"].as_str().unwrap_or_default();
        let confidence = event.payload["confidence"].as_f64().unwrap_or(0.0);
        let citations = event.payload["citations"]
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default();

        Ok(WorkerResult::new(content, confidence).with_citations(citations))
    }

    fn noop_summary(&self, plan_id: Uuid, plan_status: PlanStatus) -> PassSummary {
        PassSummary {
            plan_id,
            executed: 0,
            completed: 0,
            failed: 0,
            plan_status,
        }
    }
}
