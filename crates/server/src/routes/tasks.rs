use axum::extract::{Path, State};
use axum::Json;
use board_core::Task;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Resets a failed, escalated, or cancelled task to pending and schedules
/// another pass over its plan.
pub async fn retry_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    let task = state.store.mark_retry(id).await?;
    tracing::info!(task_id = %id, plan_id = %task.plan_id, attempts = task.attempts, "Task queued for retry");
    state.spawn_pass(task.plan_id);
    Ok(Json(task))
}

pub async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    let task = state.store.cancel_task(id).await?;
    tracing::info!(task_id = %id, "Task cancelled");
    Ok(Json(task))
}
