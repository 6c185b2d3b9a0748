use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use board_core::{Event, FinalResult, Plan, Task, WorkerRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub goal: String,
}

#[derive(Debug, Serialize)]
pub struct CreatePlanResponse {
    pub plan_id: Uuid,
}

fn task_description(role: WorkerRole, goal: &str) -> String {
    let angle = match role {
        WorkerRole::Cfo => "financial viability, costs, and funding",
        WorkerRole::Cto => "technical feasibility, architecture, and engineering risk",
        WorkerRole::Cmo => "market positioning, audience, and go-to-market strategy",
        WorkerRole::Coo => "operations, staffing, and execution logistics",
    };
    format!(
        "Analyze the following goal with a focus on {}: {}",
        angle, goal
    )
}

/// Creates a plan with one task per board member and starts the first
/// pass in the background. Replies 202 before any worker has run.
pub async fn create_plan(
    State(state): State<AppState>,
    Json(payload): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<CreatePlanResponse>), AppError> {
    if payload.goal.trim().is_empty() {
        return Err(AppError::BadRequest("Goal cannot be empty".to_string()));
    }

    let plan = state.store.create_plan(payload.goal.trim()).await?;

    for role in WorkerRole::ALL {
        state
            .store
            .add_task(plan.id, role, &task_description(role, &plan.original_goal))
            .await?;
    }

    tracing::info!(plan_id = %plan.id, "Plan accepted");
    state.spawn_pass(plan.id);

    Ok((
        StatusCode::ACCEPTED,
        Json(CreatePlanResponse { plan_id: plan.id }),
    ))
}

#[derive(Debug, Serialize)]
pub struct PlanDetailResponse {
    pub plan: Plan,
    pub tasks: Vec<Task>,
    /// Present once synthesis has produced a result for the plan.
    pub final_result: Option<FinalResult>,
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanDetailResponse>, AppError> {
    let plan = state
        .store
        .get_plan(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plan not found: {}", id)))?;
    let tasks = state.store.list_tasks(id).await?;
    let final_result = state.store.get_final_result(id).await?;

    Ok(Json(PlanDetailResponse {
        plan,
        tasks,
        final_result,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub task_id: Option<Uuid>,
    pub limit: Option<i64>,
}

pub async fn list_plan_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<Event>>, AppError> {
    state
        .store
        .get_plan(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plan not found: {}", id)))?;

    let limit = query.limit.unwrap_or(200).clamp(1, 1000);
    let events = state.store.list_events(id, query.task_id, limit).await?;

    Ok(Json(events))
}

pub async fn cancel_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Plan>, AppError> {
    let plan = state.store.cancel_plan(id).await?;
    tracing::info!(plan_id = %id, "Plan cancelled");
    Ok(Json(plan))
}
