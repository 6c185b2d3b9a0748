use board_core::{stable_id, Event, FinalResult, Plan, PlanStatus, Task, TaskState, WorkerRole};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::models::{EventRow, FinalResultRow, PlanRow, TaskRow};

/// Durable repository for plans, tasks, events and final results.
///
/// Every mutating operation runs as a single transaction that pairs the
/// entity write with its event append; either both commit or neither does.
/// The handle is cheap to clone and safe to share across concurrent
/// callers.
#[derive(Clone)]
pub struct StateStore {
    pool: SqlitePool,
}

impl StateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ---- plans ----

    pub async fn create_plan(&self, goal: &str) -> Result<Plan> {
        let plan = Plan::new(goal);
        let row = PlanRow::from(&plan);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO plans (id, original_goal, status, created_at, closed_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.original_goal)
        .bind(&row.status)
        .bind(row.created_at)
        .bind(row.closed_at)
        .execute(&mut *tx)
        .await?;

        let event_id = stable_id(["evt", &row.id, "plan_created"]);
        append_event(
            &mut tx,
            &event_id,
            plan.id,
            None,
            "plan_created",
            &serde_json::json!({ "original_goal": goal }),
        )
        .await?;

        tx.commit().await?;
        Ok(plan)
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> Result<Option<Plan>> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, original_goal, status, created_at, closed_at
            FROM plans
            WHERE id = ?
            "#,
        )
        .bind(plan_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_domain()))
    }

    /// Set the plan's aggregate status. `closed_at` is stamped if and only
    /// if the new status is terminal. A plan already in a terminal status
    /// is left untouched, mirroring the task-level terminal guard.
    pub async fn close_plan(&self, plan_id: Uuid, final_status: PlanStatus) -> Result<Plan> {
        let mut tx = self.pool.begin().await?;

        let mut plan = fetch_plan(&mut tx, plan_id)
            .await?
            .ok_or(StoreError::PlanNotFound(plan_id))?;

        if plan.status.is_terminal() {
            debug!(plan_id = %plan_id, status = plan.status.as_str(), "Plan already terminal, skipping close");
            return Ok(plan);
        }

        plan.status = final_status;
        plan.closed_at = final_status.is_terminal().then(Utc::now);

        sqlx::query("UPDATE plans SET status = ?, closed_at = ? WHERE id = ?")
            .bind(final_status.as_str())
            .bind(plan.closed_at.map(|t| t.timestamp_millis()))
            .bind(plan_id.to_string())
            .execute(&mut *tx)
            .await?;

        let kind = if final_status.is_terminal() {
            "plan_closed"
        } else {
            "plan_status_changed"
        };
        // A plan can legitimately re-enter the same non-terminal status on a
        // later retry pass, so the id carries the task aggregate as well;
        // total attempts grows with every retry and breaks the tie even when
        // the completed/failed counts end up identical.
        let (completed, failed, attempts): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN state = ? THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN state IN (?, ?) THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(attempts), 0)
            FROM tasks
            WHERE plan_id = ?
            "#,
        )
        .bind(TaskState::Completed.as_str())
        .bind(TaskState::Failed.as_str())
        .bind(TaskState::Escalated.as_str())
        .bind(plan_id.to_string())
        .fetch_one(&mut *tx)
        .await?;

        let event_id = stable_id([
            "evt",
            &plan_id.to_string(),
            kind,
            final_status.as_str(),
            &completed.to_string(),
            &failed.to_string(),
            &attempts.to_string(),
        ]);
        append_event(
            &mut tx,
            &event_id,
            plan_id,
            None,
            kind,
            &serde_json::json!({
                "status": final_status.as_str(),
                "completed": completed,
                "failed": failed,
            }),
        )
        .await?;

        tx.commit().await?;
        Ok(plan)
    }

    /// Cancel the plan and cascade to every non-terminal task, each
    /// producing its own event, within one atomic unit.
    pub async fn cancel_plan(&self, plan_id: Uuid) -> Result<Plan> {
        let mut tx = self.pool.begin().await?;

        let mut plan = fetch_plan(&mut tx, plan_id)
            .await?
            .ok_or(StoreError::PlanNotFound(plan_id))?;

        if plan.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                from: plan.status.as_str().to_string(),
                to: PlanStatus::Cancelled.as_str().to_string(),
            });
        }

        let tasks: Vec<TaskRow> = sqlx::query_as(
            r#"
            SELECT id, plan_id, role, description, state, attempts, last_error, created_at, updated_at
            FROM tasks
            WHERE plan_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(plan_id.to_string())
        .fetch_all(&mut *tx)
        .await?;

        let now = Utc::now();
        for task in tasks.into_iter().map(|r| r.into_domain()) {
            if task.state.is_terminal() {
                continue;
            }
            write_task_state(
                &mut tx,
                &task,
                TaskState::Cancelled,
                task.last_error.as_deref(),
                now,
            )
            .await?;
            let event_id = stable_id([
                "evt",
                &plan_id.to_string(),
                &task.id.to_string(),
                "cancel",
                &task.attempts.to_string(),
            ]);
            append_event(
                &mut tx,
                &event_id,
                plan_id,
                Some(task.id),
                "task_cancelled",
                &serde_json::json!({ "cascaded": true }),
            )
            .await?;
        }

        plan.status = PlanStatus::Cancelled;
        plan.closed_at = Some(now);

        sqlx::query("UPDATE plans SET status = ?, closed_at = ? WHERE id = ?")
            .bind(PlanStatus::Cancelled.as_str())
            .bind(now.timestamp_millis())
            .bind(plan_id.to_string())
            .execute(&mut *tx)
            .await?;

        let event_id = stable_id(["evt", &plan_id.to_string(), "plan_cancelled"]);
        append_event(
            &mut tx,
            &event_id,
            plan_id,
            None,
            "plan_cancelled",
            &serde_json::json!({}),
        )
        .await?;

        tx.commit().await?;
        Ok(plan)
    }

    // ---- tasks ----

    pub async fn add_task(
        &self,
        plan_id: Uuid,
        role: WorkerRole,
        description: &str,
    ) -> Result<Task> {
        let mut tx = self.pool.begin().await?;

        let plan = fetch_plan(&mut tx, plan_id)
            .await?
            .ok_or(StoreError::PlanNotFound(plan_id))?;
        if plan.status != PlanStatus::Open {
            // a non-open plan accepts no new work
            return Err(StoreError::PlanNotFound(plan_id));
        }

        let task = Task::new(plan_id, role, description);
        let row = TaskRow::from(&task);

        sqlx::query(
            r#"
            INSERT INTO tasks (id, plan_id, role, description, state, attempts, last_error, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.plan_id)
        .bind(&row.role)
        .bind(&row.description)
        .bind(&row.state)
        .bind(row.attempts)
        .bind(&row.last_error)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await?;

        let event_id = stable_id(["evt", &row.plan_id, &row.id, "task_created"]);
        append_event(
            &mut tx,
            &event_id,
            plan_id,
            Some(task.id),
            "task_created",
            &serde_json::json!({ "role": role.as_str() }),
        )
        .await?;

        tx.commit().await?;
        Ok(task)
    }

    pub async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(
            r#"
            SELECT id, plan_id, role, description, state, attempts, last_error, created_at, updated_at
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(task_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_domain()))
    }

    /// All tasks of a plan in creation order.
    pub async fn list_tasks(&self, plan_id: Uuid) -> Result<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r#"
            SELECT id, plan_id, role, description, state, attempts, last_error, created_at, updated_at
            FROM tasks
            WHERE plan_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(plan_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    pub async fn list_pending_tasks(&self, plan_id: Uuid) -> Result<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r#"
            SELECT id, plan_id, role, description, state, attempts, last_error, created_at, updated_at
            FROM tasks
            WHERE plan_id = ? AND state = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(plan_id.to_string())
        .bind(TaskState::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    /// Apply a response-driven state change.
    ///
    /// Terminal guard: a task already completed or cancelled is returned
    /// unchanged and nothing is written. Duplicate deliveries of the same
    /// transition are also harmless because the event id is derived from
    /// the transition itself.
    pub async fn set_task_state(
        &self,
        task_id: Uuid,
        new_state: TaskState,
        error: Option<&str>,
    ) -> Result<Task> {
        let mut tx = self.pool.begin().await?;

        let mut task = fetch_task(&mut tx, task_id)
            .await?
            .ok_or(StoreError::TaskNotFound(task_id))?;

        if task.state.is_terminal() {
            debug!(
                task_id = %task_id,
                state = task.state.as_str(),
                requested = new_state.as_str(),
                "Task already terminal, ignoring state change"
            );
            return Ok(task);
        }

        let now = Utc::now();
        write_task_state(&mut tx, &task, new_state, error, now).await?;

        let event_id = stable_id([
            "evt",
            &task.plan_id.to_string(),
            &task_id.to_string(),
            "state",
            new_state.as_str(),
            &task.attempts.to_string(),
        ]);
        append_event(
            &mut tx,
            &event_id,
            task.plan_id,
            Some(task_id),
            "task_state_changed",
            &serde_json::json!({ "state": new_state.as_str(), "error": error }),
        )
        .await?;

        tx.commit().await?;

        task.state = new_state;
        task.last_error = error.map(str::to_owned);
        task.updated_at = now;
        Ok(task)
    }

    /// Move a failed, escalated or cancelled task back to pending for
    /// another attempt. Atomically increments `attempts` and clears
    /// `last_error`.
    pub async fn mark_retry(&self, task_id: Uuid) -> Result<Task> {
        let mut tx = self.pool.begin().await?;

        let mut task = fetch_task(&mut tx, task_id)
            .await?
            .ok_or(StoreError::TaskNotFound(task_id))?;

        if !task.state.can_retry() {
            return Err(StoreError::InvalidTransition {
                from: task.state.as_str().to_string(),
                to: TaskState::Pending.as_str().to_string(),
            });
        }

        // A task must not be revived under a terminally-closed plan.
        let plan = fetch_plan(&mut tx, task.plan_id)
            .await?
            .ok_or(StoreError::PlanNotFound(task.plan_id))?;
        if plan.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                from: plan.status.as_str().to_string(),
                to: TaskState::Pending.as_str().to_string(),
            });
        }

        let now = Utc::now();
        let attempts = task.attempts + 1;

        sqlx::query(
            r#"
            UPDATE tasks
            SET state = ?, attempts = ?, last_error = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(TaskState::Pending.as_str())
        .bind(i64::from(attempts))
        .bind(now.timestamp_millis())
        .bind(task_id.to_string())
        .execute(&mut *tx)
        .await?;

        let event_id = stable_id([
            "evt",
            &task.plan_id.to_string(),
            &task_id.to_string(),
            "retry",
            &attempts.to_string(),
        ]);
        append_event(
            &mut tx,
            &event_id,
            task.plan_id,
            Some(task_id),
            "task_retry",
            &serde_json::json!({ "attempts": attempts }),
        )
        .await?;

        tx.commit().await?;

        task.state = TaskState::Pending;
        task.attempts = attempts;
        task.last_error = None;
        task.updated_at = now;
        Ok(task)
    }

    pub async fn cancel_task(&self, task_id: Uuid) -> Result<Task> {
        let mut tx = self.pool.begin().await?;

        let mut task = fetch_task(&mut tx, task_id)
            .await?
            .ok_or(StoreError::TaskNotFound(task_id))?;

        if !task.state.can_cancel() {
            return Err(StoreError::InvalidTransition {
                from: task.state.as_str().to_string(),
                to: TaskState::Cancelled.as_str().to_string(),
            });
        }

        let now = Utc::now();
        // last_error is preserved; only a retry clears it
        write_task_state(
            &mut tx,
            &task,
            TaskState::Cancelled,
            task.last_error.as_deref(),
            now,
        )
        .await?;

        let event_id = stable_id([
            "evt",
            &task.plan_id.to_string(),
            &task_id.to_string(),
            "cancel",
            &task.attempts.to_string(),
        ]);
        append_event(
            &mut tx,
            &event_id,
            task.plan_id,
            Some(task_id),
            "task_cancelled",
            &serde_json::json!({}),
        )
        .await?;

        tx.commit().await?;

        task.state = TaskState::Cancelled;
        task.updated_at = now;
        Ok(task)
    }

    // ---- events ----

    /// Append a free-form event. The id is derived from the plan, task,
    /// kind and payload, so re-logging the same logical event is ignored
    /// and the original record is returned.
    pub async fn log_event(
        &self,
        plan_id: Uuid,
        task_id: Option<Uuid>,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<Event> {
        let task_part = task_id.map(|t| t.to_string()).unwrap_or_default();
        let payload_str = payload.to_string();
        let event_id = stable_id(["evt", &plan_id.to_string(), &task_part, kind, &payload_str]);

        let mut tx = self.pool.begin().await?;
        append_event(&mut tx, &event_id, plan_id, task_id, kind, &payload).await?;

        let row: EventRow = sqlx::query_as(
            r#"
            SELECT id, plan_id, task_id, kind, payload, created_at
            FROM events
            WHERE id = ?
            "#,
        )
        .bind(&event_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into_domain())
    }

    /// Events for a plan, newest first, optionally filtered to one task.
    /// The caller-facing boundary is responsible for clamping `limit`.
    pub async fn list_events(
        &self,
        plan_id: Uuid,
        task_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> = match task_id {
            Some(task_id) => {
                sqlx::query_as(
                    r#"
                    SELECT id, plan_id, task_id, kind, payload, created_at
                    FROM events
                    WHERE plan_id = ? AND task_id = ?
                    ORDER BY created_at DESC, rowid DESC
                    LIMIT ?
                    "#,
                )
                .bind(plan_id.to_string())
                .bind(task_id.to_string())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, plan_id, task_id, kind, payload, created_at
                    FROM events
                    WHERE plan_id = ?
                    ORDER BY created_at DESC, rowid DESC
                    LIMIT ?
                    "#,
                )
                .bind(plan_id.to_string())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    // ---- final results ----

    /// Upsert the plan's synthesis output. Replacing a prior result is a
    /// mutation like any other and lands in the event log; the event id
    /// hashes the content, so re-saving identical content stays silent.
    pub async fn save_final_result(
        &self,
        plan_id: Uuid,
        content: serde_json::Value,
    ) -> Result<FinalResult> {
        let now = Utc::now();
        let content_str = content.to_string();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO final_results (plan_id, content, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(plan_id) DO UPDATE SET
                content = excluded.content,
                created_at = excluded.created_at
            "#,
        )
        .bind(plan_id.to_string())
        .bind(&content_str)
        .bind(now.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        let event_id = stable_id([
            "evt",
            &plan_id.to_string(),
            "final_result_saved",
            &content_str,
        ]);
        append_event(
            &mut tx,
            &event_id,
            plan_id,
            None,
            "final_result_saved",
            &content,
        )
        .await?;

        tx.commit().await?;

        Ok(FinalResult {
            plan_id,
            content,
            created_at: now,
        })
    }

    pub async fn get_final_result(&self, plan_id: Uuid) -> Result<Option<FinalResult>> {
        let row: Option<FinalResultRow> = sqlx::query_as(
            r#"
            SELECT plan_id, content, created_at
            FROM final_results
            WHERE plan_id = ?
            "#,
        )
        .bind(plan_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_domain()))
    }
}

async fn fetch_plan(tx: &mut Transaction<'_, Sqlite>, plan_id: Uuid) -> Result<Option<Plan>> {
    let row: Option<PlanRow> = sqlx::query_as(
        r#"
        SELECT id, original_goal, status, created_at, closed_at
        FROM plans
        WHERE id = ?
        "#,
    )
    .bind(plan_id.to_string())
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(|r| r.into_domain()))
}

async fn fetch_task(tx: &mut Transaction<'_, Sqlite>, task_id: Uuid) -> Result<Option<Task>> {
    let row: Option<TaskRow> = sqlx::query_as(
        r#"
        SELECT id, plan_id, role, description, state, attempts, last_error, created_at, updated_at
        FROM tasks
        WHERE id = ?
        "#,
    )
    .bind(task_id.to_string())
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(|r| r.into_domain()))
}

async fn write_task_state(
    tx: &mut Transaction<'_, Sqlite>,
    task: &Task,
    new_state: TaskState,
    error: Option<&str>,
    now: chrono::DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE tasks SET state = ?, last_error = ?, updated_at = ? WHERE id = ?")
        .bind(new_state.as_str())
        .bind(error)
        .bind(now.timestamp_millis())
        .bind(task.id.to_string())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn append_event(
    tx: &mut Transaction<'_, Sqlite>,
    event_id: &str,
    plan_id: Uuid,
    task_id: Option<Uuid>,
    kind: &str,
    payload: &serde_json::Value,
) -> Result<()> {
    // Same derived id means the same logical event: ignore on conflict.
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO events (id, plan_id, task_id, kind, payload, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event_id)
    .bind(plan_id.to_string())
    .bind(task_id.map(|t| t.to_string()))
    .bind(kind)
    .bind(payload.to_string())
    .bind(Utc::now().timestamp_millis())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use serde_json::json;

    async fn setup_store() -> StateStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        StateStore::new(pool)
    }

    async fn event_kinds(store: &StateStore, plan_id: Uuid) -> Vec<String> {
        store
            .list_events(plan_id, None, 1000)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[tokio::test]
    async fn test_create_plan_writes_created_event() {
        let store = setup_store().await;

        let plan = store.create_plan("Expand into EU market").await.unwrap();
        assert_eq!(plan.status, PlanStatus::Open);

        let found = store.get_plan(plan.id).await.unwrap().unwrap();
        assert_eq!(found.original_goal, "Expand into EU market");

        let events = store.list_events(plan.id, None, 200).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "plan_created");
        assert_eq!(events[0].payload["original_goal"], "Expand into EU market");
    }

    #[tokio::test]
    async fn test_add_task_requires_open_plan() {
        let store = setup_store().await;

        let missing = store
            .add_task(Uuid::new_v4(), WorkerRole::Cfo, "x")
            .await;
        assert!(matches!(missing, Err(StoreError::PlanNotFound(_))));

        let plan = store.create_plan("goal").await.unwrap();
        store.cancel_plan(plan.id).await.unwrap();

        let closed = store.add_task(plan.id, WorkerRole::Cfo, "x").await;
        assert!(matches!(closed, Err(StoreError::PlanNotFound(_))));
    }

    #[tokio::test]
    async fn test_set_task_state_updates_and_logs() {
        let store = setup_store().await;
        let plan = store.create_plan("goal").await.unwrap();
        let task = store
            .add_task(plan.id, WorkerRole::Cto, "evaluate feasibility")
            .await
            .unwrap();

        let updated = store
            .set_task_state(task.id, TaskState::InProgress, None)
            .await
            .unwrap();
        assert_eq!(updated.state, TaskState::InProgress);
        assert!(updated.updated_at >= task.updated_at);

        let failed = store
            .set_task_state(task.id, TaskState::Failed, Some("model unreachable"))
            .await
            .unwrap();
        assert_eq!(failed.state, TaskState::Failed);
        assert_eq!(failed.last_error.as_deref(), Some("model unreachable"));

        let kinds = event_kinds(&store, plan.id).await;
        assert_eq!(
            kinds.iter().filter(|k| *k == "task_state_changed").count(),
            2
        );
    }

    #[tokio::test]
    async fn test_duplicate_transition_is_single_event() {
        let store = setup_store().await;
        let plan = store.create_plan("goal").await.unwrap();
        let task = store
            .add_task(plan.id, WorkerRole::Cmo, "position the brand")
            .await
            .unwrap();

        store
            .set_task_state(task.id, TaskState::InProgress, None)
            .await
            .unwrap();
        store
            .set_task_state(task.id, TaskState::InProgress, None)
            .await
            .unwrap();

        let kinds = event_kinds(&store, plan.id).await;
        assert_eq!(
            kinds.iter().filter(|k| *k == "task_state_changed").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_terminal_task_is_never_overwritten() {
        let store = setup_store().await;
        let plan = store.create_plan("goal").await.unwrap();
        let task = store
            .add_task(plan.id, WorkerRole::Coo, "plan rollout")
            .await
            .unwrap();

        store.cancel_task(task.id).await.unwrap();

        // A completion landing after the cancel must be a no-op, not an
        // error: this is the mid-flight cancellation race.
        let after = store
            .set_task_state(task.id, TaskState::Completed, None)
            .await
            .unwrap();
        assert_eq!(after.state, TaskState::Cancelled);

        let current = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(current.state, TaskState::Cancelled);

        // Completed tasks are protected the same way.
        let task2 = store
            .add_task(plan.id, WorkerRole::Cfo, "budget")
            .await
            .unwrap();
        store
            .set_task_state(task2.id, TaskState::Completed, None)
            .await
            .unwrap();
        let after2 = store
            .set_task_state(task2.id, TaskState::Failed, Some("late failure"))
            .await
            .unwrap();
        assert_eq!(after2.state, TaskState::Completed);
        assert!(after2.last_error.is_none());
    }

    #[tokio::test]
    async fn test_mark_retry_effects_and_guards() {
        let store = setup_store().await;
        let plan = store.create_plan("goal").await.unwrap();
        let task = store
            .add_task(plan.id, WorkerRole::Cfo, "budget")
            .await
            .unwrap();

        for state in [TaskState::Pending, TaskState::InProgress] {
            store.set_task_state(task.id, state, None).await.unwrap();
            let err = store.mark_retry(task.id).await;
            assert!(matches!(err, Err(StoreError::InvalidTransition { .. })));
        }

        store
            .set_task_state(task.id, TaskState::Failed, Some("boom"))
            .await
            .unwrap();

        let retried = store.mark_retry(task.id).await.unwrap();
        assert_eq!(retried.state, TaskState::Pending);
        assert_eq!(retried.attempts, 1);
        assert!(retried.last_error.is_none());

        // attempts grows by exactly one per successful retry
        store
            .set_task_state(task.id, TaskState::Failed, Some("boom again"))
            .await
            .unwrap();
        let retried = store.mark_retry(task.id).await.unwrap();
        assert_eq!(retried.attempts, 2);

        // completed tasks are not retryable
        store
            .set_task_state(task.id, TaskState::Completed, None)
            .await
            .unwrap();
        let err = store.mark_retry(task.id).await;
        assert!(matches!(err, Err(StoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_mark_retry_rejected_on_cancelled_plan() {
        let store = setup_store().await;
        let plan = store.create_plan("goal").await.unwrap();
        let task = store
            .add_task(plan.id, WorkerRole::Cto, "arch review")
            .await
            .unwrap();

        store.cancel_plan(plan.id).await.unwrap();

        // The cascade cancelled the task, which is a retryable state, but
        // the plan is gone for good.
        let err = store.mark_retry(task.id).await;
        assert!(matches!(err, Err(StoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_cancel_task_guards() {
        let store = setup_store().await;
        let plan = store.create_plan("goal").await.unwrap();

        for state in [
            TaskState::Pending,
            TaskState::InProgress,
            TaskState::Failed,
            TaskState::Escalated,
        ] {
            let task = store
                .add_task(plan.id, WorkerRole::Coo, "work")
                .await
                .unwrap();
            if state != TaskState::Pending {
                store.set_task_state(task.id, state, None).await.unwrap();
            }
            let cancelled = store.cancel_task(task.id).await.unwrap();
            assert_eq!(cancelled.state, TaskState::Cancelled);

            // cancelling twice is rejected
            let err = store.cancel_task(task.id).await;
            assert!(matches!(err, Err(StoreError::InvalidTransition { .. })));
        }

        let done = store
            .add_task(plan.id, WorkerRole::Cmo, "work")
            .await
            .unwrap();
        store
            .set_task_state(done.id, TaskState::Completed, None)
            .await
            .unwrap();
        let err = store.cancel_task(done.id).await;
        assert!(matches!(err, Err(StoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_cancel_plan_cascades_to_open_tasks() {
        let store = setup_store().await;
        let plan = store.create_plan("goal").await.unwrap();

        let pending = store
            .add_task(plan.id, WorkerRole::Cfo, "a")
            .await
            .unwrap();
        let running = store
            .add_task(plan.id, WorkerRole::Cto, "b")
            .await
            .unwrap();
        let done = store.add_task(plan.id, WorkerRole::Cmo, "c").await.unwrap();

        store
            .set_task_state(running.id, TaskState::InProgress, None)
            .await
            .unwrap();
        store
            .set_task_state(done.id, TaskState::Completed, None)
            .await
            .unwrap();

        let cancelled = store.cancel_plan(plan.id).await.unwrap();
        assert_eq!(cancelled.status, PlanStatus::Cancelled);
        assert!(cancelled.closed_at.is_some());

        let tasks = store.list_tasks(plan.id).await.unwrap();
        let by_id = |id: Uuid| tasks.iter().find(|t| t.id == id).unwrap();
        assert_eq!(by_id(pending.id).state, TaskState::Cancelled);
        assert_eq!(by_id(running.id).state, TaskState::Cancelled);
        assert_eq!(by_id(done.id).state, TaskState::Completed);

        let kinds = event_kinds(&store, plan.id).await;
        assert_eq!(kinds.iter().filter(|k| *k == "task_cancelled").count(), 2);
        assert_eq!(kinds.iter().filter(|k| *k == "plan_cancelled").count(), 1);

        // a second cancel is rejected
        let err = store.cancel_plan(plan.id).await;
        assert!(matches!(err, Err(StoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_close_plan_terminal_semantics() {
        let store = setup_store().await;

        let plan = store.create_plan("goal").await.unwrap();
        let partial = store
            .close_plan(plan.id, PlanStatus::PartiallyCompleted)
            .await
            .unwrap();
        assert_eq!(partial.status, PlanStatus::PartiallyCompleted);
        assert!(partial.closed_at.is_none());

        let failed = store.close_plan(plan.id, PlanStatus::Failed).await.unwrap();
        assert_eq!(failed.status, PlanStatus::Failed);
        assert!(failed.closed_at.is_some());

        // terminal plans are never reopened by a late close
        let after = store
            .close_plan(plan.id, PlanStatus::PartiallyCompleted)
            .await
            .unwrap();
        assert_eq!(after.status, PlanStatus::Failed);
    }

    #[tokio::test]
    async fn test_reentering_same_status_logs_a_fresh_event() {
        let store = setup_store().await;
        let plan = store.create_plan("goal").await.unwrap();
        let ok = store.add_task(plan.id, WorkerRole::Cfo, "a").await.unwrap();
        let flaky = store.add_task(plan.id, WorkerRole::Cto, "b").await.unwrap();

        store
            .set_task_state(ok.id, TaskState::Completed, None)
            .await
            .unwrap();
        store
            .set_task_state(flaky.id, TaskState::Failed, Some("boom"))
            .await
            .unwrap();
        store
            .close_plan(plan.id, PlanStatus::PartiallyCompleted)
            .await
            .unwrap();

        // the retry fails again: same status, same counts, new attempt
        store.mark_retry(flaky.id).await.unwrap();
        store
            .set_task_state(flaky.id, TaskState::Failed, Some("boom again"))
            .await
            .unwrap();
        store
            .close_plan(plan.id, PlanStatus::PartiallyCompleted)
            .await
            .unwrap();

        let kinds = event_kinds(&store, plan.id).await;
        assert_eq!(
            kinds
                .iter()
                .filter(|k| *k == "plan_status_changed")
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_list_events_newest_first_and_bounded() {
        let store = setup_store().await;
        let plan = store.create_plan("goal").await.unwrap();
        let task = store
            .add_task(plan.id, WorkerRole::Cfo, "budget")
            .await
            .unwrap();

        store
            .set_task_state(task.id, TaskState::InProgress, None)
            .await
            .unwrap();
        store
            .set_task_state(task.id, TaskState::Failed, Some("x"))
            .await
            .unwrap();
        store.mark_retry(task.id).await.unwrap();

        let events = store.list_events(plan.id, None, 1000).await.unwrap();
        // plan_created, task_created, two state changes, retry
        assert!(events.len() >= 5);
        assert_eq!(events[0].kind, "task_retry");

        let bounded = store.list_events(plan.id, None, 2).await.unwrap();
        assert_eq!(bounded.len(), 2);

        let task_only = store
            .list_events(plan.id, Some(task.id), 1000)
            .await
            .unwrap();
        assert!(task_only.iter().all(|e| e.task_id == Some(task.id)));
        assert!(task_only.len() >= 4);
    }

    #[tokio::test]
    async fn test_log_event_is_idempotent() {
        let store = setup_store().await;
        let plan = store.create_plan("goal").await.unwrap();
        let task = store
            .add_task(plan.id, WorkerRole::Cto, "work")
            .await
            .unwrap();

        let payload = json!({ "confidence": 0.8, "summary": "done" });
        let first = store
            .log_event(plan.id, Some(task.id), "task_completed", payload.clone())
            .await
            .unwrap();
        let second = store
            .log_event(plan.id, Some(task.id), "task_completed", payload)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let kinds = event_kinds(&store, plan.id).await;
        assert_eq!(kinds.iter().filter(|k| *k == "task_completed").count(), 1);
    }

    #[tokio::test]
    async fn test_save_final_result_upserts() {
        let store = setup_store().await;
        let plan = store.create_plan("goal").await.unwrap();

        store
            .save_final_result(plan.id, json!({ "synthesized_strategy": "v1" }))
            .await
            .unwrap();
        store
            .save_final_result(plan.id, json!({ "synthesized_strategy": "v2" }))
            .await
            .unwrap();

        let result = store.get_final_result(plan.id).await.unwrap().unwrap();
        assert_eq!(result.content["synthesized_strategy"], "v2");

        // each distinct save is audited; re-saving identical content is not
        let kinds = event_kinds(&store, plan.id).await;
        assert_eq!(
            kinds.iter().filter(|k| *k == "final_result_saved").count(),
            2
        );

        store
            .save_final_result(plan.id, json!({ "synthesized_strategy": "v2" }))
            .await
            .unwrap();
        let kinds = event_kinds(&store, plan.id).await;
        assert_eq!(
            kinds.iter().filter(|k| *k == "final_result_saved").count(),
            2
        );

        assert!(store
            .get_final_result(Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }
}
