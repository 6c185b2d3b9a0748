use super::{datetime_to_millis, millis_to_datetime};
use board_core::{Task, TaskState, WorkerRole};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub plan_id: String,
    pub role: String,
    pub description: String,
    pub state: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TaskRow {
    pub fn into_domain(self) -> Task {
        Task {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            plan_id: Uuid::parse_str(&self.plan_id).unwrap_or_default(),
            role: WorkerRole::parse(&self.role).unwrap_or_default(),
            description: self.description,
            state: TaskState::parse(&self.state).unwrap_or_default(),
            attempts: self.attempts.max(0) as u32,
            last_error: self.last_error,
            created_at: millis_to_datetime(self.created_at),
            updated_at: millis_to_datetime(self.updated_at),
        }
    }
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            plan_id: task.plan_id.to_string(),
            role: task.role.as_str().to_string(),
            description: task.description.clone(),
            state: task.state.as_str().to_string(),
            attempts: i64::from(task.attempts),
            last_error: task.last_error.clone(),
            created_at: datetime_to_millis(task.created_at),
            updated_at: datetime_to_millis(task.updated_at),
        }
    }
}
