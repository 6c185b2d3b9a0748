use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Escalated,
    Cancelled,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Escalated => "escalated",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "escalated" => Some(Self::Escalated),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Completed and cancelled tasks may never be overwritten by a
    /// response-driven state change; only an explicit retry can move a
    /// cancelled task again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn can_retry(&self) -> bool {
        matches!(self, Self::Failed | Self::Escalated | Self::Cancelled)
    }

    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }
}

/// The closed set of specialist roles a task can be assigned to.
/// The CEO is the synthesizer, not a task role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkerRole {
    #[default]
    Cfo,
    Cto,
    Cmo,
    Coo,
}

impl WorkerRole {
    pub const ALL: [WorkerRole; 4] = [Self::Cfo, Self::Cto, Self::Cmo, Self::Coo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cfo => "CFO",
            Self::Cto => "CTO",
            Self::Cmo => "CMO",
            Self::Coo => "COO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CFO" => Some(Self::Cfo),
            "CTO" => Some(Self::Cto),
            "CMO" => Some(Self::Cmo),
            "COO" => Some(Self::Coo),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work assigned to a specialist role within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub role: WorkerRole,
    pub description: String,
    pub state: TaskState,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(plan_id: Uuid, role: WorkerRole, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            plan_id,
            role,
            description: description.into(),
            state: TaskState::default(),
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let plan_id = Uuid::new_v4();
        let task = Task::new(plan_id, WorkerRole::Cfo, "Model the budget");

        assert_eq!(task.plan_id, plan_id);
        assert_eq!(task.role, WorkerRole::Cfo);
        assert_eq!(task.state, TaskState::Pending);
        assert_eq!(task.attempts, 0);
        assert!(task.last_error.is_none());
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(TaskState::Pending.as_str(), "pending");
        assert_eq!(TaskState::InProgress.as_str(), "in_progress");
        assert_eq!(TaskState::Escalated.as_str(), "escalated");
        assert_eq!(TaskState::parse("cancelled"), Some(TaskState::Cancelled));
        assert_eq!(TaskState::parse("done"), None);
    }

    #[test]
    fn test_retry_and_cancel_predicates() {
        assert!(TaskState::Failed.can_retry());
        assert!(TaskState::Escalated.can_retry());
        assert!(TaskState::Cancelled.can_retry());
        assert!(!TaskState::Pending.can_retry());
        assert!(!TaskState::InProgress.can_retry());
        assert!(!TaskState::Completed.can_retry());

        assert!(TaskState::Pending.can_cancel());
        assert!(TaskState::InProgress.can_cancel());
        assert!(TaskState::Failed.can_cancel());
        assert!(TaskState::Escalated.can_cancel());
        assert!(!TaskState::Completed.can_cancel());
        assert!(!TaskState::Cancelled.can_cancel());
    }

    #[test]
    fn test_role_round_trip() {
        for role in WorkerRole::ALL {
            assert_eq!(WorkerRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(WorkerRole::parse("CEO"), None);
    }
}
