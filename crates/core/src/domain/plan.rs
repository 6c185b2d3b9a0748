use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Open,
    Closed,
    Cancelled,
    Failed,
    PartiallyCompleted,
    SynthesisFailed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::PartiallyCompleted => "partially_completed",
            Self::SynthesisFailed => "synthesis_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            "partially_completed" => Some(Self::PartiallyCompleted),
            "synthesis_failed" => Some(Self::SynthesisFailed),
            _ => None,
        }
    }

    /// Terminal plan statuses admit no further automatic transitions.
    /// `partially_completed` and `synthesis_failed` stay open for
    /// operator intervention (task retry / synthesis re-run).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled | Self::Failed)
    }
}

/// A user goal decomposed into a fixed set of specialist tasks.
///
/// Invariant: `closed_at` is set if and only if `status` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub original_goal: String,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Plan {
    pub fn new(original_goal: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_goal: original_goal.into(),
            status: PlanStatus::default(),
            created_at: Utc::now(),
            closed_at: None,
        }
    }
}
