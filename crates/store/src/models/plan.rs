use super::{datetime_to_millis, millis_to_datetime};
use board_core::{Plan, PlanStatus};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlanRow {
    pub id: String,
    pub original_goal: String,
    pub status: String,
    pub created_at: i64,
    pub closed_at: Option<i64>,
}

impl PlanRow {
    pub fn into_domain(self) -> Plan {
        Plan {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            original_goal: self.original_goal,
            status: PlanStatus::parse(&self.status).unwrap_or_default(),
            created_at: millis_to_datetime(self.created_at),
            closed_at: self.closed_at.map(millis_to_datetime),
        }
    }
}

impl From<&Plan> for PlanRow {
    fn from(plan: &Plan) -> Self {
        Self {
            id: plan.id.to_string(),
            original_goal: plan.original_goal.clone(),
            status: plan.status.as_str().to_string(),
            created_at: datetime_to_millis(plan.created_at),
            closed_at: plan.closed_at.map(datetime_to_millis),
        }
    }
}
