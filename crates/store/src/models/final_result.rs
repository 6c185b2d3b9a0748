use super::millis_to_datetime;
use board_core::FinalResult;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FinalResultRow {
    pub plan_id: String,
    pub content: String,
    pub created_at: i64,
}

impl FinalResultRow {
    pub fn into_domain(self) -> FinalResult {
        FinalResult {
            plan_id: Uuid::parse_str(&self.plan_id).unwrap_or_default(),
            content: serde_json::from_str(&self.content).unwrap_or(serde_json::Value::Null),
            created_at: millis_to_datetime(self.created_at),
        }
    }
}
