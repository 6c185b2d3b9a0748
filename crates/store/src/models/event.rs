use super::millis_to_datetime;
use board_core::Event;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub plan_id: String,
    pub task_id: Option<String>,
    pub kind: String,
    pub payload: String,
    pub created_at: i64,
}

impl EventRow {
    pub fn into_domain(self) -> Event {
        Event {
            id: self.id,
            plan_id: Uuid::parse_str(&self.plan_id).unwrap_or_default(),
            task_id: self.task_id.and_then(|s| Uuid::parse_str(&s).ok()),
            kind: self.kind,
            payload: serde_json::from_str(&self.payload).unwrap_or(serde_json::Value::Null),
            created_at: millis_to_datetime(self.created_at),
        }
    }
}
