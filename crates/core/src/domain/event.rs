use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derive a deterministic identifier from the parts that make an event
/// logically unique. Re-deriving the same parts yields the same id, which
/// lets the event log ignore duplicate appends on conflict.
pub fn stable_id<I, P>(parts: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())[..24].to_string()
}

/// An immutable audit record of a plan or task mutation.
///
/// Events are append-only; once written they are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub plan_id: Uuid,
    /// None for plan-level events.
    pub task_id: Option<Uuid>,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
