mod event;
mod final_result;
mod plan;
mod task;

pub use event::EventRow;
pub use final_result::FinalResultRow;
pub use plan::PlanRow;
pub use task::TaskRow;

use chrono::{DateTime, TimeZone, Utc};

// Timestamps are stored as unix milliseconds so event ordering stays
// stable at sub-second resolution.
pub(crate) fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

pub(crate) fn datetime_to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}
