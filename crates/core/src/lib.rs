pub mod domain;

pub use domain::event::{stable_id, Event};
pub use domain::plan::{Plan, PlanStatus};
pub use domain::result::{FinalResult, SynthesisReport, WorkerResult};
pub use domain::task::{Task, TaskState, WorkerRole};
