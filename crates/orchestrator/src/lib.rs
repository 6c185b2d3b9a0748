mod error;
mod registry;
mod runner;
mod synthesizer;
mod worker;

pub use error::{OrchestratorError, Result};
pub use registry::WorkerRegistry;
pub use runner::{PassSummary, PlanRunner};
pub use synthesizer::{SynthesisError, Synthesizer, TaskOutput};
pub use worker::{Worker, WorkerError};
