mod error;
mod ollama;
mod prompts;
mod specialist;
mod synthesizer;

pub use error::AgentError;
pub use ollama::OllamaClient;
pub use specialist::SpecialistWorker;
pub use synthesizer::BoardSynthesizer;
