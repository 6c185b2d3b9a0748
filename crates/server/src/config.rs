use std::env;

/// Runtime configuration, read from the environment with sensible defaults
/// for local development against a stock Ollama install.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub ollama_url: String,
    pub model: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            database_url: env::var("STATE_DB_PATH")
                .unwrap_or_else(|_| "sqlite://board_state.db".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: env::var("PRIMARY_LLM").unwrap_or_else(|_| "llama3.1".to_string()),
        }
    }
}
