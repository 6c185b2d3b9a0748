use std::sync::Arc;

use agents::{BoardSynthesizer, OllamaClient, SpecialistWorker};
use board_core::WorkerRole;
use orchestrator::WorkerRegistry;
use server::config::ServerConfig;
use server::state::AppState;
use store::{create_pool, run_migrations, StateStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env();

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    tracing::info!(database = %config.database_url, "State store ready");

    let client = OllamaClient::new(&config.ollama_url).with_model(&config.model);

    let mut registry = WorkerRegistry::new();
    for role in WorkerRole::ALL {
        registry = registry.register(role, Arc::new(SpecialistWorker::new(role, client.clone())));
    }

    let state = AppState::new(
        StateStore::new(pool),
        Arc::new(registry),
        Arc::new(BoardSynthesizer::new(client)),
    );

    let app = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
