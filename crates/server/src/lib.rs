pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/readyz", get(routes::health::readiness))
        .route("/plans", post(routes::plans::create_plan))
        .route("/plans/{id}", get(routes::plans::get_plan))
        .route("/plans/{id}/events", get(routes::plans::list_plan_events))
        .route("/plans/{id}/cancel", post(routes::plans::cancel_plan))
        .route("/tasks/{id}/retry", post(routes::tasks::retry_task))
        .route("/tasks/{id}/cancel", post(routes::tasks::cancel_task))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
