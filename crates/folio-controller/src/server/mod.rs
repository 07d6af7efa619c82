//! Controller HTTP surface.

pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::supervisor::ProcessSupervisor;

/// Probes made after a start before reporting the server unresponsive.
pub const CONFIRM_ATTEMPTS: u32 = 10;
pub const CONFIRM_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<ProcessSupervisor>,
    pub confirm_attempts: u32,
    pub confirm_interval: Duration,
}

impl AppState {
    pub const fn new(supervisor: Arc<ProcessSupervisor>) -> Self {
        Self {
            supervisor,
            confirm_attempts: CONFIRM_ATTEMPTS,
            confirm_interval: CONFIRM_INTERVAL,
        }
    }
}

/// Build the controller router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/start-server", post(routes::start_server))
        .route("/stop-server", post(routes::stop_server))
        .route("/server-status", get(routes::server_status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
