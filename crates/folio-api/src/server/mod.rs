//! HTTP surface of the Content API.

pub mod bearer;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::articles::ArticleRepository;
use crate::auth::AuthService;

pub use bearer::Authenticated;
pub use error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub articles: Arc<dyn ArticleRepository>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, articles: Arc<dyn ArticleRepository>) -> Self {
        Self {
            auth,
            articles,
            started_at: Instant::now(),
        }
    }
}

/// Build the Content API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/send-otp", post(routes::send_otp))
        .route("/api/verify-otp", post(routes::verify_otp))
        .route(
            "/api/articles",
            get(routes::list_articles).post(routes::save_article),
        )
        .route("/api/articles/{id}", delete(routes::delete_article))
        .route("/health", get(routes::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
