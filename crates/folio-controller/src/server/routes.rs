use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, info, warn};

use folio_core::clock::rfc3339_now;
use folio_core::wire::{ControllerHealth, ServerStatus, StatusResponse};

use super::AppState;
use crate::supervisor::StopOutcome;

/// Failure reply: 500 with `{success: false, message}`.
fn failure(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(StatusResponse::failure(message)),
    )
        .into_response()
}

/// `GET /health`
pub async fn health() -> Json<ControllerHealth> {
    Json(ControllerHealth {
        status: "Controller service running".to_string(),
        timestamp: rfc3339_now(),
    })
}

/// `POST /start-server`
pub async fn start_server(State(state): State<AppState>) -> Response {
    let supervisor = &state.supervisor;
    if supervisor.is_live().await {
        return Json(StatusResponse::ok("Server already running")).into_response();
    }

    if let Err(e) = supervisor.start().await {
        error!(error = %e, "Failed to start Content API");
        return failure(e.to_string());
    }

    for attempt in 1..=state.confirm_attempts {
        if supervisor.is_live().await {
            info!(attempt, "Content API confirmed live");
            return Json(StatusResponse::ok("Server started successfully")).into_response();
        }
        tokio::time::sleep(state.confirm_interval).await;
    }

    warn!(
        attempts = state.confirm_attempts,
        "Content API started but never answered"
    );
    failure("Server started but not responding")
}

/// `POST /stop-server`
pub async fn stop_server(State(state): State<AppState>) -> Json<StatusResponse> {
    match state.supervisor.stop().await {
        StopOutcome::Stopped { forced } => info!(forced, "Stop request handled"),
        StopOutcome::Reaped(killed) => info!(killed, "Stop request found no child, port reaped"),
    }
    Json(StatusResponse::ok("Server stopped successfully"))
}

/// `GET /server-status`
pub async fn server_status(State(state): State<AppState>) -> Json<ServerStatus> {
    let running = state.supervisor.is_live().await;
    let has_process = state.supervisor.has_process().await;
    Json(ServerStatus {
        running,
        has_process,
    })
}
