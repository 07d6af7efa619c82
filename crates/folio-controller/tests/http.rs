#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use folio_controller::probe::ReadinessProbe;
use folio_controller::reaper::{PortReaper, ReapError};
use folio_controller::server::{AppState, build_router};
use folio_controller::supervisor::{ChildCommand, ProcessSupervisor, SupervisorConfig};

/// Live once the child has created its marker file.
struct MarkerProbe(PathBuf);

#[async_trait]
impl ReadinessProbe for MarkerProbe {
    async fn is_live(&self) -> bool {
        self.0.exists()
    }
}

/// Replays a fixed sequence of answers, then reports down.
struct ScriptedProbe(Mutex<VecDeque<bool>>);

#[async_trait]
impl ReadinessProbe for ScriptedProbe {
    async fn is_live(&self) -> bool {
        self.0.lock().unwrap().pop_front().unwrap_or(false)
    }
}

struct NoStrays;

#[async_trait]
impl PortReaper for NoStrays {
    async fn reap(&self, _port: u16) -> Result<usize, ReapError> {
        Ok(0)
    }
}

fn app(command: ChildCommand, probe: Arc<dyn ReadinessProbe>) -> (axum::Router, AppState) {
    let config = SupervisorConfig {
        startup_timeout: Duration::from_millis(500),
        stop_grace: Duration::from_millis(500),
        probe_interval: Duration::from_millis(20),
        reap_pause: Duration::from_millis(10),
        ..SupervisorConfig::new(command, 3001)
    };
    let supervisor = Arc::new(ProcessSupervisor::new(config, probe, Arc::new(NoStrays)));
    let state = AppState {
        confirm_attempts: 3,
        confirm_interval: Duration::from_millis(10),
        ..AppState::new(supervisor)
    };
    (build_router(state.clone()), state)
}

fn marker_child(dir: &tempfile::TempDir) -> (ChildCommand, Arc<dyn ReadinessProbe>) {
    let marker = dir.path().join("ready");
    let script = format!("touch '{}'; exec sleep 30", marker.display());
    (
        ChildCommand::new("sh").arg("-c").arg(script),
        Arc::new(MarkerProbe(marker)),
    )
}

async fn send(app: &axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_controller() {
    let (app, _) = app(ChildCommand::new("sleep"), Arc::new(ScriptedProbe(Mutex::default())));
    let (status, body) = send(&app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Controller service running");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn idle_status() {
    let (app, _) = app(ChildCommand::new("sleep"), Arc::new(ScriptedProbe(Mutex::default())));
    let (status, body) = send(&app, "GET", "/server-status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "running": false, "hasProcess": false }));
}

#[tokio::test]
async fn start_status_stop() {
    let dir = tempfile::tempdir().unwrap();
    let (command, probe) = marker_child(&dir);
    let (app, state) = app(command, probe);

    let (status, body) = send(&app, "POST", "/start-server").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "message": "Server started successfully" })
    );

    let (_, body) = send(&app, "GET", "/server-status").await;
    assert_eq!(body, json!({ "running": true, "hasProcess": true }));

    let (status, body) = send(&app, "POST", "/stop-server").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "message": "Server stopped successfully" })
    );
    assert!(!state.supervisor.has_process().await);
}

#[tokio::test]
async fn start_when_already_live_does_not_spawn() {
    let probe = Arc::new(ScriptedProbe(Mutex::new(VecDeque::from([true]))));
    let (app, state) = app(ChildCommand::new("sleep").arg("30"), probe);

    let (status, body) = send(&app, "POST", "/start-server").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Server already running");
    assert!(!state.supervisor.has_process().await);
}

#[tokio::test]
async fn start_that_goes_quiet_is_reported() {
    // Down before the start, ready once, then silent during confirmation.
    let probe = Arc::new(ScriptedProbe(Mutex::new(VecDeque::from([false, true]))));
    let (app, state) = app(ChildCommand::new("sleep").arg("30"), probe);

    let (status, body) = send(&app, "POST", "/start-server").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "success": false, "message": "Server started but not responding" })
    );

    state.supervisor.stop().await;
}

#[tokio::test]
async fn spawn_failure_is_a_server_error() {
    let (app, state) = app(
        ChildCommand::new("/nonexistent/folio-api"),
        Arc::new(ScriptedProbe(Mutex::default())),
    );
    let (status, body) = send(&app, "POST", "/start-server").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Failed to spawn Content API")
    );
    assert!(!state.supervisor.has_process().await);
}

#[tokio::test]
async fn stop_when_idle_succeeds() {
    let (app, _) = app(ChildCommand::new("sleep"), Arc::new(ScriptedProbe(Mutex::default())));
    let (status, body) = send(&app, "POST", "/stop-server").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}
