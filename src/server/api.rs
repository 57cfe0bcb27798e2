//! REST + WebSocket endpoints for the host server.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::runner::{Orchestrator, OrchestratorError, Subscription};
use crate::suite::Suite;

/// Shared state for API handlers.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub suite: Suite,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    is_running: bool,
    has_results: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_run_start_time: Option<DateTime<Utc>>,
    timestamp: DateTime<Utc>,
}

/// Build API router
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/tests/status", get(get_status))
        .route("/api/tests/results", get(get_results).delete(clear_results))
        .route("/api/tests/run", post(run_tests))
        .route("/api/tests/run/:id", post(run_single_test))
        .route("/api/tests/live", get(live_updates))
        .route("/api/screenshots/:reference", get(get_screenshot))
}

async fn get_health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.orchestrator.status();
    Json(StatusResponse {
        is_running: status.is_running,
        has_results: state.orchestrator.last_report().is_some(),
        last_run_start_time: status.last_run_start_time,
        timestamp: Utc::now(),
    })
}

async fn get_results(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.orchestrator.last_report() {
        Some(report) => Json((*report).clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "No test results available",
                "message": "Please run tests first",
            })),
        )
            .into_response(),
    }
}

async fn clear_results(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.orchestrator.clear_last_report();
    Json(json!({ "message": "Test results cleared", "timestamp": Utc::now() }))
}

/// Kick off a run and answer immediately; the suite completes in the
/// background and observers follow it over the live feed.
async fn run_tests(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.orchestrator.status().is_running {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Tests already running",
                "message": "Please wait for the current test run to complete",
            })),
        )
            .into_response();
    }

    let orchestrator = state.orchestrator.clone();
    let suite = state.suite.clone();
    tokio::spawn(async move {
        match orchestrator.run_suite(&suite).await {
            Ok(report) => debug!(
                "background run {} finished: {} passed, {} failed",
                report.id,
                report.passed(),
                report.failed()
            ),
            // Lost the race against another caller; the orchestrator's own
            // flag is the authority and nothing was mutated.
            Err(OrchestratorError::AlreadyRunning) => {
                debug!("background run rejected: already running")
            }
            Err(e) => error!("background run failed: {}", e),
        }
    });

    Json(json!({
        "message": "Test run started",
        "status": "running",
        "timestamp": Utc::now(),
    }))
    .into_response()
}

/// Run one test of the configured suite by id, as a single-entry suite.
/// Goes through the same orchestrator, so the busy flag still applies.
async fn run_single_test(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if state.orchestrator.status().is_running {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Tests already running",
                "message": "Please wait for the current test run to complete",
            })),
        )
            .into_response();
    }

    let Some(definition) = state.suite.tests.iter().find(|t| t.id == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Test not found",
                "message": format!("Test \"{}\" does not exist", id),
            })),
        )
            .into_response();
    };

    let single = Suite::new(state.suite.name.clone(), vec![definition.clone()]);
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run_suite(&single).await {
            match e {
                OrchestratorError::AlreadyRunning => {
                    debug!("single-test run rejected: already running")
                }
                other => error!("single-test run failed: {}", other),
            }
        }
    });

    Json(json!({
        "message": "Test run started",
        "test": id,
        "status": "running",
        "timestamp": Utc::now(),
    }))
    .into_response()
}

async fn get_screenshot(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.screenshot(&reference) {
        Some(entry) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/png")],
            entry.bytes.clone(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Screenshot not found" })),
        )
            .into_response(),
    }
}

async fn live_updates(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_live_socket(socket, state))
}

/// Snapshot-first protocol: one `connected` event with the current state,
/// then the ordered live feed until either side goes away.
async fn handle_live_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let Subscription {
        connected,
        mut receiver,
    } = state.orchestrator.subscribe();

    let snapshot = match serde_json::to_string(&connected) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("failed to encode connected snapshot: {}", e);
            return;
        }
    };
    if socket.send(Message::Text(snapshot)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("failed to encode progress event: {}", e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("live subscriber lagged, {} events dropped", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }
}
