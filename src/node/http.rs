//! HTTP API for a node
//!
//! Participant endpoints (`/canCommit`, `/doCommit`) and the coordinator
//! entry point (`/start`) share one router, so every node can play both
//! roles.

use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::{default_message, DurableLog, Error, Vote};
use crate::coordinator::peer_client::{CanCommitResponse, DoCommitRequest};
use crate::coordinator::{Coordinator, HttpPeerClient};
use crate::participant::Participant;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct NodeState {
    pub node_id: String,
    pub commit_probability: f64,
    pub participant: Arc<Participant>,
    pub coordinator: Arc<Coordinator<HttpPeerClient>>,
    pub log: Arc<dyn DurableLog>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub decision: Vote,
}

pub fn create_router(state: NodeState) -> Router {
    Router::new()
        // Participant
        .route("/canCommit", post(can_commit))
        .route("/doCommit", post(do_commit))
        // Coordinator
        .route("/start", post(start))
        // Inspection
        .route("/log", get(read_log))
        .route("/health", get(health))
        .route("/health/live", get(health_live))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_tracing_middleware))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

fn error_response(err: &Error) -> Response {
    (err.to_http_status(), Json(json!({ "error": err.to_string() }))).into_response()
}

async fn can_commit(State(state): State<NodeState>) -> Json<CanCommitResponse> {
    Json(CanCommitResponse {
        vote: state.participant.can_commit(),
    })
}

async fn do_commit(State(state): State<NodeState>, Json(req): Json<DoCommitRequest>) -> Response {
    match state.participant.do_commit(req.decision, &req.message).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        // Anything but 2xx tells the coordinator to retry
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Start a transaction with this node as coordinator.
///
/// The body is optional; without a message one is generated from the
/// current time.
async fn start(State(state): State<NodeState>, body: Bytes) -> Response {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        match serde_json::from_slice::<StartRequest>(&body) {
            Ok(req) => req,
            Err(e) => return error_response(&Error::from(e)),
        }
    };

    let message = req
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(default_message);

    match state.coordinator.start(message).await {
        Ok(decision) => Json(StartResponse { decision }).into_response(),
        Err(Error::LocalApplyFailed { decision, reason }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": format!("local apply failed: {}", reason),
                "decision": decision,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn read_log(State(state): State<NodeState>) -> Response {
    match state.log.entries() {
        Ok(entries) => Json(json!({ "entries": entries })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn health(State(state): State<NodeState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "node_id": state.node_id,
        "peers": state.coordinator.peers(),
        "commit_probability": state.commit_probability,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness probe
/// Returns 200 if the process can answer at all
async fn health_live() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "alive": true,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().timestamp(),
        })),
    )
}
