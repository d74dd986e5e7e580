//! HTTP boundary: thin JSON handlers over the Hub.
//!
//! This is the poll-cursor transport for the outbox abstraction: clients
//! post actions and drain their events with `GET /api/chat/events`. The
//! handlers parse input, call into the Hub, and map errors to status
//! codes; no chat logic lives here. Also serves `/metrics` for Prometheus.

use crate::error::ChatError;
use crate::events::Event;
use crate::metrics;
use crate::state::session::Tag;
use crate::state::Hub;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

/// Build the application router.
pub fn router(hub: Arc<Hub>) -> Router {
    Router::new()
        .route("/api/chat/join", post(join))
        .route("/api/chat/leave", post(leave))
        .route("/api/chat/next", post(next))
        .route("/api/chat/message", post(message))
        .route("/api/chat/events", get(events))
        .route("/metrics", get(metrics_handler))
        .with_state(hub)
}

/// Run the HTTP server. Long-running; serves until the process exits.
pub async fn serve(addr: SocketAddr, hub: Arc<Hub>) {
    let app = router(hub);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind HTTP server on {}: {}", addr, e);
            return;
        }
    };
    tracing::info!("HTTP server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("HTTP server error: {}", e);
    }
}

// ============================================================================
// Request/response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRequest {
    session_id: String,
    #[serde(default)]
    tag: Option<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest {
    session_id: String,
    partner_id: String,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsQuery {
    session_id: String,
    #[serde(default)]
    cursor: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinResponse {
    success: bool,
    display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    queue_position: Option<usize>,
    total_active: usize,
}

#[derive(Debug, Serialize)]
struct AckResponse {
    success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventsResponse {
    events: Vec<Event>,
    server_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    code: &'static str,
    error: String,
}

/// Wrapper mapping `ChatError` onto HTTP responses.
struct ApiError(ChatError);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::PairingMismatch(_) => StatusCode::CONFLICT,
            ChatError::Inconsistency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        metrics::record_error(self.0.error_code());
        let body = ErrorResponse {
            success: false,
            code: self.0.error_code(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn join(
    State(hub): State<Arc<Hub>>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let receipt = hub.join(&req.session_id, req.tag)?;
    Ok(Json(JoinResponse {
        success: true,
        display_name: receipt.display_name,
        queue_position: receipt.queue_position,
        total_active: receipt.total_active,
    }))
}

async fn leave(
    State(hub): State<Arc<Hub>>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    hub.leave(&req.session_id)?;
    Ok(Json(AckResponse { success: true }))
}

async fn next(
    State(hub): State<Arc<Hub>>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let receipt = hub.next(&req.session_id)?;
    Ok(Json(JoinResponse {
        success: true,
        display_name: receipt.display_name,
        queue_position: receipt.queue_position,
        total_active: receipt.total_active,
    }))
}

async fn message(
    State(hub): State<Arc<Hub>>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    hub.send_message(&req.session_id, &req.partner_id, &req.message)?;
    Ok(Json(AckResponse { success: true }))
}

async fn events(
    State(hub): State<Arc<Hub>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let poll = hub.poll_events(&query.session_id, query.cursor)?;
    Ok(Json(EventsResponse {
        events: poll.events,
        server_time: poll.server_time,
    }))
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
