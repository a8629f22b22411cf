//! Request Handlers
//!
//! Thin translation from HTTP to engine messages. All wager decisions
//! happen behind the engine queue; handlers only validate shape.

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::directory::{InMemoryDirectory, PlayerRecord};
use crate::engine::{EngineHandle, WagerSnapshot};
use crate::ledger::InMemoryLedger;
use crate::metrics::EngineMetrics;
use crate::types::ParticipantId;
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub engine: EngineHandle,
    pub directory: Arc<InMemoryDirectory>,
    pub ledger: Arc<InMemoryLedger>,
    pub metrics: Arc<EngineMetrics>,
    pub service: String,
    pub version: String,
}

fn engine_down(request_id: String) -> ApiError {
    ApiError::service_unavailable(request_id, "wager engine is not running".to_string())
}

fn parse_participant(request_id: &str, raw: &str) -> Result<ParticipantId, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(
            request_id.to_string(),
            "participant must not be empty".to_string(),
        ));
    }
    Ok(ParticipantId::from(trimmed))
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "Running".to_string() })
}

/// GET /status
pub async fn status_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let snapshot = state
        .engine
        .snapshot()
        .await
        .map_err(|_| engine_down(request_id.0))?;

    Ok(Json(StatusResponse {
        service: ServiceInfo {
            name: state.service.clone(),
            version: state.version.clone(),
        },
        wagers: WagerCounts {
            duels: snapshot.duels.len(),
            ffas: snapshot.ffas.len(),
            escrow_held: state.metrics.snapshot().escrow_held,
        },
    }))
}

/// GET /wagers
pub async fn wagers_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<WagerSnapshot>, ApiError> {
    let snapshot = state
        .engine
        .snapshot()
        .await
        .map_err(|_| engine_down(request_id.0))?;
    Ok(Json(snapshot))
}

/// POST /command
pub async fn command_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let issuer = parse_participant(&request_id.0, &body.participant)?;
    let reply = state
        .engine
        .command(issuer, body.line)
        .await
        .map_err(|_| engine_down(request_id.0))?;
    Ok(Json(CommandResponse { reply: reply.text, rejected: reply.rejected }))
}

/// POST /event/death
pub async fn death_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<DeathEvent>,
) -> Result<Json<EventAccepted>, ApiError> {
    let victim = parse_participant(&request_id.0, &body.victim)?;
    let killer = match body.killer.as_deref() {
        Some(raw) => Some(parse_participant(&request_id.0, raw)?),
        None => None,
    };
    state
        .engine
        .notify_death(victim, killer)
        .await
        .map_err(|_| engine_down(request_id.0))?;
    Ok(Json(EventAccepted { queued: true }))
}

/// POST /event/disconnect
pub async fn disconnect_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ParticipantEvent>,
) -> Result<Json<EventAccepted>, ApiError> {
    let participant = parse_participant(&request_id.0, &body.participant)?;
    state
        .engine
        .notify_disconnect(participant)
        .await
        .map_err(|_| engine_down(request_id.0))?;
    Ok(Json(EventAccepted { queued: true }))
}

/// POST /event/dock
pub async fn dock_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ParticipantEvent>,
) -> Result<Json<EventAccepted>, ApiError> {
    let participant = parse_participant(&request_id.0, &body.participant)?;
    state
        .engine
        .notify_dock(participant)
        .await
        .map_err(|_| engine_down(request_id.0))?;
    Ok(Json(EventAccepted { queued: true }))
}

/// POST /event/menu-open
pub async fn menu_open_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ParticipantEvent>,
) -> Result<Json<EventAccepted>, ApiError> {
    let participant = parse_participant(&request_id.0, &body.participant)?;
    state
        .engine
        .notify_menu_open(participant)
        .await
        .map_err(|_| engine_down(request_id.0))?;
    Ok(Json(EventAccepted { queued: true }))
}

/// PUT /players/{participant}
pub async fn upsert_player_handler(
    State(state): State<Arc<AppState>>,
    Path(participant): Path<String>,
    Json(body): Json<PlayerUpsertRequest>,
) -> Json<PlayerUpdated> {
    let id = ParticipantId::from(participant);
    state.directory.upsert(
        id.clone(),
        PlayerRecord {
            name: body.name,
            presence: body.presence,
            target: body.target.map(ParticipantId::from),
        },
    );
    Json(PlayerUpdated { participant: id.to_string() })
}

/// PUT /players/{participant}/balance
pub async fn set_balance_handler(
    State(state): State<Arc<AppState>>,
    Path(participant): Path<String>,
    Json(body): Json<BalanceRequest>,
) -> Json<BalanceUpdated> {
    let id = ParticipantId::from(participant);
    state.ledger.set_balance(id.clone(), body.balance);
    Json(BalanceUpdated { participant: id.to_string(), balance: body.balance })
}

/// GET /metrics — Prometheus text exposition.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.prometheus_text(),
    )
}
