//! Gateway Payloads
//!
//! Request and response bodies for the host-facing endpoints.

use crate::types::{Credits, Presence};
use serde::{Deserialize, Serialize};

/// POST /command request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Participant issuing the chat line.
    pub participant: String,
    /// The raw chat line, leading slash included.
    pub line: String,
}

/// POST /command response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Text to print back to the issuer.
    pub reply: String,
    /// Whether the command was refused rather than carried out.
    pub rejected: bool,
}

/// POST /event/death request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeathEvent {
    pub victim: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killer: Option<String>,
}

/// Request body for the single-participant lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantEvent {
    pub participant: String,
}

/// Response for all lifecycle event endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAccepted {
    pub queued: bool,
}

/// PUT /players/{participant} request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerUpsertRequest {
    pub name: String,
    pub presence: Presence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// PUT /players/{participant} response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerUpdated {
    pub participant: String,
}

/// PUT /players/{participant}/balance request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceRequest {
    pub balance: Credits,
}

/// PUT /players/{participant}/balance response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceUpdated {
    pub participant: String,
    pub balance: Credits,
}

/// GET /health response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /status response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub service: ServiceInfo,
    pub wagers: WagerCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WagerCounts {
    pub duels: usize,
    pub ffas: usize,
    pub escrow_held: Credits,
}
