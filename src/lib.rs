//! Sidepot - Wager Escrow and Settlement Engine
//!
//! Holds player-versus-player wagers for a multiplayer game host: 1v1
//! duels and zone-scoped free-for-alls. A single worker task owns all
//! wager state and settles it against host lifecycle events; the HTTP
//! gateway is the host-facing surface.

pub mod commands;
pub mod config;
pub mod directory;
pub mod engine;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod ledger;
pub mod metrics;
pub mod notice;
pub mod registry;
pub mod settlement;
pub mod types;

pub use engine::{CommandReply, Engine, EngineHandle};
pub use errors::{LedgerError, WagerError};
pub use types::{Credits, DuelId, ParticipantId, Presence, ZoneId};
