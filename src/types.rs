//! Core Types
//!
//! Shared identifiers and data types used across the wager engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Currency amount in credits. Deltas are signed; wager amounts are
/// validated non-negative at the boundaries.
pub type Credits = i64;

/// Unique identifier of a duel entity.
pub type DuelId = Uuid;

/// Stable identity of a participant, as assigned by the host.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a spatial zone (system, arena) in the host world.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ZoneId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ZoneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a participant currently is, as reported by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Presence {
    /// Flying in open space in a zone. The only state that can issue
    /// or accept wagers.
    #[serde(rename = "in_space")]
    InSpace { zone: ZoneId },

    /// Docked at a base in a zone.
    #[serde(rename = "docked")]
    Docked { zone: ZoneId },

    /// Sitting in the character menu.
    #[serde(rename = "in_menu")]
    InMenu { zone: ZoneId },

    /// Not connected.
    #[serde(rename = "offline")]
    Offline,
}

impl Presence {
    /// Zone the participant is associated with, if any.
    pub fn zone(&self) -> Option<&ZoneId> {
        match self {
            Presence::InSpace { zone } | Presence::Docked { zone } | Presence::InMenu { zone } => {
                Some(zone)
            }
            Presence::Offline => None,
        }
    }

    pub fn is_in_space(&self) -> bool {
        matches!(self, Presence::InSpace { .. })
    }

    pub fn is_online(&self) -> bool {
        !matches!(self, Presence::Offline)
    }
}
