//! Participant Directory
//!
//! Presence, zone, display name, and target-selection lookups, backed by
//! the host process. The engine only ever asks questions; the host keeps
//! this current through its own session tracking. An in-memory
//! implementation backs the stand-alone binary and the test suite.

use crate::types::{ParticipantId, Presence, ZoneId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Synchronous view of who is connected, where they are, and what they
/// have targeted.
pub trait Directory: Send + Sync {
    /// Current presence; `Presence::Offline` for unknown participants.
    fn presence(&self, participant: &ParticipantId) -> Presence;

    /// Human-facing name, if the participant is known.
    fn display_name(&self, participant: &ParticipantId) -> Option<String>;

    /// The ship the participant currently has selected, if it is
    /// another participant's ship.
    fn selected_target(&self, participant: &ParticipantId) -> Option<ParticipantId>;

    /// Everyone flying in open space in the zone.
    fn zone_roster(&self, zone: &ZoneId) -> Vec<ParticipantId>;

    /// Display name with the raw id as fallback.
    fn name_or_id(&self, participant: &ParticipantId) -> String {
        self.display_name(participant)
            .unwrap_or_else(|| participant.to_string())
    }
}

/// A directory record as reported by the host.
#[derive(Clone, Debug)]
pub struct PlayerRecord {
    pub name: String,
    pub presence: Presence,
    pub target: Option<ParticipantId>,
}

/// In-memory directory used by the binary (fed over the gateway) and tests.
#[derive(Default)]
pub struct InMemoryDirectory {
    players: RwLock<HashMap<ParticipantId, PlayerRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a participant's record.
    pub fn upsert(&self, participant: ParticipantId, record: PlayerRecord) {
        self.players
            .write()
            .expect("directory lock poisoned")
            .insert(participant, record);
    }

    /// Update presence only, keeping name and target.
    pub fn set_presence(&self, participant: &ParticipantId, presence: Presence) {
        if let Some(record) = self
            .players
            .write()
            .expect("directory lock poisoned")
            .get_mut(participant)
        {
            record.presence = presence;
        }
    }

    /// Update the selected target only.
    pub fn set_target(&self, participant: &ParticipantId, target: Option<ParticipantId>) {
        if let Some(record) = self
            .players
            .write()
            .expect("directory lock poisoned")
            .get_mut(participant)
        {
            record.target = target;
        }
    }
}

impl Directory for InMemoryDirectory {
    fn presence(&self, participant: &ParticipantId) -> Presence {
        self.players
            .read()
            .expect("directory lock poisoned")
            .get(participant)
            .map(|r| r.presence.clone())
            .unwrap_or(Presence::Offline)
    }

    fn display_name(&self, participant: &ParticipantId) -> Option<String> {
        self.players
            .read()
            .expect("directory lock poisoned")
            .get(participant)
            .map(|r| r.name.clone())
    }

    fn selected_target(&self, participant: &ParticipantId) -> Option<ParticipantId> {
        self.players
            .read()
            .expect("directory lock poisoned")
            .get(participant)
            .and_then(|r| r.target.clone())
    }

    fn zone_roster(&self, zone: &ZoneId) -> Vec<ParticipantId> {
        let players = self.players.read().expect("directory lock poisoned");
        let mut roster: Vec<ParticipantId> = players
            .iter()
            .filter(|(_, r)| matches!(&r.presence, Presence::InSpace { zone: z } if z == zone))
            .map(|(id, _)| id.clone())
            .collect();
        roster.sort();
        roster
    }
}
