//! Host Lifecycle Events
//!
//! The four notifications the host feeds the engine. Every event names
//! exactly one participant whose wagers it can terminate; events are
//! queued and processed one at a time in arrival order, so there is no
//! batch path and no simultaneous settlement.

use crate::types::ParticipantId;

/// A host notification about one participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The participant's ship was destroyed. The killer, when known, is
    /// carried for logging only; settlement needs just the victim.
    Death {
        victim: ParticipantId,
        killer: Option<ParticipantId>,
    },

    /// The participant dropped from the server.
    Disconnect { participant: ParticipantId },

    /// The participant docked at a base.
    Dock { participant: ParticipantId },

    /// The participant opened the character menu.
    MenuOpen { participant: ParticipantId },
}

impl LifecycleEvent {
    /// The participant whose wagers this event terminates.
    pub fn participant(&self) -> &ParticipantId {
        match self {
            LifecycleEvent::Death { victim, .. } => victim,
            LifecycleEvent::Disconnect { participant }
            | LifecycleEvent::Dock { participant }
            | LifecycleEvent::MenuOpen { participant } => participant,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::Death { .. } => "death",
            LifecycleEvent::Disconnect { .. } => "disconnect",
            LifecycleEvent::Dock { .. } => "dock",
            LifecycleEvent::MenuOpen { .. } => "menu_open",
        }
    }
}
