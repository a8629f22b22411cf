//! Outbound Notices
//!
//! Structured announcements produced by settlement and command handling.
//! Each notice carries an audience for routing and a typed body with the
//! names and amounts involved; the Display rendering is the line the host
//! prints to chat. Delivery fan-out runs over a broadcast channel that
//! the gateway's WebSocket subscribers drain.

use crate::types::{Credits, ParticipantId, ZoneId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;

/// Who a notice is addressed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope")]
pub enum Audience {
    /// One participant, wherever they are.
    #[serde(rename = "participant")]
    Participant { id: ParticipantId },

    /// Everyone currently in a zone.
    #[serde(rename = "zone")]
    Zone { zone: ZoneId },
}

/// Notice payloads. Names are display names resolved at emission time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NoticeBody {
    /// A duel challenge went out.
    #[serde(rename = "challenge_issued")]
    ChallengeIssued {
        challenger: String,
        challenged: String,
        wager: Credits,
    },

    /// Direct invite to the challenged party.
    #[serde(rename = "duel_invite")]
    DuelInvite { challenger: String, wager: Credits },

    /// The challenged party accepted.
    #[serde(rename = "challenge_accepted")]
    ChallengeAccepted {
        challenger: String,
        challenged: String,
        wager: Credits,
    },

    /// An accepted duel settled.
    #[serde(rename = "duel_resolved")]
    DuelResolved {
        winner: String,
        loser: String,
        wager: Credits,
    },

    /// A proposed duel was called off.
    #[serde(rename = "duel_cancelled")]
    DuelCancelled,

    /// Direct invite to a seeded free-for-all member.
    #[serde(rename = "ffa_invite")]
    FfaInvite { initiator: String, entry: Credits },

    /// A member accepted and paid in.
    #[serde(rename = "ffa_joined")]
    FfaJoined { participant: String, pot: Credits },

    /// Receipt for the entry fee, sent to the payer.
    #[serde(rename = "entry_debited")]
    EntryDebited { entry: Credits },

    /// A standing contestant was knocked out.
    #[serde(rename = "ffa_eliminated")]
    FfaEliminated { participant: String },

    /// Last contestant standing took the pot.
    #[serde(rename = "ffa_won")]
    FfaWon { winner: String, pot: Credits },

    /// The tournament ended with nobody standing.
    #[serde(rename = "ffa_voided")]
    FfaVoided,
}

impl fmt::Display for NoticeBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeBody::ChallengeIssued { challenger, challenged, wager } => write!(
                f,
                "{challenger} has challenged {challenged} to a duel for {wager} credits."
            ),
            NoticeBody::DuelInvite { challenger, wager } => write!(
                f,
                "{challenger} has challenged you to a duel for {wager} credits. Type /acceptduel to accept."
            ),
            NoticeBody::ChallengeAccepted { challenger, challenged, wager } => write!(
                f,
                "{challenged} has accepted the duel with {challenger} for {wager} credits."
            ),
            NoticeBody::DuelResolved { winner, loser, wager } => write!(
                f,
                "{winner} has won a duel against {loser} for {wager} credits."
            ),
            NoticeBody::DuelCancelled => write!(f, "Duel cancelled."),
            NoticeBody::FfaInvite { initiator, entry } => write!(
                f,
                "{initiator} has started a free-for-all. Cost to enter is {entry} credits. Type /acceptffa to enter."
            ),
            NoticeBody::FfaJoined { participant, pot } => write!(
                f,
                "{participant} has joined the free-for-all. The pot is now at {pot} credits."
            ),
            NoticeBody::EntryDebited { entry } => {
                write!(f, "{entry} credits have been deducted from your account.")
            }
            NoticeBody::FfaEliminated { participant } => {
                write!(f, "{participant} has been knocked out of the free-for-all.")
            }
            NoticeBody::FfaWon { winner, pot } => write!(
                f,
                "{winner} has won the free-for-all and receives {pot} credits."
            ),
            NoticeBody::FfaVoided => write!(f, "No one has won the free-for-all."),
        }
    }
}

/// A routed announcement with its emission time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notice {
    pub audience: Audience,
    #[serde(flatten)]
    pub body: NoticeBody,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn new(audience: Audience, body: NoticeBody) -> Self {
        Self { audience, body, at: Utc::now() }
    }

    /// The chat line the host should print for this notice.
    pub fn text(&self) -> String {
        self.body.to_string()
    }
}

/// Broadcast fan-out for notices.
#[derive(Clone)]
pub struct NoticeHub {
    tx: broadcast::Sender<Notice>,
}

impl NoticeHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish to any audience.
    pub fn publish(&self, audience: Audience, body: NoticeBody) {
        if self.tx.send(Notice::new(audience, body)).is_err() {
            debug!("no notice subscribers connected");
        }
    }

    /// Publish to one participant.
    pub fn to_participant(&self, id: &ParticipantId, body: NoticeBody) {
        self.publish(Audience::Participant { id: id.clone() }, body);
    }

    /// Publish to everyone in a zone.
    pub fn to_zone(&self, zone: &ZoneId, body: NoticeBody) {
        self.publish(Audience::Zone { zone: zone.clone() }, body);
    }
}
