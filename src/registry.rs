//! Wager Registry
//!
//! Owns every live wager entity and enforces the structural rules:
//! one active wager per participant across both kinds, fixed free-for-all
//! membership, pot arithmetic, and idempotent removal. The registry never
//! touches the ledger; escrow movement belongs to the engine and the
//! settlement routines.

use crate::errors::WagerError;
use crate::types::{Credits, DuelId, ParticipantId, ZoneId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// A head-to-head wager. Proposed until the challenged party accepts;
/// deleted on resolution or cancellation.
#[derive(Clone, Debug)]
pub struct Duel {
    pub challenger: ParticipantId,
    pub challenged: ParticipantId,
    pub wager: Credits,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

impl Duel {
    /// The other party of the duel, if `participant` is one of the two.
    pub fn opponent_of(&self, participant: &ParticipantId) -> Option<&ParticipantId> {
        if &self.challenger == participant {
            Some(&self.challenged)
        } else if &self.challenged == participant {
            Some(&self.challenger)
        } else {
            None
        }
    }

    pub fn involves(&self, participant: &ParticipantId) -> bool {
        &self.challenger == participant || &self.challenged == participant
    }
}

/// One member of a free-for-all. Unaccepted members hold no money and
/// are silently dropped when they leave; accepted members are eliminated
/// instead, which can complete the tournament.
#[derive(Clone, Debug, Default)]
pub struct Contestant {
    pub accepted: bool,
    pub eliminated: bool,
}

impl Contestant {
    pub fn standing(&self) -> bool {
        self.accepted && !self.eliminated
    }
}

/// A zone-scoped free-for-all tournament. Membership is fixed at
/// creation; the pot grows by one entry per acceptance.
#[derive(Clone, Debug)]
pub struct FreeForAll {
    pub zone: ZoneId,
    pub entry: Credits,
    pub pot: Credits,
    pub contestants: HashMap<ParticipantId, Contestant>,
    pub created_at: DateTime<Utc>,
}

impl FreeForAll {
    /// Contestants that have accepted and not been eliminated.
    pub fn standing(&self) -> impl Iterator<Item = &ParticipantId> {
        self.contestants
            .iter()
            .filter(|(_, c)| c.standing())
            .map(|(id, _)| id)
    }

    pub fn standing_count(&self) -> usize {
        self.contestants.values().filter(|c| c.standing()).count()
    }

    pub fn accepted_count(&self) -> usize {
        self.contestants.values().filter(|c| c.accepted).count()
    }
}

/// All live wagers. Owned and mutated by the single engine worker only.
#[derive(Default)]
pub struct WagerRegistry {
    duels: HashMap<DuelId, Duel>,
    ffas: HashMap<ZoneId, FreeForAll>,
}

impl WagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the participant is party to any live wager of either kind.
    pub fn is_engaged(&self, participant: &ParticipantId) -> bool {
        self.duels.values().any(|d| d.involves(participant))
            || self
                .ffas
                .values()
                .any(|f| f.contestants.contains_key(participant))
    }

    /// Propose a duel. The caller has already verified target validity
    /// and challenger funds; this enforces the structural rules.
    pub fn create_duel(
        &mut self,
        challenger: ParticipantId,
        challenged: ParticipantId,
        wager: Credits,
    ) -> Result<DuelId, WagerError> {
        if wager < 0 {
            return Err(WagerError::InvalidAmount);
        }
        if challenger == challenged {
            return Err(WagerError::InvalidTarget);
        }
        if self.is_engaged(&challenger) {
            return Err(WagerError::DuplicateWager { who: challenger.to_string() });
        }
        if self.is_engaged(&challenged) {
            return Err(WagerError::DuplicateWager { who: challenged.to_string() });
        }

        let id = Uuid::new_v4();
        self.duels.insert(
            id,
            Duel {
                challenger,
                challenged,
                wager,
                accepted: false,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    /// The proposed duel in which `challenged` is the challenged party.
    ///
    /// At most one such duel can exist because both parties count as
    /// engaged from the moment of proposal.
    pub fn duel_awaiting(&self, challenged: &ParticipantId) -> Result<(DuelId, &Duel), WagerError> {
        let found = self
            .duels
            .iter()
            .find(|(_, d)| &d.challenged == challenged);
        match found {
            Some((_, duel)) if duel.accepted => Err(WagerError::AlreadyAccepted),
            Some((id, duel)) => Ok((*id, duel)),
            None => Err(WagerError::NoSuchWager),
        }
    }

    /// Flip a proposed duel to accepted.
    pub fn accept_duel(&mut self, challenged: &ParticipantId) -> Result<DuelId, WagerError> {
        let (id, _) = self.duel_awaiting(challenged)?;
        if let Some(duel) = self.duels.get_mut(&id) {
            duel.accepted = true;
        }
        Ok(id)
    }

    /// The duel this participant is party to, in either role.
    pub fn duel_involving(&self, participant: &ParticipantId) -> Option<(DuelId, &Duel)> {
        self.duels
            .iter()
            .find(|(_, d)| d.involves(participant))
            .map(|(id, d)| (*id, d))
    }

    /// Delete a duel. Safe to call with an id that is already gone.
    pub fn remove_duel(&mut self, id: DuelId) -> Option<Duel> {
        self.duels.remove(&id)
    }

    /// Open a free-for-all and seed its membership. The roster is
    /// filtered down to participants free to join; the initiator enters
    /// accepted with their entry already counted in the pot. Returns the
    /// members to invite.
    pub fn create_ffa(
        &mut self,
        initiator: ParticipantId,
        zone: ZoneId,
        entry: Credits,
        roster: Vec<ParticipantId>,
    ) -> Result<Vec<ParticipantId>, WagerError> {
        if entry <= 0 {
            return Err(WagerError::InvalidAmount);
        }
        if self.ffas.contains_key(&zone) {
            return Err(WagerError::FFAAlreadyActive);
        }
        if self.is_engaged(&initiator) {
            return Err(WagerError::DuplicateWager { who: initiator.to_string() });
        }

        let mut invited: Vec<ParticipantId> = roster
            .into_iter()
            .filter(|p| p != &initiator && !self.is_engaged(p))
            .collect();
        invited.sort();
        invited.dedup();
        if invited.is_empty() {
            return Err(WagerError::NoOtherPlayers);
        }

        let mut contestants: HashMap<ParticipantId, Contestant> = invited
            .iter()
            .cloned()
            .map(|p| (p, Contestant::default()))
            .collect();
        contestants.insert(initiator, Contestant { accepted: true, eliminated: false });

        self.ffas.insert(
            zone.clone(),
            FreeForAll {
                zone,
                entry,
                pot: entry,
                contestants,
                created_at: Utc::now(),
            },
        );
        Ok(invited)
    }

    /// The zone of the free-for-all this participant belongs to. Scans
    /// every tournament: members keep their stake even after leaving the
    /// zone, so lookups can never go through current position.
    pub fn ffa_zone_of(&self, participant: &ParticipantId) -> Option<ZoneId> {
        self.ffas
            .values()
            .find(|f| f.contestants.contains_key(participant))
            .map(|f| f.zone.clone())
    }

    /// Zone, entry fee, and acceptance state of this participant's
    /// free-for-all membership, if any.
    pub fn ffa_membership(&self, participant: &ParticipantId) -> Option<(ZoneId, Credits, bool)> {
        self.ffas.values().find_map(|f| {
            f.contestants
                .get(participant)
                .map(|c| (f.zone.clone(), f.entry, c.accepted))
        })
    }

    /// Accept a free-for-all membership. The caller has already debited
    /// the entry; this flips the contestant and grows the pot. Returns
    /// the zone and the pot after the entry landed.
    pub fn accept_ffa(
        &mut self,
        participant: &ParticipantId,
    ) -> Result<(ZoneId, Credits), WagerError> {
        let ffa = self
            .ffas
            .values_mut()
            .find(|f| f.contestants.contains_key(participant))
            .ok_or(WagerError::NoActiveFFA)?;
        let contestant = ffa
            .contestants
            .get_mut(participant)
            .ok_or(WagerError::NoActiveFFA)?;
        if contestant.accepted {
            return Err(WagerError::AlreadyAccepted);
        }
        contestant.accepted = true;
        ffa.pot += ffa.entry;
        Ok((ffa.zone.clone(), ffa.pot))
    }

    pub fn ffa(&self, zone: &ZoneId) -> Option<&FreeForAll> {
        self.ffas.get(zone)
    }

    pub fn ffa_mut(&mut self, zone: &ZoneId) -> Option<&mut FreeForAll> {
        self.ffas.get_mut(zone)
    }

    /// Delete a free-for-all. Safe to call with a zone that has none.
    pub fn remove_ffa(&mut self, zone: &ZoneId) -> Option<FreeForAll> {
        self.ffas.remove(zone)
    }

    pub fn duels(&self) -> impl Iterator<Item = (&DuelId, &Duel)> {
        self.duels.iter()
    }

    pub fn ffas(&self) -> impl Iterator<Item = &FreeForAll> {
        self.ffas.values()
    }

    pub fn duel_count(&self) -> usize {
        self.duels.len()
    }

    pub fn ffa_count(&self) -> usize {
        self.ffas.len()
    }

    /// Total credits currently escrowed across every pot.
    pub fn escrow_total(&self) -> Credits {
        self.ffas.values().map(|f| f.pot).sum()
    }
}
