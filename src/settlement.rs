//! Settlement
//!
//! Drives wagers to their terminal states: duel resolution and
//! cancellation, free-for-all elimination, completion, and voiding.
//! Every termination deletes its entity in the same step. A ledger
//! failure mid-settlement is logged and counted, and the entity is
//! still deleted, so no wager ever survives with funds in an unknown
//! state.

use crate::directory::Directory;
use crate::ledger::Ledger;
use crate::metrics::EngineMetrics;
use crate::notice::{NoticeBody, NoticeHub};
use crate::registry::WagerRegistry;
use crate::types::{Credits, ParticipantId, ZoneId};
use tracing::{info, warn};

/// One settlement pass over the registry. Borrowed fresh from the engine
/// for each command or lifecycle event; holds no state of its own.
pub struct Settlement<'a> {
    pub registry: &'a mut WagerRegistry,
    pub ledger: &'a dyn Ledger,
    pub directory: &'a dyn Directory,
    pub notices: &'a NoticeHub,
    pub metrics: &'a EngineMetrics,
    pub refund_on_void: bool,
}

impl<'a> Settlement<'a> {
    /// Terminate the duel involving `participant`, if any.
    ///
    /// Accepted duels resolve in the opponent's favor: leaving is
    /// forfeiting. Proposed duels are cancelled with no money moved.
    /// Returns true if a duel was terminated.
    pub fn settle_duel_against(&mut self, participant: &ParticipantId) -> bool {
        let Some((id, duel)) = self.registry.duel_involving(participant) else {
            return false;
        };
        let duel = duel.clone();

        if duel.accepted {
            let Some(winner) = duel.opponent_of(participant).cloned() else {
                return false;
            };
            if duel.wager > 0 {
                self.apply_ledger(&winner, duel.wager);
                self.apply_ledger(participant, -duel.wager);
            }

            let body = NoticeBody::DuelResolved {
                winner: self.directory.name_or_id(&winner),
                loser: self.directory.name_or_id(participant),
                wager: duel.wager,
            };
            // Announced where the winner is; direct to both if the
            // winner has no zone any more.
            match self.directory.presence(&winner).zone() {
                Some(zone) => self.notices.to_zone(zone, body),
                None => {
                    self.notices.to_participant(&winner, body.clone());
                    self.notices.to_participant(participant, body);
                }
            }

            info!(
                "duel resolved: {} beat {} for {} credits",
                winner, participant, duel.wager
            );
            self.metrics.record_duel_resolved();
        } else {
            self.notices.to_participant(&duel.challenger, NoticeBody::DuelCancelled);
            self.notices.to_participant(&duel.challenged, NoticeBody::DuelCancelled);
            info!(
                "duel cancelled before acceptance: {} vs {}",
                duel.challenger, duel.challenged
            );
            self.metrics.record_duel_cancelled();
        }

        self.registry.remove_duel(id);
        true
    }

    /// Knock `participant` out of their free-for-all, if they are in one.
    ///
    /// Accepted contestants are eliminated (announced, then the
    /// tournament is checked for completion). Unaccepted members are
    /// dropped from the books silently with no completion check.
    /// Returns true if any bookkeeping changed.
    pub fn eliminate_from_ffa(&mut self, participant: &ParticipantId) -> bool {
        let Some(zone) = self.registry.ffa_zone_of(participant) else {
            return false;
        };
        let Some(ffa) = self.registry.ffa_mut(&zone) else {
            return false;
        };
        let Some(contestant) = ffa.contestants.get_mut(participant) else {
            return false;
        };

        if !contestant.accepted {
            ffa.contestants.remove(participant);
            return true;
        }
        if contestant.eliminated {
            return false;
        }
        contestant.eliminated = true;

        let name = self.directory.name_or_id(participant);
        self.notices.to_zone(&zone, NoticeBody::FfaEliminated { participant: name });
        info!("{} knocked out of the free-for-all in {}", participant, zone);

        self.evaluate_ffa(&zone);
        true
    }

    /// Check a free-for-all for completion after an elimination.
    fn evaluate_ffa(&mut self, zone: &ZoneId) {
        let (standing, pot, entry, paid_in) = {
            let Some(ffa) = self.registry.ffa(zone) else {
                return;
            };
            let standing: Vec<ParticipantId> = ffa.standing().cloned().collect();
            let paid_in: Vec<ParticipantId> = ffa
                .contestants
                .iter()
                .filter(|(_, c)| c.accepted)
                .map(|(p, _)| p.clone())
                .collect();
            (standing, ffa.pot, ffa.entry, paid_in)
        };

        match standing.as_slice() {
            [winner] => {
                let winner = winner.clone();
                self.apply_ledger(&winner, pot);
                let body = NoticeBody::FfaWon {
                    winner: self.directory.name_or_id(&winner),
                    pot,
                };
                self.notices.to_zone(zone, body);
                info!(
                    "free-for-all in {} won by {}, pot {} credits",
                    zone, winner, pot
                );
                self.metrics.record_ffa_resolved();
                self.registry.remove_ffa(zone);
            }
            [] => {
                if self.refund_on_void {
                    for member in &paid_in {
                        self.apply_ledger(member, entry);
                    }
                }
                self.notices.to_zone(zone, NoticeBody::FfaVoided);
                info!(
                    "free-for-all in {} voided with nobody standing, pot {} credits",
                    zone, pot
                );
                self.metrics.record_ffa_voided();
                self.registry.remove_ffa(zone);
            }
            _ => {}
        }
    }

    /// Move credits, containing failures: a refused adjustment is logged
    /// and counted but never aborts the settlement in progress.
    fn apply_ledger(&self, participant: &ParticipantId, delta: Credits) {
        if let Err(e) = self.ledger.adjust(participant, delta) {
            warn!(
                "ledger adjustment of {} for {} failed during settlement: {}",
                delta, participant, e
            );
            self.metrics.record_ledger_failure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryDirectory, PlayerRecord};
    use crate::errors::LedgerError;
    use crate::ledger::InMemoryLedger;
    use crate::notice::{Audience, Notice};
    use crate::types::Presence;
    use tokio::sync::broadcast;

    struct Fixture {
        registry: WagerRegistry,
        ledger: InMemoryLedger,
        directory: InMemoryDirectory,
        notices: NoticeHub,
        metrics: EngineMetrics,
        rx: broadcast::Receiver<Notice>,
    }

    fn p(id: &str) -> ParticipantId {
        ParticipantId::from(id)
    }

    fn zone(id: &str) -> ZoneId {
        ZoneId::from(id)
    }

    fn fixture() -> Fixture {
        let notices = NoticeHub::new(64);
        let rx = notices.subscribe();
        let directory = InMemoryDirectory::new();
        for id in ["trent", "king", "juni", "orillion"] {
            directory.upsert(
                p(id),
                PlayerRecord {
                    name: id.to_string(),
                    presence: Presence::InSpace { zone: zone("omega-5") },
                    target: None,
                },
            );
        }
        Fixture {
            registry: WagerRegistry::new(),
            ledger: InMemoryLedger::new(),
            directory,
            notices,
            metrics: EngineMetrics::new(),
            rx,
        }
    }

    fn settlement<'a>(f: &'a mut Fixture, refund_on_void: bool) -> Settlement<'a> {
        Settlement {
            registry: &mut f.registry,
            ledger: &f.ledger,
            directory: &f.directory,
            notices: &f.notices,
            metrics: &f.metrics,
            refund_on_void,
        }
    }

    fn drain(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    #[test]
    fn accepted_duel_resolves_for_the_survivor() {
        let mut f = fixture();
        f.ledger.set_balance(p("trent"), 10_000);
        f.ledger.set_balance(p("king"), 10_000);
        f.registry.create_duel(p("trent"), p("king"), 5_000).unwrap();
        f.registry.accept_duel(&p("king")).unwrap();

        assert!(settlement(&mut f, false).settle_duel_against(&p("king")));

        assert_eq!(f.ledger.balance(&p("trent")).unwrap(), 15_000);
        assert_eq!(f.ledger.balance(&p("king")).unwrap(), 5_000);
        assert!(f.registry.duel_involving(&p("trent")).is_none());

        let notices = drain(&mut f.rx);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].audience, Audience::Zone { zone: zone("omega-5") });
        assert_eq!(notices[0].text(), "trent has won a duel against king for 5000 credits.");
        assert_eq!(f.metrics.snapshot().duels_resolved, 1);
    }

    #[test]
    fn proposed_duel_cancels_with_no_money_moved() {
        let mut f = fixture();
        f.ledger.set_balance(p("trent"), 10_000);
        f.ledger.set_balance(p("king"), 10_000);
        f.registry.create_duel(p("trent"), p("king"), 5_000).unwrap();

        assert!(settlement(&mut f, false).settle_duel_against(&p("trent")));

        assert_eq!(f.ledger.balance(&p("trent")).unwrap(), 10_000);
        assert_eq!(f.ledger.balance(&p("king")).unwrap(), 10_000);

        let notices = drain(&mut f.rx);
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.text() == "Duel cancelled."));
        assert_eq!(f.metrics.snapshot().duels_cancelled, 1);
    }

    #[test]
    fn zero_wager_duel_resolves_without_ledger_calls() {
        let mut f = fixture();
        // No accounts exist, so any ledger call would fail and count.
        f.registry.create_duel(p("trent"), p("king"), 0).unwrap();
        f.registry.accept_duel(&p("king")).unwrap();

        assert!(settlement(&mut f, false).settle_duel_against(&p("trent")));

        assert_eq!(f.metrics.snapshot().ledger_failures, 0);
        let notices = drain(&mut f.rx);
        assert_eq!(notices[0].text(), "king has won a duel against trent for 0 credits.");
    }

    #[test]
    fn duel_resolution_reaches_both_parties_when_winner_is_offline() {
        let mut f = fixture();
        f.ledger.set_balance(p("trent"), 1_000);
        f.ledger.set_balance(p("king"), 1_000);
        f.registry.create_duel(p("trent"), p("king"), 100).unwrap();
        f.registry.accept_duel(&p("king")).unwrap();
        f.directory.set_presence(&p("trent"), Presence::Offline);

        // King disconnects; offline Trent still wins.
        assert!(settlement(&mut f, false).settle_duel_against(&p("king")));

        let notices = drain(&mut f.rx);
        let audiences: Vec<&Audience> = notices.iter().map(|n| &n.audience).collect();
        assert!(audiences.contains(&&Audience::Participant { id: p("trent") }));
        assert!(audiences.contains(&&Audience::Participant { id: p("king") }));
    }

    #[test]
    fn ledger_failure_still_deletes_the_duel() {
        let mut f = fixture();
        // Accounts never created: every adjustment fails.
        f.registry.create_duel(p("trent"), p("king"), 5_000).unwrap();
        f.registry.accept_duel(&p("king")).unwrap();

        assert!(settlement(&mut f, false).settle_duel_against(&p("king")));

        assert!(f.registry.duel_involving(&p("trent")).is_none());
        assert_eq!(f.metrics.snapshot().ledger_failures, 2);
        assert_eq!(f.metrics.snapshot().duels_resolved, 1);
    }

    #[test]
    fn elimination_runs_down_to_a_winner() {
        let mut f = fixture();
        for id in ["trent", "king", "juni"] {
            f.ledger.set_balance(p(id), 1_000);
        }
        f.registry
            .create_ffa(p("trent"), zone("omega-5"), 100, vec![p("king"), p("juni")])
            .unwrap();
        f.ledger.adjust(&p("trent"), -100).unwrap();
        for id in ["king", "juni"] {
            f.registry.accept_ffa(&p(id)).unwrap();
            f.ledger.adjust(&p(id), -100).unwrap();
        }

        let mut s = settlement(&mut f, false);
        assert!(s.eliminate_from_ffa(&p("king")));
        assert!(s.eliminate_from_ffa(&p("juni")));

        // Trent stands alone and takes the 300-credit pot.
        assert_eq!(f.ledger.balance(&p("trent")).unwrap(), 1_200);
        assert_eq!(f.ledger.balance(&p("king")).unwrap(), 900);
        assert!(f.registry.ffa(&zone("omega-5")).is_none());

        let texts: Vec<String> = drain(&mut f.rx).iter().map(|n| n.text()).collect();
        assert_eq!(
            texts,
            vec![
                "king has been knocked out of the free-for-all.".to_string(),
                "juni has been knocked out of the free-for-all.".to_string(),
                "trent has won the free-for-all and receives 300 credits.".to_string(),
            ]
        );
        assert_eq!(f.metrics.snapshot().ffas_resolved, 1);
    }

    #[test]
    fn losing_the_only_accepted_contestant_voids_the_pot() {
        let mut f = fixture();
        f.ledger.set_balance(p("trent"), 1_000);
        // King and Juni are invited but never accept; only Trent's
        // entry is in the pot when Trent goes down.
        f.registry
            .create_ffa(p("trent"), zone("omega-5"), 100, vec![p("king"), p("juni")])
            .unwrap();
        f.ledger.adjust(&p("trent"), -100).unwrap();

        assert!(settlement(&mut f, false).eliminate_from_ffa(&p("trent")));

        // Forfeit policy: the entry stays gone.
        assert_eq!(f.ledger.balance(&p("trent")).unwrap(), 900);
        assert!(f.registry.ffa(&zone("omega-5")).is_none());

        let texts: Vec<String> = drain(&mut f.rx).iter().map(|n| n.text()).collect();
        assert_eq!(
            texts,
            vec![
                "trent has been knocked out of the free-for-all.".to_string(),
                "No one has won the free-for-all.".to_string(),
            ]
        );
        assert_eq!(f.metrics.snapshot().ffas_voided, 1);
    }

    #[test]
    fn void_refunds_entries_when_policy_enabled() {
        let mut f = fixture();
        f.ledger.set_balance(p("trent"), 1_000);
        f.registry
            .create_ffa(p("trent"), zone("omega-5"), 100, vec![p("king"), p("juni")])
            .unwrap();
        f.ledger.adjust(&p("trent"), -100).unwrap();

        settlement(&mut f, true).eliminate_from_ffa(&p("trent"));

        assert_eq!(f.ledger.balance(&p("trent")).unwrap(), 1_000);
        assert!(f.registry.ffa(&zone("omega-5")).is_none());
    }

    #[test]
    fn unaccepted_member_is_dropped_silently() {
        let mut f = fixture();
        f.ledger.set_balance(p("trent"), 1_000);
        f.registry
            .create_ffa(p("trent"), zone("omega-5"), 100, vec![p("king"), p("juni")])
            .unwrap();

        // King never accepted; his dock drops him without a notice and
        // without ending the tournament.
        assert!(settlement(&mut f, false).eliminate_from_ffa(&p("king")));

        assert!(drain(&mut f.rx).is_empty());
        let ffa = f.registry.ffa(&zone("omega-5")).unwrap();
        assert!(!ffa.contestants.contains_key(&p("king")));
        assert_eq!(ffa.pot, 100);
        assert!(!f.registry.is_engaged(&p("king")));
    }

    #[test]
    fn eliminating_the_same_contestant_twice_is_a_no_op() {
        let mut f = fixture();
        f.ledger.set_balance(p("trent"), 1_000);
        f.registry
            .create_ffa(p("trent"), zone("omega-5"), 100, vec![p("king"), p("juni")])
            .unwrap();
        f.registry.accept_ffa(&p("king")).unwrap();
        f.registry.accept_ffa(&p("juni")).unwrap();

        let mut s = settlement(&mut f, false);
        assert!(s.eliminate_from_ffa(&p("king")));
        assert!(!s.eliminate_from_ffa(&p("king")));

        let texts: Vec<String> = drain(&mut f.rx).iter().map(|n| n.text()).collect();
        assert_eq!(texts.len(), 1);
        assert!(f.registry.ffa(&zone("omega-5")).is_some());
    }

    #[test]
    fn participants_with_no_wager_are_untouched() {
        let mut f = fixture();
        let mut s = settlement(&mut f, false);
        assert!(!s.settle_duel_against(&p("trent")));
        assert!(!s.eliminate_from_ffa(&p("trent")));
    }

    struct RefusingLedger;

    impl Ledger for RefusingLedger {
        fn balance(&self, _: &ParticipantId) -> Result<Credits, LedgerError> {
            Err(LedgerError::Unavailable("down".to_string()))
        }
        fn adjust(&self, _: &ParticipantId, _: Credits) -> Result<(), LedgerError> {
            Err(LedgerError::Unavailable("down".to_string()))
        }
    }

    #[test]
    fn ffa_payout_failure_still_deletes_the_tournament() {
        let mut f = fixture();
        f.registry
            .create_ffa(p("trent"), zone("omega-5"), 100, vec![p("king")])
            .unwrap();
        f.registry.accept_ffa(&p("king")).unwrap();

        let refusing = RefusingLedger;
        let mut s = Settlement {
            registry: &mut f.registry,
            ledger: &refusing,
            directory: &f.directory,
            notices: &f.notices,
            metrics: &f.metrics,
            refund_on_void: false,
        };
        assert!(s.eliminate_from_ffa(&p("king")));

        assert!(f.registry.ffa(&zone("omega-5")).is_none());
        assert_eq!(f.metrics.snapshot().ledger_failures, 1);
        assert_eq!(f.metrics.snapshot().ffas_resolved, 1);
    }
}
