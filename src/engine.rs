//! Engine Worker
//!
//! One task owns the registry and processes every command and lifecycle
//! event in arrival order from a bounded queue. Nothing else ever
//! mutates wager state, so there are no per-wager locks and no two
//! settlements can interleave. Callers hold a cloneable handle that
//! enqueues messages; command callers await a oneshot reply.

use crate::commands::{self, Command, ParseError};
use crate::config::EngineConfig;
use crate::directory::Directory;
use crate::errors::WagerError;
use crate::events::LifecycleEvent;
use crate::ledger::Ledger;
use crate::metrics::EngineMetrics;
use crate::notice::{Notice, NoticeBody, NoticeHub};
use crate::registry::WagerRegistry;
use crate::settlement::Settlement;
use crate::types::{Credits, DuelId, ParticipantId, ZoneId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// The worker has stopped and can take no more messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("engine worker is not running")]
pub struct EngineClosed;

/// Answer to one participant command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandReply {
    pub text: String,
    pub rejected: bool,
}

impl CommandReply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into(), rejected: false }
    }

    pub fn rejected(text: impl Into<String>) -> Self {
        Self { text: text.into(), rejected: true }
    }
}

/// Read-only view of all live wagers.
#[derive(Clone, Debug, Serialize)]
pub struct WagerSnapshot {
    pub duels: Vec<DuelSummary>,
    pub ffas: Vec<FfaSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DuelSummary {
    pub id: DuelId,
    pub challenger: ParticipantId,
    pub challenged: ParticipantId,
    pub wager: Credits,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FfaSummary {
    pub zone: ZoneId,
    pub entry: Credits,
    pub pot: Credits,
    pub contestants: Vec<ContestantSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ContestantSummary {
    pub id: ParticipantId,
    pub accepted: bool,
    pub eliminated: bool,
}

/// Messages the worker drains, in arrival order.
enum Inbound {
    Command {
        issuer: ParticipantId,
        line: String,
        reply: oneshot::Sender<CommandReply>,
    },
    Lifecycle(LifecycleEvent),
    Snapshot {
        reply: oneshot::Sender<WagerSnapshot>,
    },
}

/// Cloneable front door to the engine worker.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Inbound>,
    notices: NoticeHub,
    metrics: Arc<EngineMetrics>,
}

impl EngineHandle {
    /// Run one chat line for a participant and await the reply.
    pub async fn command(
        &self,
        issuer: ParticipantId,
        line: impl Into<String>,
    ) -> Result<CommandReply, EngineClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Inbound::Command { issuer, line: line.into(), reply: reply_tx })
            .await
            .map_err(|_| EngineClosed)?;
        reply_rx.await.map_err(|_| EngineClosed)
    }

    /// Queue a host lifecycle event.
    pub async fn lifecycle(&self, event: LifecycleEvent) -> Result<(), EngineClosed> {
        self.tx
            .send(Inbound::Lifecycle(event))
            .await
            .map_err(|_| EngineClosed)
    }

    /// A participant's ship was destroyed.
    pub async fn notify_death(
        &self,
        victim: ParticipantId,
        killer: Option<ParticipantId>,
    ) -> Result<(), EngineClosed> {
        self.lifecycle(LifecycleEvent::Death { victim, killer }).await
    }

    /// A participant dropped from the server.
    pub async fn notify_disconnect(&self, participant: ParticipantId) -> Result<(), EngineClosed> {
        self.lifecycle(LifecycleEvent::Disconnect { participant }).await
    }

    /// A participant docked at a base.
    pub async fn notify_dock(&self, participant: ParticipantId) -> Result<(), EngineClosed> {
        self.lifecycle(LifecycleEvent::Dock { participant }).await
    }

    /// A participant opened the character menu.
    pub async fn notify_menu_open(&self, participant: ParticipantId) -> Result<(), EngineClosed> {
        self.lifecycle(LifecycleEvent::MenuOpen { participant }).await
    }

    /// Fetch a consistent snapshot of all live wagers.
    pub async fn snapshot(&self) -> Result<WagerSnapshot, EngineClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Inbound::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| EngineClosed)?;
        reply_rx.await.map_err(|_| EngineClosed)
    }

    /// Subscribe to the outbound notice stream.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        Arc::clone(&self.metrics)
    }
}

/// The single-writer worker. Owns the registry for its whole life.
pub struct Engine {
    registry: WagerRegistry,
    ledger: Arc<dyn Ledger>,
    directory: Arc<dyn Directory>,
    notices: NoticeHub,
    metrics: Arc<EngineMetrics>,
    refund_on_void: bool,
    rx: mpsc::Receiver<Inbound>,
}

impl Engine {
    /// Build a worker and its handle.
    pub fn new(
        config: &EngineConfig,
        ledger: Arc<dyn Ledger>,
        directory: Arc<dyn Directory>,
    ) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let notices = NoticeHub::new(config.notice_capacity);
        let metrics = Arc::new(EngineMetrics::new());

        let engine = Self {
            registry: WagerRegistry::new(),
            ledger,
            directory,
            notices: notices.clone(),
            metrics: Arc::clone(&metrics),
            refund_on_void: config.refund_on_void,
            rx,
        };
        let handle = EngineHandle { tx, notices, metrics };
        (engine, handle)
    }

    /// Build, spawn, and return the handle plus the worker's join handle.
    pub fn spawn(
        config: &EngineConfig,
        ledger: Arc<dyn Ledger>,
        directory: Arc<dyn Directory>,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (engine, handle) = Self::new(config, ledger, directory);
        let join = tokio::spawn(engine.run());
        (handle, join)
    }

    /// Drain the queue until every handle is gone.
    pub async fn run(mut self) {
        info!("wager engine worker started");
        while let Some(msg) = self.rx.recv().await {
            match msg {
                Inbound::Command { issuer, line, reply } => {
                    let out = self.handle_command(&issuer, &line);
                    self.metrics.record_command(out.rejected);
                    let _ = reply.send(out);
                }
                Inbound::Lifecycle(event) => {
                    self.metrics.record_lifecycle_event();
                    self.handle_lifecycle(event);
                }
                Inbound::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
            }
            self.metrics.set_escrow_held(self.registry.escrow_total());
        }
        info!("wager engine worker stopped");
    }

    fn settlement(&mut self) -> Settlement<'_> {
        Settlement {
            registry: &mut self.registry,
            ledger: self.ledger.as_ref(),
            directory: self.directory.as_ref(),
            notices: &self.notices,
            metrics: self.metrics.as_ref(),
            refund_on_void: self.refund_on_void,
        }
    }

    fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        let participant = event.participant().clone();
        debug!("lifecycle event {} for {}", event.kind(), participant);
        let mut settlement = self.settlement();
        settlement.settle_duel_against(&participant);
        settlement.eliminate_from_ffa(&participant);
    }

    fn handle_command(&mut self, issuer: &ParticipantId, line: &str) -> CommandReply {
        debug!("command from {}: {}", issuer, line);
        match commands::parse(line) {
            Ok(Command::Duel { amount }) => self.cmd_duel(issuer, amount),
            Ok(Command::AcceptDuel) => self.cmd_accept_duel(issuer),
            Ok(Command::Ffa { amount }) => self.cmd_ffa(issuer, amount),
            Ok(Command::AcceptFfa) => self.cmd_accept_ffa(issuer),
            Ok(Command::Cancel) => self.cmd_cancel(issuer),
            Err(ParseError::Usage(usage)) => CommandReply::rejected(usage),
            Err(ParseError::Unknown) => CommandReply::rejected("Unknown command."),
        }
    }

    /// Turn a rejection into its reply, swapping raw ids for display
    /// names where the error carries a participant.
    fn reject(&self, err: WagerError) -> CommandReply {
        debug!("command rejected: {}", err.code());
        let err = match err {
            WagerError::DuplicateWager { who } => {
                let id = ParticipantId::from(who);
                WagerError::DuplicateWager { who: self.directory.name_or_id(&id) }
            }
            other => other,
        };
        CommandReply::rejected(err.to_string())
    }

    fn cmd_duel(&mut self, issuer: &ParticipantId, amount: Credits) -> CommandReply {
        let presence = self.directory.presence(issuer);
        if !presence.is_in_space() {
            return CommandReply::rejected("You must be in space to issue a challenge.");
        }

        let Some(target) = self.directory.selected_target(issuer) else {
            return self.reject(WagerError::InvalidTarget);
        };
        if &target == issuer || !self.directory.presence(&target).is_in_space() {
            return self.reject(WagerError::InvalidTarget);
        }

        if amount < 0 {
            return self.reject(WagerError::InvalidAmount);
        }

        match self.ledger.balance(issuer) {
            Ok(balance) if balance >= amount => {}
            Ok(_) => {
                return self.reject(WagerError::InsufficientFunds {
                    who: self.directory.name_or_id(issuer),
                })
            }
            Err(e) => return self.reject(WagerError::LedgerFailure(e)),
        }

        if let Err(e) = self
            .registry
            .create_duel(issuer.clone(), target.clone(), amount)
        {
            return self.reject(e);
        }

        let challenger = self.directory.name_or_id(issuer);
        let challenged = self.directory.name_or_id(&target);
        if let Some(zone) = presence.zone() {
            self.notices.to_zone(
                zone,
                NoticeBody::ChallengeIssued {
                    challenger: challenger.clone(),
                    challenged,
                    wager: amount,
                },
            );
        }
        self.notices.to_participant(
            &target,
            NoticeBody::DuelInvite { challenger, wager: amount },
        );

        info!("{} challenged {} to a duel for {} credits", issuer, target, amount);
        self.metrics.record_duel_created();
        CommandReply::ok("Challenge issued. Waiting for a response.")
    }

    fn cmd_accept_duel(&mut self, issuer: &ParticipantId) -> CommandReply {
        let presence = self.directory.presence(issuer);
        if !presence.is_in_space() {
            return CommandReply::rejected("You must be in space to accept a duel.");
        }

        let (challenger, wager) = match self.registry.duel_awaiting(issuer) {
            Ok((_, duel)) => (duel.challenger.clone(), duel.wager),
            Err(e) => return self.reject(e),
        };

        // Both sides re-checked: the challenger may have spent down
        // since proposing.
        for party in [issuer, &challenger] {
            match self.ledger.balance(party) {
                Ok(balance) if balance >= wager => {}
                Ok(_) => {
                    return self.reject(WagerError::InsufficientFunds {
                        who: self.directory.name_or_id(party),
                    })
                }
                Err(e) => return self.reject(WagerError::LedgerFailure(e)),
            }
        }

        if let Err(e) = self.registry.accept_duel(issuer) {
            return self.reject(e);
        }

        if let Some(zone) = presence.zone() {
            self.notices.to_zone(
                zone,
                NoticeBody::ChallengeAccepted {
                    challenger: self.directory.name_or_id(&challenger),
                    challenged: self.directory.name_or_id(issuer),
                    wager,
                },
            );
        }

        info!("{} accepted the duel against {} for {} credits", issuer, challenger, wager);
        CommandReply::ok("Duel accepted. Good luck.")
    }

    fn cmd_ffa(&mut self, issuer: &ParticipantId, amount: Credits) -> CommandReply {
        let presence = self.directory.presence(issuer);
        let Some(zone) = presence.zone().filter(|_| presence.is_in_space()).cloned() else {
            return CommandReply::rejected("You must be in space to start a free-for-all.");
        };

        if amount <= 0 {
            return self.reject(WagerError::InvalidAmount);
        }

        match self.ledger.balance(issuer) {
            Ok(balance) if balance >= amount => {}
            Ok(_) => {
                return self.reject(WagerError::InsufficientFunds {
                    who: self.directory.name_or_id(issuer),
                })
            }
            Err(e) => return self.reject(WagerError::LedgerFailure(e)),
        }

        let roster = self.directory.zone_roster(&zone);
        let invited = match self
            .registry
            .create_ffa(issuer.clone(), zone.clone(), amount, roster)
        {
            Ok(invited) => invited,
            Err(e) => return self.reject(e),
        };

        // Escrow the initiator's entry. If the ledger refuses now the
        // tournament must not stand.
        if let Err(e) = self.ledger.adjust(issuer, -amount) {
            self.registry.remove_ffa(&zone);
            self.metrics.record_ledger_failure();
            return self.reject(WagerError::LedgerFailure(e));
        }

        let initiator = self.directory.name_or_id(issuer);
        for member in &invited {
            self.notices.to_participant(
                member,
                NoticeBody::FfaInvite { initiator: initiator.clone(), entry: amount },
            );
        }
        self.notices
            .to_participant(issuer, NoticeBody::EntryDebited { entry: amount });

        info!(
            "{} started a free-for-all in {} for {} credits, {} invited",
            issuer,
            zone,
            amount,
            invited.len()
        );
        self.metrics.record_ffa_created();
        CommandReply::ok("Challenge issued. Waiting for others to accept.")
    }

    fn cmd_accept_ffa(&mut self, issuer: &ParticipantId) -> CommandReply {
        let presence = self.directory.presence(issuer);
        if !presence.is_in_space() {
            return CommandReply::rejected("You must be in space to join a free-for-all.");
        }

        let Some((_, entry, accepted)) = self.registry.ffa_membership(issuer) else {
            return self.reject(WagerError::NoActiveFFA);
        };
        if accepted {
            return self.reject(WagerError::AlreadyAccepted);
        }

        match self.ledger.balance(issuer) {
            Ok(balance) if balance >= entry => {}
            Ok(_) => {
                return self.reject(WagerError::InsufficientFunds {
                    who: self.directory.name_or_id(issuer),
                })
            }
            Err(e) => return self.reject(WagerError::LedgerFailure(e)),
        }

        if let Err(e) = self.ledger.adjust(issuer, -entry) {
            self.metrics.record_ledger_failure();
            return self.reject(WagerError::LedgerFailure(e));
        }
        match self.registry.accept_ffa(issuer) {
            Ok((zone, pot)) => {
                self.notices
                    .to_participant(issuer, NoticeBody::EntryDebited { entry });
                self.notices.to_zone(
                    &zone,
                    NoticeBody::FfaJoined {
                        participant: self.directory.name_or_id(issuer),
                        pot,
                    },
                );
                info!("{} joined the free-for-all in {}, pot now {}", issuer, zone, pot);
                CommandReply::ok("You have joined the free-for-all.")
            }
            Err(e) => {
                // Membership was verified just above; refund if the
                // flip still failed.
                let _ = self.ledger.adjust(issuer, entry);
                self.reject(e)
            }
        }
    }

    fn cmd_cancel(&mut self, issuer: &ParticipantId) -> CommandReply {
        let mut settlement = self.settlement();
        let duel = settlement.settle_duel_against(issuer);
        let ffa = settlement.eliminate_from_ffa(issuer);
        if duel || ffa {
            CommandReply::ok("Wager cancelled.")
        } else {
            CommandReply::ok("You have no active wager.")
        }
    }

    fn snapshot(&self) -> WagerSnapshot {
        let mut duels: Vec<DuelSummary> = self
            .registry
            .duels()
            .map(|(id, d)| DuelSummary {
                id: *id,
                challenger: d.challenger.clone(),
                challenged: d.challenged.clone(),
                wager: d.wager,
                accepted: d.accepted,
                created_at: d.created_at,
            })
            .collect();
        duels.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut ffas: Vec<FfaSummary> = self
            .registry
            .ffas()
            .map(|f| {
                let mut contestants: Vec<ContestantSummary> = f
                    .contestants
                    .iter()
                    .map(|(id, c)| ContestantSummary {
                        id: id.clone(),
                        accepted: c.accepted,
                        eliminated: c.eliminated,
                    })
                    .collect();
                contestants.sort_by(|a, b| a.id.cmp(&b.id));
                FfaSummary {
                    zone: f.zone.clone(),
                    entry: f.entry,
                    pot: f.pot,
                    contestants,
                    created_at: f.created_at,
                }
            })
            .collect();
        ffas.sort_by(|a, b| a.zone.cmp(&b.zone));

        WagerSnapshot { duels, ffas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryDirectory, PlayerRecord};
    use crate::ledger::InMemoryLedger;
    use crate::types::Presence;

    fn p(id: &str) -> ParticipantId {
        ParticipantId::from(id)
    }

    fn zone(id: &str) -> ZoneId {
        ZoneId::from(id)
    }

    struct Harness {
        handle: EngineHandle,
        ledger: Arc<InMemoryLedger>,
        directory: Arc<InMemoryDirectory>,
    }

    fn harness() -> Harness {
        let ledger = Arc::new(InMemoryLedger::new());
        let directory = Arc::new(InMemoryDirectory::new());
        for id in ["trent", "king", "juni"] {
            ledger.set_balance(p(id), 10_000);
            directory.upsert(
                p(id),
                PlayerRecord {
                    name: id.to_string(),
                    presence: Presence::InSpace { zone: zone("omega-5") },
                    target: None,
                },
            );
        }
        let (handle, _join) = Engine::spawn(
            &EngineConfig::default(),
            ledger.clone() as Arc<dyn Ledger>,
            directory.clone() as Arc<dyn Directory>,
        );
        Harness { handle, ledger, directory }
    }

    #[tokio::test]
    async fn duel_flows_from_challenge_to_death() {
        let h = harness();
        h.directory.set_target(&p("trent"), Some(p("king")));

        let reply = h.handle.command(p("trent"), "/duel 5000").await.unwrap();
        assert!(!reply.rejected, "{}", reply.text);

        let reply = h.handle.command(p("king"), "/acceptduel").await.unwrap();
        assert!(!reply.rejected, "{}", reply.text);

        h.handle.notify_death(p("king"), Some(p("trent"))).await.unwrap();

        let snapshot = h.handle.snapshot().await.unwrap();
        assert!(snapshot.duels.is_empty());
        assert_eq!(h.ledger.balance(&p("trent")).unwrap(), 15_000);
        assert_eq!(h.ledger.balance(&p("king")).unwrap(), 5_000);
    }

    #[tokio::test]
    async fn duel_requires_a_valid_target() {
        let h = harness();

        let reply = h.handle.command(p("trent"), "/duel 100").await.unwrap();
        assert!(reply.rejected);
        assert_eq!(reply.text, "You must select a valid player target.");

        h.directory.set_target(&p("trent"), Some(p("trent")));
        let reply = h.handle.command(p("trent"), "/duel 100").await.unwrap();
        assert!(reply.rejected);

        // Docked targets cannot be challenged.
        h.directory.set_target(&p("trent"), Some(p("king")));
        h.directory.set_presence(&p("king"), Presence::Docked { zone: zone("omega-5") });
        let reply = h.handle.command(p("trent"), "/duel 100").await.unwrap();
        assert!(reply.rejected);
        assert_eq!(reply.text, "You must select a valid player target.");
    }

    #[tokio::test]
    async fn ffa_flows_from_start_to_payout() {
        let h = harness();

        let reply = h.handle.command(p("trent"), "/ffa 1000").await.unwrap();
        assert!(!reply.rejected, "{}", reply.text);
        assert_eq!(h.ledger.balance(&p("trent")).unwrap(), 9_000);

        for id in ["king", "juni"] {
            let reply = h.handle.command(p(id), "/acceptffa").await.unwrap();
            assert!(!reply.rejected, "{}", reply.text);
        }

        h.handle.notify_death(p("king"), None).await.unwrap();
        h.handle.notify_dock(p("juni")).await.unwrap();

        let snapshot = h.handle.snapshot().await.unwrap();
        assert!(snapshot.ffas.is_empty());
        assert_eq!(h.ledger.balance(&p("trent")).unwrap(), 12_000);
        assert_eq!(h.ledger.balance(&p("king")).unwrap(), 9_000);
        assert_eq!(h.ledger.balance(&p("juni")).unwrap(), 9_000);
    }

    #[tokio::test]
    async fn snapshots_expose_live_state() {
        let h = harness();
        h.directory.set_target(&p("trent"), Some(p("king")));
        h.handle.command(p("trent"), "/duel 250").await.unwrap();

        let snapshot = h.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.duels.len(), 1);
        let duel = &snapshot.duels[0];
        assert_eq!(duel.challenger, p("trent"));
        assert_eq!(duel.challenged, p("king"));
        assert_eq!(duel.wager, 250);
        assert!(!duel.accepted);
    }

    #[tokio::test]
    async fn unknown_commands_and_usage_problems_reply() {
        let h = harness();

        let reply = h.handle.command(p("trent"), "/bounty 100").await.unwrap();
        assert_eq!(reply.text, "Unknown command.");
        assert!(reply.rejected);

        let reply = h.handle.command(p("trent"), "/duel lots").await.unwrap();
        assert_eq!(reply.text, "Usage: /duel <amount>, e.g. /duel 5000");

        let metrics = h.handle.metrics().snapshot();
        assert_eq!(metrics.commands_processed, 2);
        assert_eq!(metrics.commands_rejected, 2);
    }

    #[tokio::test]
    async fn cancel_without_a_wager_is_a_polite_no_op() {
        let h = harness();
        let reply = h.handle.command(p("trent"), "/cancel").await.unwrap();
        assert!(!reply.rejected);
        assert_eq!(reply.text, "You have no active wager.");
    }

    #[tokio::test]
    async fn escrow_gauge_follows_the_pots() {
        let h = harness();
        h.handle.command(p("trent"), "/ffa 1000").await.unwrap();
        h.handle.command(p("king"), "/acceptffa").await.unwrap();

        // Serialize behind the queue before reading the gauge.
        h.handle.snapshot().await.unwrap();
        assert_eq!(h.handle.metrics().snapshot().escrow_held, 2_000);
    }
}
