//! Engine metrics collection

use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

/// Counters for everything the engine processes. Updated by the worker,
/// read by the gateway's status and metrics endpoints.
pub struct EngineMetrics {
    started_at: Instant,
    duels_created: AtomicU64,
    duels_resolved: AtomicU64,
    duels_cancelled: AtomicU64,
    ffas_created: AtomicU64,
    ffas_resolved: AtomicU64,
    ffas_voided: AtomicU64,
    commands_processed: AtomicU64,
    commands_rejected: AtomicU64,
    lifecycle_events: AtomicU64,
    ledger_failures: AtomicU64,
    escrow_held: AtomicI64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub duels_created: u64,
    pub duels_resolved: u64,
    pub duels_cancelled: u64,
    pub ffas_created: u64,
    pub ffas_resolved: u64,
    pub ffas_voided: u64,
    pub commands_processed: u64,
    pub commands_rejected: u64,
    pub lifecycle_events: u64,
    pub ledger_failures: u64,
    pub escrow_held: i64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            duels_created: AtomicU64::new(0),
            duels_resolved: AtomicU64::new(0),
            duels_cancelled: AtomicU64::new(0),
            ffas_created: AtomicU64::new(0),
            ffas_resolved: AtomicU64::new(0),
            ffas_voided: AtomicU64::new(0),
            commands_processed: AtomicU64::new(0),
            commands_rejected: AtomicU64::new(0),
            lifecycle_events: AtomicU64::new(0),
            ledger_failures: AtomicU64::new(0),
            escrow_held: AtomicI64::new(0),
        }
    }

    pub fn record_duel_created(&self) {
        self.duels_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duel_resolved(&self) {
        self.duels_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duel_cancelled(&self) {
        self.duels_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ffa_created(&self) {
        self.ffas_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ffa_resolved(&self) {
        self.ffas_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ffa_voided(&self) {
        self.ffas_voided.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self, rejected: bool) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
        if rejected {
            self.commands_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_lifecycle_event(&self) {
        self.lifecycle_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ledger_failure(&self) {
        self.ledger_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Gauge: total credits currently escrowed across all pots.
    pub fn set_escrow_held(&self, total: i64) {
        self.escrow_held.store(total, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs(),
            duels_created: self.duels_created.load(Ordering::Relaxed),
            duels_resolved: self.duels_resolved.load(Ordering::Relaxed),
            duels_cancelled: self.duels_cancelled.load(Ordering::Relaxed),
            ffas_created: self.ffas_created.load(Ordering::Relaxed),
            ffas_resolved: self.ffas_resolved.load(Ordering::Relaxed),
            ffas_voided: self.ffas_voided.load(Ordering::Relaxed),
            commands_processed: self.commands_processed.load(Ordering::Relaxed),
            commands_rejected: self.commands_rejected.load(Ordering::Relaxed),
            lifecycle_events: self.lifecycle_events.load(Ordering::Relaxed),
            ledger_failures: self.ledger_failures.load(Ordering::Relaxed),
            escrow_held: self.escrow_held.load(Ordering::Relaxed),
        }
    }

    /// Prometheus text exposition of the snapshot.
    pub fn prometheus_text(&self) -> String {
        let s = self.snapshot();
        let mut out = String::with_capacity(1024);

        let counters = [
            ("sidepot_duels_created_total", "Duels proposed", s.duels_created),
            ("sidepot_duels_resolved_total", "Duels settled with a winner", s.duels_resolved),
            ("sidepot_duels_cancelled_total", "Duels cancelled before settlement", s.duels_cancelled),
            ("sidepot_ffas_created_total", "Free-for-alls opened", s.ffas_created),
            ("sidepot_ffas_resolved_total", "Free-for-alls won", s.ffas_resolved),
            ("sidepot_ffas_voided_total", "Free-for-alls ended with no winner", s.ffas_voided),
            ("sidepot_commands_processed_total", "Participant commands processed", s.commands_processed),
            ("sidepot_commands_rejected_total", "Participant commands rejected", s.commands_rejected),
            ("sidepot_lifecycle_events_total", "Host lifecycle events processed", s.lifecycle_events),
            ("sidepot_ledger_failures_total", "Ledger calls that failed", s.ledger_failures),
        ];
        for (name, help, value) in counters {
            out.push_str(&format!("# HELP {name} {help}\n"));
            out.push_str(&format!("# TYPE {name} counter\n"));
            out.push_str(&format!("{name} {value}\n"));
        }

        out.push_str("# HELP sidepot_escrow_held Credits currently escrowed in pots\n");
        out.push_str("# TYPE sidepot_escrow_held gauge\n");
        out.push_str(&format!("sidepot_escrow_held {}\n", s.escrow_held));

        out.push_str("# HELP sidepot_uptime_seconds Seconds since engine start\n");
        out.push_str("# TYPE sidepot_uptime_seconds gauge\n");
        out.push_str(&format!("sidepot_uptime_seconds {}\n", s.uptime_secs));

        out
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
