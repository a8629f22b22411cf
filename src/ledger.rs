//! Currency Ledger Adapter
//!
//! The engine never stores currency. Every balance inspection and every
//! credit movement goes through this seam, which the host implements over
//! its own currency store. An in-memory implementation backs the
//! stand-alone binary and the test suite.

use crate::errors::LedgerError;
use crate::types::{Credits, ParticipantId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Synchronous view of the host's currency store.
///
/// Calls are made from the single engine worker, so implementations are
/// expected to answer quickly and must not block on the engine itself.
pub trait Ledger: Send + Sync {
    /// Current balance of a participant.
    fn balance(&self, participant: &ParticipantId) -> Result<Credits, LedgerError>;

    /// Apply a signed delta to a participant's balance.
    ///
    /// The host's store permits negative balances; overdraft protection
    /// is the engine's job via balance checks before escrow.
    fn adjust(&self, participant: &ParticipantId, delta: Credits) -> Result<(), LedgerError>;
}

/// In-memory ledger used by the binary (fed over the gateway) and tests.
#[derive(Default)]
pub struct InMemoryLedger {
    accounts: RwLock<HashMap<ParticipantId, Credits>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite an account balance.
    pub fn set_balance(&self, participant: ParticipantId, amount: Credits) {
        self.accounts
            .write()
            .expect("ledger lock poisoned")
            .insert(participant, amount);
    }

    /// Drop an account entirely. Subsequent calls fail with UnknownAccount.
    pub fn remove_account(&self, participant: &ParticipantId) {
        self.accounts
            .write()
            .expect("ledger lock poisoned")
            .remove(participant);
    }
}

impl Ledger for InMemoryLedger {
    fn balance(&self, participant: &ParticipantId) -> Result<Credits, LedgerError> {
        self.accounts
            .read()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".to_string()))?
            .get(participant)
            .copied()
            .ok_or_else(|| LedgerError::UnknownAccount(participant.to_string()))
    }

    fn adjust(&self, participant: &ParticipantId, delta: Credits) -> Result<(), LedgerError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".to_string()))?;
        match accounts.get_mut(participant) {
            Some(balance) => {
                *balance += delta;
                Ok(())
            }
            None => Err(LedgerError::UnknownAccount(participant.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_moves_credits_both_ways() {
        let ledger = InMemoryLedger::new();
        let p = ParticipantId::from("trent");
        ledger.set_balance(p.clone(), 1_000);

        ledger.adjust(&p, 250).unwrap();
        assert_eq!(ledger.balance(&p).unwrap(), 1_250);

        ledger.adjust(&p, -2_000).unwrap();
        assert_eq!(ledger.balance(&p).unwrap(), -750);
    }

    #[test]
    fn unknown_accounts_are_rejected() {
        let ledger = InMemoryLedger::new();
        let ghost = ParticipantId::from("ghost");

        assert_eq!(
            ledger.balance(&ghost),
            Err(LedgerError::UnknownAccount("ghost".to_string()))
        );
        assert_eq!(
            ledger.adjust(&ghost, 10),
            Err(LedgerError::UnknownAccount("ghost".to_string()))
        );
    }

    #[test]
    fn removed_accounts_stop_answering() {
        let ledger = InMemoryLedger::new();
        let p = ParticipantId::from("juni");
        ledger.set_balance(p.clone(), 50);
        ledger.remove_account(&p);
        assert!(ledger.balance(&p).is_err());
    }
}
