//! Error Types
//!
//! Wager rejection reasons and adapter failures. Display strings are the
//! participant-facing reply texts, so every rejection reads as a sentence.

use thiserror::Error;

/// Failure reported by the host's currency ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Why a wager operation was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WagerError {
    #[error("Invalid amount.")]
    InvalidAmount,

    #[error("{who} already has an active wager.")]
    DuplicateWager { who: String },

    #[error("You have no duel requests. To challenge someone, target them and type /duel <amount>.")]
    NoSuchWager,

    #[error("This wager has already been accepted.")]
    AlreadyAccepted,

    #[error("There is no free-for-all for you to accept. To start one, type /ffa <amount>.")]
    NoActiveFFA,

    #[error("There is already a free-for-all in this zone.")]
    FFAAlreadyActive,

    #[error("There are no other players eligible to join.")]
    NoOtherPlayers,

    #[error("{who} does not have enough credits to cover this wager.")]
    InsufficientFunds { who: String },

    #[error("You must select a valid player target.")]
    InvalidTarget,

    #[error("The currency ledger rejected the operation: {0}")]
    LedgerFailure(#[from] LedgerError),
}

impl WagerError {
    /// Short machine-readable code, used in logs and counters.
    pub fn code(&self) -> &'static str {
        match self {
            WagerError::InvalidAmount => "invalid_amount",
            WagerError::DuplicateWager { .. } => "duplicate_wager",
            WagerError::NoSuchWager => "no_such_wager",
            WagerError::AlreadyAccepted => "already_accepted",
            WagerError::NoActiveFFA => "no_active_ffa",
            WagerError::FFAAlreadyActive => "ffa_already_active",
            WagerError::NoOtherPlayers => "no_other_players",
            WagerError::InsufficientFunds { .. } => "insufficient_funds",
            WagerError::InvalidTarget => "invalid_target",
            WagerError::LedgerFailure(_) => "ledger_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_texts_read_as_replies() {
        let err = WagerError::InsufficientFunds { who: "Hovis".to_string() };
        assert_eq!(err.to_string(), "Hovis does not have enough credits to cover this wager.");

        let err = WagerError::DuplicateWager { who: "Orillion".to_string() };
        assert_eq!(err.to_string(), "Orillion already has an active wager.");
    }

    #[test]
    fn ledger_errors_wrap_into_wager_errors() {
        let ledger = LedgerError::UnknownAccount("ghost".to_string());
        let err: WagerError = ledger.clone().into();
        assert_eq!(err, WagerError::LedgerFailure(ledger));
        assert_eq!(err.code(), "ledger_failure");
    }
}
