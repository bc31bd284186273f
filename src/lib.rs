//! ElectionBet: Encrypted Election Predictions
//!
//! Root crate that re-exports the ElectionBet components and wires them
//! into a user session.
//!
//! ## Architecture Overview
//!
//! A prediction (candidate + stake) is encrypted on the client, bound to
//! the submitter and market by a commitment, and submitted to the ledger.
//! Nobody, including the platform, can read it until settlement. The
//! submitter can later decrypt and inspect their own tickets.
//!
//! ## Crate Organization
//!
//! - `electionbet-fhe`: encryption adapter contract and relayer lifecycle
//! - `electionbet-commitment`: commitment generator
//! - `electionbet-ledger`: ledger submission/query contracts and tickets
//! - `electionbet-wallet`: validation and the submission state machine
//! - `electionbet-tickets`: per-ticket decryption cache

pub mod session;

pub use electionbet_commitment as commitment;
pub use electionbet_fhe as fhe;
pub use electionbet_ledger as ledger;
pub use electionbet_tickets as tickets;
pub use electionbet_wallet as wallet;

/// ElectionBet version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Deployment defaults
pub mod config {
    pub use electionbet_fhe::{RelayerConfig, RelayerNetwork};
    pub use electionbet_wallet::SubmissionConfig;

    /// Market opened when none is configured
    pub const DEFAULT_MARKET_ID: u64 = 1;

    /// Smallest accepted stake
    pub const DEFAULT_MIN_STAKE: &str = "0.01";

    /// Ledger base units per whole stake unit
    pub const DEFAULT_BASE_UNIT_SCALE: u64 = 1_000_000;

    /// Seconds to wait for a transaction to finalize
    pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

    pub const DEFAULT_STAKE_UNIT: &str = "ETH";
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use electionbet_commitment::{commit, Commitment, MarketId};
    pub use electionbet_fhe::{
        AdapterCell, Address, CiphertextHandle, DecryptionError, EncryptedPayload,
        EncryptionAdapter, EncryptionError, InMemoryRelayer, RelayerConfig, RelayerNetwork,
    };
    pub use electionbet_ledger::{
        InMemoryLedger, LedgerQuery, LedgerSubmitter, StakeAmount, SubmissionError, Ticket,
        TicketStatus,
    };
    pub use electionbet_tickets::{TicketDecryptionCache, TicketDisplay, TicketView};
    pub use electionbet_wallet::{
        CandidateBook, FailureStage, LifecycleError, PredictionForm, PredictionSubmitter,
        SubmissionConfig, SubmissionFailure, SubmissionOutcome, SubmissionPhase, ValidationError,
    };
    pub use crate::session::{PredictionSession, SessionError};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_defaults_agree() {
        let defaults = config::SubmissionConfig::default();
        assert_eq!(defaults.market_id.0, config::DEFAULT_MARKET_ID);
        assert_eq!(defaults.min_stake.to_string(), config::DEFAULT_MIN_STAKE);
        assert_eq!(defaults.base_unit_scale, config::DEFAULT_BASE_UNIT_SCALE);
        assert_eq!(
            defaults.confirmation_timeout,
            Duration::from_secs(config::DEFAULT_CONFIRMATION_TIMEOUT_SECS)
        );
        assert_eq!(defaults.stake_unit, config::DEFAULT_STAKE_UNIT);
    }
}
