//! External ledger interfaces

use async_trait::async_trait;
use electionbet_commitment::MarketId;
use electionbet_fhe::Address;

use crate::errors::{QueryResult, SubmissionResult};
use crate::types::{Receipt, SubmissionRequest, Ticket, TxReference};

/// Transaction submission interface
#[async_trait]
pub trait LedgerSubmitter: Send + Sync {
    /// Send a prediction transaction from `from`.
    ///
    /// Resolves once the network has accepted the transaction, before it is
    /// finalized.
    async fn broadcast(&self, from: &Address, request: &SubmissionRequest) -> SubmissionResult<TxReference>;

    /// Wait until `tx` is finalized or fails
    async fn wait_for_confirmation(&self, tx: &TxReference) -> SubmissionResult<Receipt>;
}

/// Ticket query interface
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// All tickets recorded for `market`, in ledger order
    async fn tickets(&self, market: MarketId) -> QueryResult<Vec<Ticket>>;
}
