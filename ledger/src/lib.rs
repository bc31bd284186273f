//! ElectionBet Ledger Interfaces
//!
//! Client-side view of the prediction contract: what a submission looks
//! like on the wire, what a recorded ticket holds, and the async traits the
//! submission flow and the ticket view talk to.
//!
//! # Components:
//! - `LedgerSubmitter`: broadcast a prediction, then wait for finalization
//! - `LedgerQuery`: list the tickets of a market
//! - `StakeAmount`: exact decimal stake with base-unit conversion
//! - `InMemoryLedger`: contract simulation with replay and binding checks

pub mod errors;
pub mod memory;
pub mod service;
pub mod types;
pub mod units;

pub use electionbet_commitment::MarketId;
pub use errors::{AmountError, QueryError, QueryResult, SubmissionError, SubmissionResult};
pub use memory::InMemoryLedger;
pub use service::{LedgerQuery, LedgerSubmitter};
pub use types::{Receipt, SubmissionRequest, Ticket, TicketId, TicketStatus, TxReference};
pub use units::{StakeAmount, STAKE_DECIMALS};
