//! Ledger error types

use thiserror::Error;

/// Errors from the ledger submission service
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// Wallet or ledger refused the transaction before it was sent
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// Transaction could not be delivered to the network
    #[error("Broadcast failed: {0}")]
    BroadcastFailed(String),

    /// No finalization signal arrived in time
    #[error("Confirmation timeout")]
    ConfirmationTimeout,

    /// Transaction was included but execution failed
    #[error("Transaction reverted: {0}")]
    Reverted(String),
}

/// Errors from the ledger query service
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Errors parsing or converting stake amounts
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,

    #[error("Amount is not a number: {0}")]
    Malformed(String),

    #[error("Amount is negative")]
    Negative,

    #[error("Amount is below the smallest representable unit")]
    BelowResolution,

    #[error("Amount overflows")]
    Overflow,

    #[error("Invalid base unit scale: {0}")]
    InvalidScale(u64),
}

/// Result type for submission operations
pub type SubmissionResult<T> = Result<T, SubmissionError>;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
