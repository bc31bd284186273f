//! Submission error taxonomy

use std::fmt;

use electionbet_commitment::CommitmentError;
use electionbet_fhe::EncryptionError;
use electionbet_ledger::{StakeAmount, SubmissionError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input rejected before any cryptographic or network work
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Connect your wallet to place a prediction")]
    NotConnected,

    #[error("Select a candidate before placing a prediction")]
    NoSelection,

    #[error("Enter a valid stake amount ({0})")]
    InvalidAmount(String),

    #[error("Stake is below the minimum of {minimum}")]
    BelowMinimum { minimum: StakeAmount },
}

/// Errors during the submission lifecycle
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Commitment(#[from] CommitmentError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Another prediction is already being submitted")]
    AttemptInFlight,

    #[error("Submission cancelled")]
    Cancelled,

    #[error("Invalid submission config: {0}")]
    InvalidConfig(String),
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Stage an attempt failed in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureStage {
    /// The deployment settings are unusable; nothing the user entered is at fault
    Configuration,
    Validation,
    Encryption,
    Commitment,
    Broadcast,
    Confirmation,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Configuration => write!(f, "configuration"),
            FailureStage::Validation => write!(f, "validation"),
            FailureStage::Encryption => write!(f, "encryption"),
            FailureStage::Commitment => write!(f, "commitment"),
            FailureStage::Broadcast => write!(f, "broadcast"),
            FailureStage::Confirmation => write!(f, "confirmation"),
        }
    }
}

/// Terminal failure of one submission attempt
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Prediction {stage} failed: {error}")]
pub struct SubmissionFailure {
    pub stage: FailureStage,
    pub error: LifecycleError,
}

impl SubmissionFailure {
    pub fn new(stage: FailureStage, error: impl Into<LifecycleError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }

    /// Rejection of a submit issued while another attempt is running.
    ///
    /// Reported at the validation stage since no work was started.
    pub fn in_flight() -> Self {
        Self::new(FailureStage::Validation, LifecycleError::AttemptInFlight)
    }

    pub fn is_cancelled(&self) -> bool {
        self.error == LifecycleError::Cancelled
    }

    /// Short heading for the failing stage
    pub fn title(&self) -> &'static str {
        match self.stage {
            FailureStage::Configuration => "Service Misconfigured",
            FailureStage::Validation => "Invalid Input",
            FailureStage::Encryption => "Encryption Failed",
            FailureStage::Commitment => "Commitment Failed",
            FailureStage::Broadcast => "Transaction Not Sent",
            FailureStage::Confirmation => "Transaction Not Confirmed",
        }
    }

    /// What the user should do next
    pub fn remediation(&self) -> &'static str {
        match (&self.stage, &self.error) {
            (_, LifecycleError::AttemptInFlight) => "Wait for the current prediction to finish.",
            (_, LifecycleError::Cancelled) => "Submit again when ready.",
            (FailureStage::Configuration, _) => {
                "This market is not set up correctly; contact the operator."
            }
            (FailureStage::Validation, _) => "Correct the highlighted input and try again.",
            (FailureStage::Encryption, _) => "Retry in a moment.",
            (FailureStage::Commitment, _) => "Retry; your input has been kept.",
            (_, LifecycleError::Submission(SubmissionError::Rejected(_))) => {
                "Reconnect your wallet and approve the transaction."
            }
            (_, LifecycleError::Submission(SubmissionError::ConfirmationTimeout)) => {
                "Wait for the transaction to finalize before retrying."
            }
            (_, LifecycleError::Submission(SubmissionError::Reverted(_))) => {
                "The ledger refused the prediction; review it and retry."
            }
            _ => "Check your connection and retry.",
        }
    }

    /// Full message shown to the user
    pub fn user_message(&self) -> String {
        format!("{}: {}. {}", self.title(), self.error, self.remediation())
    }
}
