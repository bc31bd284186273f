//! ElectionBet Wallet
//!
//! Client side of placing an encrypted prediction:
//! - Validation gate over connection, selection and stake
//! - Candidate catalog used to name predictions
//! - Submission state machine: encrypt, commit, broadcast, confirm
//! - Stage-tagged failures with user-facing remediation messages

pub mod candidate;
pub mod errors;
pub mod lifecycle;
pub mod validation;

pub use candidate::{CandidateBook, CandidateProfile};
pub use errors::{FailureStage, LifecycleError, LifecycleResult, SubmissionFailure, ValidationError};
pub use lifecycle::{
    NoOpObserver, PredictionSubmitter, SubmissionConfig, SubmissionNotice, SubmissionObserver,
    SubmissionOutcome, SubmissionPhase,
};
pub use validation::{validate, PredictionForm, PredictionInput};
