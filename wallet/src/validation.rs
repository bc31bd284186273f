//! Validation gate and prediction form
//!
//! Rules run in a fixed order and the first failure wins:
//! 1. an identity must be connected
//! 2. a candidate must be selected
//! 3. the stake must parse to a positive number
//! 4. the stake must be at least the configured minimum

use electionbet_fhe::Address;
use electionbet_ledger::{AmountError, StakeAmount};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// A validated prediction, owned by one submission attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub candidate_index: u32,
    pub stake: StakeAmount,
}

impl PredictionInput {
    /// Stake in ledger base units.
    ///
    /// Stakes that do not fit the 64-bit encrypted width, or that round
    /// down to nothing, are invalid.
    pub fn base_units(&self, scale: u64) -> Result<u64, ValidationError> {
        let units = self
            .stake
            .to_base_units(scale)
            .map_err(|e| ValidationError::InvalidAmount(e.to_string()))?;
        if units == 0 {
            return Err(ValidationError::InvalidAmount(
                "stake is smaller than one ledger unit".into(),
            ));
        }
        Ok(units)
    }
}

/// User input that survives across attempts
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionForm {
    pub candidate: Option<u32>,
    /// Raw stake text as typed
    pub stake: String,
}

impl PredictionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, candidate: u32) {
        self.candidate = Some(candidate);
    }

    pub fn set_stake(&mut self, stake: impl Into<String>) {
        self.stake = stake.into();
    }

    /// Called after a confirmed submission; the selection is kept
    pub fn clear_stake(&mut self) {
        self.stake.clear();
    }
}

/// Run the validation gate. Pure; performs no I/O.
pub fn validate(
    identity: Option<&Address>,
    candidate: Option<u32>,
    raw_stake: &str,
    min_stake: &StakeAmount,
) -> Result<PredictionInput, ValidationError> {
    if identity.is_none() {
        return Err(ValidationError::NotConnected);
    }
    let candidate_index = candidate.ok_or(ValidationError::NoSelection)?;

    let stake = match raw_stake.parse::<StakeAmount>() {
        Ok(stake) => stake,
        // positive, but below anything representable
        Err(AmountError::BelowResolution) => {
            return Err(ValidationError::BelowMinimum { minimum: *min_stake })
        }
        Err(e) => return Err(ValidationError::InvalidAmount(e.to_string())),
    };
    if stake.is_zero() {
        return Err(ValidationError::InvalidAmount("stake must be positive".into()));
    }
    if stake < *min_stake {
        return Err(ValidationError::BelowMinimum { minimum: *min_stake });
    }

    Ok(PredictionInput {
        candidate_index,
        stake,
    })
}
