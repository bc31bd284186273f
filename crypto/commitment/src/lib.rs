//! ElectionBet Commitments
//!
//! Binding digest over `{submitter, market, candidate handle, stake handle}`.
//! The ledger uses it to refuse a replayed tuple and to detect a captured
//! ciphertext being resubmitted under a different identity or market.
//!
//! The digest is a domain-separated BLAKE3 hash over fixed-width fields, so
//! identical inputs always yield the same commitment and no two distinct
//! field tuples share an encoding.

use std::fmt;
use std::str::FromStr;

use electionbet_fhe::{Address, CiphertextHandle, ParseHexError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain separation tag for prediction commitments
const DST_COMMITMENT: &[u8] = b"ELECTIONBET_PREDICTION_COMMITMENT_V1";

/// Commitment length in bytes
pub const COMMITMENT_BYTES: usize = 32;

/// Commitment errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    /// A commitment was checked against fields it was not computed from
    #[error("Commitment {commitment} does not bind the submitted handles")]
    Mismatch { commitment: Commitment },

    #[error("Invalid commitment encoding: {0}")]
    Encoding(#[from] ParseHexError),
}

/// Identifier of a prediction market (an election)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub u64);

impl MarketId {
    /// 32-byte big-endian encoding, matching a uint256 slot
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&self.0.to_be_bytes());
        word
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Binding digest for one submission attempt
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Commitment([u8; COMMITMENT_BYTES]);

impl Commitment {
    /// Compute the commitment for a submission.
    ///
    /// Must be recomputed whenever any field changes; a commitment is only
    /// valid for the exact handles it was computed from.
    pub fn commit(
        submitter: &Address,
        market: MarketId,
        candidate_handle: &CiphertextHandle,
        stake_handle: &CiphertextHandle,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DST_COMMITMENT);
        hasher.update(submitter.as_bytes());
        hasher.update(&market.to_word());
        hasher.update(candidate_handle.as_bytes());
        hasher.update(stake_handle.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Check that this commitment was computed from exactly these fields
    pub fn verify(
        &self,
        submitter: &Address,
        market: MarketId,
        candidate_handle: &CiphertextHandle,
        stake_handle: &CiphertextHandle,
    ) -> Result<(), CommitmentError> {
        if Self::commit(submitter, market, candidate_handle, stake_handle) == *self {
            Ok(())
        } else {
            Err(CommitmentError::Mismatch { commitment: *self })
        }
    }

    pub const fn from_bytes(bytes: [u8; COMMITMENT_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; COMMITMENT_BYTES] {
        &self.0
    }

    /// Lowercase `0x`-prefixed hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short form for listings: first 8 and last 6 characters of the hex string
    pub fn abbreviated(&self) -> String {
        let hex = self.to_hex();
        format!("{}...{}", &hex[..8], &hex[hex.len() - 6..])
    }
}

/// Free-function form of [`Commitment::commit`]
pub fn commit(
    submitter: &Address,
    market: MarketId,
    candidate_handle: &CiphertextHandle,
    stake_handle: &CiphertextHandle,
) -> Commitment {
    Commitment::commit(submitter, market, candidate_handle, stake_handle)
}

impl FromStr for Commitment {
    type Err = CommitmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(digits).map_err(|e| ParseHexError::InvalidHex(e.to_string()))?;
        let bytes: [u8; COMMITMENT_BYTES] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ParseHexError::InvalidLength {
                    expected: COMMITMENT_BYTES,
                    actual: bytes.len(),
                })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Commitment {
    type Error = CommitmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Commitment> for String {
    fn from(commitment: Commitment) -> Self {
        commitment.to_hex()
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.abbreviated())
    }
}
