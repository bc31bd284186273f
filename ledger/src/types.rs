//! Ledger data types

use std::fmt;
use std::str::FromStr;

use electionbet_commitment::{Commitment, MarketId};
use electionbet_fhe::{Address, CiphertextHandle, InputProof, ParseHexError};
use serde::{Deserialize, Serialize};

/// Ledger-assigned ticket identifier
pub type TicketId = u64;

/// Settlement status of a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    /// Awaiting settlement
    Active,
    /// Reward claimed after settlement
    Claimed,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketStatus::Active => write!(f, "Active"),
            TicketStatus::Claimed => write!(f, "Claimed"),
        }
    }
}

/// A submitted prediction as recorded by the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: TicketId,
    pub market_id: MarketId,
    /// Account that submitted the prediction
    pub bettor: Address,
    pub commitment: Commitment,
    /// Flipped by the ledger when the settlement reward is claimed
    pub claimed: bool,
    /// Encrypted candidate index
    pub candidate_handle: CiphertextHandle,
    /// Encrypted stake in base units
    pub stake_handle: CiphertextHandle,
}

impl Ticket {
    pub fn is_owned_by(&self, identity: &Address) -> bool {
        self.bettor == *identity
    }

    pub fn status(&self) -> TicketStatus {
        if self.claimed {
            TicketStatus::Claimed
        } else {
            TicketStatus::Active
        }
    }

    /// Encrypted fields in decryption order: candidate, then stake
    pub fn handles(&self) -> [CiphertextHandle; 2] {
        [self.candidate_handle, self.stake_handle]
    }
}

/// Payload handed to the ledger submission service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub market_id: MarketId,
    pub candidate_handle: CiphertextHandle,
    pub stake_handle: CiphertextHandle,
    pub proof: InputProof,
    pub commitment: Commitment,
    /// Stake in ledger base units
    pub value: u64,
}

/// Transaction reference returned on broadcast
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxReference([u8; 32]);

impl TxReference {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for TxReference {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        let bytes = hex::decode(digits).map_err(|e| ParseHexError::InvalidHex(e.to_string()))?;
        let len = bytes.len();
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| ParseHexError::InvalidLength {
            expected: 32,
            actual: len,
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for TxReference {
    type Error = ParseHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TxReference> for String {
    fn from(tx: TxReference) -> Self {
        tx.to_hex()
    }
}

impl fmt::Display for TxReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxReference({}..)", &self.to_hex()[..10])
    }
}

/// Finalization record for a confirmed transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx: TxReference,
    /// Ticket created by the transaction
    pub ticket_id: TicketId,
    pub block_number: u64,
}
