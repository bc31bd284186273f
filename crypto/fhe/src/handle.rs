//! Ciphertext handles and encrypted payloads

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::decode_prefixed;
use crate::errors::ParseHexError;

/// Handle length in bytes
pub const HANDLE_BYTES: usize = 32;

/// Opaque reference to an encrypted value held by the ledger
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CiphertextHandle([u8; HANDLE_BYTES]);

impl CiphertextHandle {
    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; HANDLE_BYTES]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; HANDLE_BYTES] {
        &self.0
    }

    /// Lowercase `0x`-prefixed hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for CiphertextHandle {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_prefixed::<HANDLE_BYTES>(s).map(Self)
    }
}

impl TryFrom<String> for CiphertextHandle {
    type Error = ParseHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CiphertextHandle> for String {
    fn from(handle: CiphertextHandle) -> Self {
        handle.to_hex()
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({}..)", &self.to_hex()[..10])
    }
}

/// Proof that the handles were produced correctly for the bound contract and submitter
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InputProof(Vec<u8>);

impl InputProof {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<String> for InputProof {
    type Error = ParseHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let digits = value.strip_prefix("0x").unwrap_or(&value);
        hex::decode(digits)
            .map(Self)
            .map_err(|e| ParseHexError::InvalidHex(e.to_string()))
    }
}

impl From<InputProof> for String {
    fn from(proof: InputProof) -> Self {
        format!("0x{}", hex::encode(proof.0))
    }
}

impl fmt::Debug for InputProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputProof({} bytes)", self.0.len())
    }
}

/// Output of one encryption call: two handles plus their correctness proof.
///
/// Produced fresh for every submission attempt and never reused; encryption
/// is randomized, so identical plaintexts yield different handles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Encrypted candidate index
    pub candidate_handle: CiphertextHandle,
    /// Encrypted stake in ledger base units
    pub stake_handle: CiphertextHandle,
    /// Input proof covering both handles
    pub proof: InputProof,
}
