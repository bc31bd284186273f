//! ElectionBet Encryption Adapter
//!
//! Client-side contract for the external FHE relayer that turns a plaintext
//! prediction into ciphertext handles, and turns handles back into plaintext
//! for their authorised owner.
//!
//! # Key Features:
//! - Opaque 32-byte ciphertext handles and input proofs
//! - `EncryptionAdapter` trait for the encrypt and decrypt directions
//! - `AdapterCell`: lazily-initialised, shared adapter instance whose setup
//!   runs at most once even under concurrent callers
//! - `InMemoryRelayer`: deterministic-ACL, randomized-handle relayer used by
//!   tests and the CLI demo
//!
//! # Architecture:
//! - Recipient context: the prediction contract address the input is bound to
//! - Submitter identity: the wallet address allowed to decrypt its own handles
//! - Setup: one relayer instance per session, shared read-only afterwards

pub mod adapter;
pub mod address;
pub mod errors;
pub mod handle;
pub mod memory;

pub use adapter::{AdapterCell, AdapterFactory, EncryptionAdapter};
pub use address::Address;
pub use errors::{DecryptionError, EncryptionError, ParseHexError};
pub use handle::{CiphertextHandle, EncryptedPayload, InputProof};
pub use memory::{InMemoryRelayer, InMemoryRelayerFactory};

use serde::{Deserialize, Serialize};

/// Target network environment for the relayer bundle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayerNetwork {
    /// Public Sepolia test network
    Sepolia,
    /// Local development chain
    Local,
}

impl RelayerNetwork {
    /// EVM chain id of the network
    pub fn chain_id(&self) -> u64 {
        match self {
            RelayerNetwork::Sepolia => 11_155_111,
            RelayerNetwork::Local => 31_337,
        }
    }
}

impl std::fmt::Display for RelayerNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayerNetwork::Sepolia => write!(f, "sepolia"),
            RelayerNetwork::Local => write!(f, "local"),
        }
    }
}

/// Relayer configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayerConfig {
    /// Network the relayer bundle targets
    pub network: RelayerNetwork,
    /// Prediction contract that encrypted inputs are bound to
    pub contract: Address,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            network: RelayerNetwork::Local,
            contract: Address::ZERO,
        }
    }
}

/// Result type for encryption operations
pub type EncryptionResult<T> = Result<T, EncryptionError>;

/// Result type for decryption operations
pub type DecryptionResult<T> = Result<T, DecryptionError>;
