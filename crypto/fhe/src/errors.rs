//! Encryption adapter error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Address, CiphertextHandle};

/// Errors raised while preparing or performing encryption
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    /// Relayer instance could not be created
    #[error("Encryption setup failed: {0}")]
    SetupFailed(String),

    /// Relayer refused or failed to encrypt the input
    #[error("Encryption failed: {0}")]
    EncryptFailed(String),
}

/// Errors raised while decrypting a single ticket's handles
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecryptionError {
    /// Requester is not on the handle's access control list
    #[error("Access denied: {requester} may not decrypt {handle}")]
    AclDenied {
        handle: CiphertextHandle,
        requester: Address,
    },

    /// Transport or protocol failure
    #[error("Decryption failed: {0}")]
    DecryptFailed(String),
}

/// Errors parsing `0x`-prefixed hex values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseHexError {
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}
