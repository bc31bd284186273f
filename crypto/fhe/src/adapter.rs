//! Encryption adapter contract and its session-wide instance
//!
//! The relayer bundle is expensive to bring up, so a session creates it once
//! and shares it between submission and ticket decryption. `AdapterCell`
//! owns that lifecycle explicitly instead of hiding it in module state:
//! - setup is lazy and runs at most once
//! - callers arriving while setup is in flight await the same setup
//! - a failed setup leaves the cell empty so the next caller retries

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::{
    Address, CiphertextHandle, DecryptionResult, EncryptedPayload, EncryptionError,
    EncryptionResult, RelayerConfig,
};

/// Encrypt/decrypt interface to the external relayer
#[async_trait]
pub trait EncryptionAdapter: Send + Sync {
    /// Encrypt a candidate index and a stake (already in ledger base units),
    /// bound to the recipient contract and the submitter.
    ///
    /// Encryption may be randomized: callers must not assume identical
    /// inputs yield identical handles.
    async fn encrypt(
        &self,
        recipient: &Address,
        submitter: &Address,
        candidate_index: u32,
        stake_base_units: u64,
    ) -> EncryptionResult<EncryptedPayload>;

    /// Decrypt a batch of handles on behalf of `requester`.
    ///
    /// Returns one plaintext per handle, in order.
    async fn decrypt_batch(
        &self,
        handles: &[CiphertextHandle],
        requester: &Address,
    ) -> DecryptionResult<Vec<u64>>;
}

/// One-time adapter setup
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    /// Instantiate the relayer for the configured network
    async fn create(&self, config: &RelayerConfig) -> EncryptionResult<Arc<dyn EncryptionAdapter>>;
}

/// Factory that hands out an adapter that already exists
struct Preinitialized(Arc<dyn EncryptionAdapter>);

#[async_trait]
impl AdapterFactory for Preinitialized {
    async fn create(&self, _config: &RelayerConfig) -> EncryptionResult<Arc<dyn EncryptionAdapter>> {
        Ok(self.0.clone())
    }
}

/// Lazily-constructed, shared encryption adapter
pub struct AdapterCell {
    factory: Arc<dyn AdapterFactory>,
    config: RelayerConfig,
    cell: OnceCell<Arc<dyn EncryptionAdapter>>,
}

impl AdapterCell {
    /// Create an empty cell; setup runs on first `get`
    pub fn new(factory: Arc<dyn AdapterFactory>, config: RelayerConfig) -> Self {
        Self {
            factory,
            config,
            cell: OnceCell::new(),
        }
    }

    /// Create a cell around an adapter that needs no setup
    pub fn ready(adapter: Arc<dyn EncryptionAdapter>, config: RelayerConfig) -> Self {
        Self {
            factory: Arc::new(Preinitialized(adapter.clone())),
            config,
            cell: OnceCell::new_with(Some(adapter)),
        }
    }

    /// Get the shared adapter, running setup if it has not succeeded yet
    pub async fn get(&self) -> EncryptionResult<Arc<dyn EncryptionAdapter>> {
        let adapter = self
            .cell
            .get_or_try_init(|| async {
                info!(network = %self.config.network, contract = %self.config.contract, "Initializing encryption adapter");
                self.factory.create(&self.config).await.map_err(|e| {
                    warn!(error = %e, "Encryption adapter setup failed");
                    match e {
                        EncryptionError::SetupFailed(msg) => EncryptionError::SetupFailed(msg),
                        other => EncryptionError::SetupFailed(other.to_string()),
                    }
                })
            })
            .await?;
        Ok(adapter.clone())
    }

    /// Whether setup has completed
    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    /// Relayer configuration
    pub fn config(&self) -> &RelayerConfig {
        &self.config
    }
}
