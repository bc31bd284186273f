//! In-memory relayer
//!
//! Stands in for the external FHE relayer: handles are random, plaintexts
//! are kept in a local table, and each handle carries an access list that
//! initially holds only the submitter. Failure injection hooks let tests
//! exercise setup failures, encryption failures, ACL denials and transport
//! errors.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::RngCore;
use tracing::debug;

use crate::handle::HANDLE_BYTES;
use crate::{
    AdapterFactory, Address, CiphertextHandle, DecryptionError, DecryptionResult,
    EncryptedPayload, EncryptionAdapter, EncryptionError, EncryptionResult, InputProof,
    RelayerConfig,
};

/// Domain separation tag for in-memory input proofs
const DST_INPUT_PROOF: &[u8] = b"ELECTIONBET_INPUT_PROOF_V1";

#[derive(Clone, Debug)]
struct StoredCiphertext {
    value: u64,
    contract: Address,
    allowed: HashSet<Address>,
}

/// Relayer that keeps plaintexts in process memory
pub struct InMemoryRelayer {
    store: RwLock<HashMap<CiphertextHandle, StoredCiphertext>>,
    denied: RwLock<HashSet<CiphertextHandle>>,
    broken: RwLock<HashSet<CiphertextHandle>>,
    next_encrypt_failure: Mutex<Option<String>>,
    latency: Duration,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

impl InMemoryRelayer {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            denied: RwLock::new(HashSet::new()),
            broken: RwLock::new(HashSet::new()),
            next_encrypt_failure: Mutex::new(None),
            latency: Duration::ZERO,
            encrypt_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
        }
    }

    /// Delay every encrypt and decrypt call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next `encrypt` call fail with `reason`
    pub fn fail_next_encrypt(&self, reason: impl Into<String>) {
        *self.next_encrypt_failure.lock() = Some(reason.into());
    }

    /// Revoke everyone's access to `handle`
    pub fn deny(&self, handle: CiphertextHandle) {
        self.denied.write().insert(handle);
    }

    /// Make decryption of `handle` fail at the transport level
    pub fn break_handle(&self, handle: CiphertextHandle) {
        self.broken.write().insert(handle);
    }

    /// Allow `account` to decrypt `handle`
    pub fn grant(&self, handle: &CiphertextHandle, account: Address) {
        if let Some(entry) = self.store.write().get_mut(handle) {
            entry.allowed.insert(account);
        }
    }

    /// Encrypt a single value owned by `owner` without going through a submission.
    pub fn seal(&self, contract: Address, owner: Address, value: u64) -> CiphertextHandle {
        let handle = random_handle();
        self.store.write().insert(
            handle,
            StoredCiphertext {
                value,
                contract,
                allowed: HashSet::from([owner]),
            },
        );
        handle
    }

    /// Contract a handle was bound to at encryption time
    pub fn bound_contract(&self, handle: &CiphertextHandle) -> Option<Address> {
        self.store.read().get(handle).map(|entry| entry.contract)
    }

    /// Number of `encrypt` calls so far
    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    /// Number of `decrypt_batch` calls so far
    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    /// Number of handles held
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for InMemoryRelayer {
    fn default() -> Self {
        Self::new()
    }
}

fn random_handle() -> CiphertextHandle {
    let mut bytes = [0u8; HANDLE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    CiphertextHandle::from_bytes(bytes)
}

fn input_proof(
    contract: &Address,
    submitter: &Address,
    candidate: &CiphertextHandle,
    stake: &CiphertextHandle,
) -> InputProof {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DST_INPUT_PROOF);
    hasher.update(contract.as_bytes());
    hasher.update(submitter.as_bytes());
    hasher.update(candidate.as_bytes());
    hasher.update(stake.as_bytes());
    InputProof::new(hasher.finalize().as_bytes().to_vec())
}

#[async_trait]
impl EncryptionAdapter for InMemoryRelayer {
    async fn encrypt(
        &self,
        recipient: &Address,
        submitter: &Address,
        candidate_index: u32,
        stake_base_units: u64,
    ) -> EncryptionResult<EncryptedPayload> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(reason) = self.next_encrypt_failure.lock().take() {
            return Err(EncryptionError::EncryptFailed(reason));
        }

        let candidate_handle = self.seal(*recipient, *submitter, u64::from(candidate_index));
        let stake_handle = self.seal(*recipient, *submitter, stake_base_units);
        let proof = input_proof(recipient, submitter, &candidate_handle, &stake_handle);

        debug!(%submitter, "Encrypted prediction input");
        Ok(EncryptedPayload {
            candidate_handle,
            stake_handle,
            proof,
        })
    }

    async fn decrypt_batch(
        &self,
        handles: &[CiphertextHandle],
        requester: &Address,
    ) -> DecryptionResult<Vec<u64>> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let store = self.store.read();
        let denied = self.denied.read();
        let broken = self.broken.read();

        handles
            .iter()
            .map(|handle| {
                if broken.contains(handle) {
                    return Err(DecryptionError::DecryptFailed(
                        "relayer gateway unavailable".into(),
                    ));
                }
                let entry = store.get(handle).ok_or_else(|| {
                    DecryptionError::DecryptFailed(format!("unknown handle {handle}"))
                })?;
                if denied.contains(handle) || !entry.allowed.contains(requester) {
                    return Err(DecryptionError::AclDenied {
                        handle: *handle,
                        requester: *requester,
                    });
                }
                Ok(entry.value)
            })
            .collect()
    }
}

/// Factory that hands out a shared `InMemoryRelayer`
pub struct InMemoryRelayerFactory {
    relayer: Arc<InMemoryRelayer>,
    setups: AtomicUsize,
    failures_remaining: AtomicUsize,
    delay: Duration,
}

impl InMemoryRelayerFactory {
    pub fn new(relayer: Arc<InMemoryRelayer>) -> Self {
        Self {
            relayer,
            setups: AtomicUsize::new(0),
            failures_remaining: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Delay each setup attempt
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the first `count` setup attempts
    pub fn failing_setups(self, count: usize) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    /// Number of setup attempts so far
    pub fn setup_count(&self) -> usize {
        self.setups.load(Ordering::SeqCst)
    }

    pub fn relayer(&self) -> Arc<InMemoryRelayer> {
        self.relayer.clone()
    }
}

#[async_trait]
impl AdapterFactory for InMemoryRelayerFactory {
    async fn create(&self, config: &RelayerConfig) -> EncryptionResult<Arc<dyn EncryptionAdapter>> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(EncryptionError::SetupFailed(format!(
                "relayer bundle for {} did not initialize",
                config.network
            )));
        }

        Ok(self.relayer.clone())
    }
}
