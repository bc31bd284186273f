//! Ticket Decryption Cache
//!
//! Decrypts each ticket of one identity independently and memoizes the
//! result by ticket id. A ticket is decrypted again only if its encrypted
//! fields change. Syncing with a ticket list equal by value to the previous
//! one (same ids, same order, same handles) issues no requests at all.
//!
//! Requests run as independent tasks and may complete in any order. A
//! failure is recorded on its own ticket only. Results that arrive after
//! the cache is closed or dropped are discarded; in-flight requests are
//! never aborted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use electionbet_fhe::{AdapterCell, Address, CiphertextHandle, DecryptionError};
use electionbet_ledger::{StakeAmount, Ticket, TicketId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Plaintext of one ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedTicket {
    pub ticket_id: TicketId,
    pub candidate_index: u32,
    pub stake: StakeAmount,
}

/// Decryption state of one ticket
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecryptionStatus {
    Pending,
    Ready(DecryptedTicket),
    Failed(DecryptionError),
}

/// Cached state of one ticket
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    /// Encrypted fields the status was computed from
    pub handles: [CiphertextHandle; 2],
    pub status: DecryptionStatus,
}

impl CacheEntry {
    /// True until the first resolution
    pub fn is_decrypting(&self) -> bool {
        matches!(self.status, DecryptionStatus::Pending)
    }

    pub fn error(&self) -> Option<&DecryptionError> {
        match &self.status {
            DecryptionStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn decrypted(&self) -> Option<&DecryptedTicket> {
        match &self.status {
            DecryptionStatus::Ready(t) => Some(t),
            _ => None,
        }
    }

    pub fn candidate_index(&self) -> Option<u32> {
        self.decrypted().map(|t| t.candidate_index)
    }

    pub fn stake_display(&self) -> Option<String> {
        self.decrypted().map(|t| t.stake.to_string())
    }
}

type SyncKey = Vec<(TicketId, [CiphertextHandle; 2])>;

/// State shared with in-flight decryption tasks
struct Shared {
    entries: RwLock<HashMap<TicketId, CacheEntry>>,
    closed: AtomicBool,
}

impl Shared {
    fn resolve(&self, ticket_id: TicketId, handles: [CiphertextHandle; 2], status: DecryptionStatus) {
        if self.closed.load(Ordering::Acquire) {
            debug!(ticket_id, "Cache closed; dropping decryption result");
            return;
        }
        let mut entries = self.entries.write();
        match entries.get_mut(&ticket_id) {
            Some(entry) if entry.handles == handles => entry.status = status,
            _ => debug!(ticket_id, "Stale decryption result discarded"),
        }
    }
}

/// Per-ticket decryption cache for one identity
pub struct TicketDecryptionCache {
    adapter: Arc<AdapterCell>,
    identity: Address,
    base_unit_scale: u64,
    shared: Arc<Shared>,
    last_synced: Mutex<Option<SyncKey>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TicketDecryptionCache {
    pub fn new(adapter: Arc<AdapterCell>, identity: Address, base_unit_scale: u64) -> Self {
        Self {
            adapter,
            identity,
            base_unit_scale,
            shared: Arc::new(Shared {
                entries: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
            last_synced: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Identity whose tickets this cache decrypts
    pub fn identity(&self) -> &Address {
        &self.identity
    }

    /// Bring the cache in line with `tickets`.
    ///
    /// With `reveal` off nothing is requested and cached results are kept.
    /// Returns the number of decryption requests issued. Must be called
    /// from within a Tokio runtime.
    pub fn sync(&self, tickets: &[Ticket], reveal: bool) -> usize {
        if !reveal || self.is_closed() {
            return 0;
        }

        let key: SyncKey = tickets.iter().map(|t| (t.ticket_id, t.handles())).collect();
        let mut last = self.last_synced.lock();
        if last.as_ref() == Some(&key) {
            return 0;
        }

        let mut requested = Vec::new();
        {
            let mut entries = self.shared.entries.write();
            entries.retain(|id, _| key.iter().any(|(kid, _)| kid == id));
            for (ticket_id, handles) in &key {
                let fresh = entries
                    .get(ticket_id)
                    .map_or(true, |entry| entry.handles != *handles);
                if fresh {
                    entries.insert(
                        *ticket_id,
                        CacheEntry {
                            handles: *handles,
                            status: DecryptionStatus::Pending,
                        },
                    );
                    requested.push((*ticket_id, *handles));
                }
            }
        }
        *last = Some(key);
        drop(last);

        if !requested.is_empty() {
            info!(identity = %self.identity, count = requested.len(), "Decrypting tickets");
        }
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        for (ticket_id, handles) in &requested {
            tasks.push(self.spawn_decrypt(*ticket_id, *handles));
        }
        requested.len()
    }

    fn spawn_decrypt(&self, ticket_id: TicketId, handles: [CiphertextHandle; 2]) -> JoinHandle<()> {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let adapter = self.adapter.clone();
        let identity = self.identity;
        let scale = self.base_unit_scale;

        tokio::spawn(async move {
            let status = decrypt_ticket(&adapter, ticket_id, handles, &identity, scale).await;
            match &status {
                DecryptionStatus::Failed(e) => warn!(ticket_id, error = %e, "Ticket decryption failed"),
                _ => debug!(ticket_id, "Ticket decrypted"),
            }
            match shared.upgrade() {
                Some(shared) => shared.resolve(ticket_id, handles, status),
                None => debug!(ticket_id, "Cache dropped; decryption result ignored"),
            }
        })
    }

    /// Forget one ticket so the next sync decrypts it again
    pub fn invalidate(&self, ticket_id: TicketId) {
        self.shared.entries.write().remove(&ticket_id);
        *self.last_synced.lock() = None;
    }

    /// Cached state of one ticket
    pub fn entry(&self, ticket_id: TicketId) -> Option<CacheEntry> {
        self.shared.entries.read().get(&ticket_id).cloned()
    }

    /// Snapshot of every cached ticket
    pub fn entries(&self) -> HashMap<TicketId, CacheEntry> {
        self.shared.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.entries.read().is_empty()
    }

    /// Number of tickets still awaiting their first result
    pub fn pending_count(&self) -> usize {
        self.shared
            .entries
            .read()
            .values()
            .filter(|e| e.is_decrypting())
            .count()
    }

    /// Wait for every request issued so far to resolve
    pub async fn wait_idle(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Ticket decryption task ended abnormally");
            }
        }
    }

    /// Stop accepting results; requests already in flight run to completion
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

async fn decrypt_ticket(
    adapter: &AdapterCell,
    ticket_id: TicketId,
    handles: [CiphertextHandle; 2],
    identity: &Address,
    scale: u64,
) -> DecryptionStatus {
    let adapter = match adapter.get().await {
        Ok(adapter) => adapter,
        Err(e) => return DecryptionStatus::Failed(DecryptionError::DecryptFailed(e.to_string())),
    };

    let values = match adapter.decrypt_batch(&handles, identity).await {
        Ok(values) => values,
        Err(e) => return DecryptionStatus::Failed(e),
    };
    let [candidate, stake] = values.as_slice() else {
        return DecryptionStatus::Failed(DecryptionError::DecryptFailed(format!(
            "expected 2 plaintexts, got {}",
            values.len()
        )));
    };

    let candidate_index = match u32::try_from(*candidate) {
        Ok(index) => index,
        Err(_) => {
            return DecryptionStatus::Failed(DecryptionError::DecryptFailed(format!(
                "candidate index {candidate} out of range"
            )))
        }
    };
    match StakeAmount::from_base_units(*stake, scale) {
        Ok(stake) => DecryptionStatus::Ready(DecryptedTicket {
            ticket_id,
            candidate_index,
            stake,
        }),
        Err(e) => DecryptionStatus::Failed(DecryptionError::DecryptFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use electionbet_commitment::{Commitment, MarketId};
    use electionbet_fhe::{InMemoryRelayer, InMemoryRelayerFactory, RelayerConfig};
    use std::time::Duration;

    const SCALE: u64 = 1_000_000;

    fn contract() -> Address {
        Address::from_bytes([0xC0; 20])
    }

    fn alice() -> Address {
        Address::from_bytes([0xA1; 20])
    }

    fn sealed_ticket(relayer: &InMemoryRelayer, id: TicketId, candidate: u64, stake: u64) -> Ticket {
        let candidate_handle = relayer.seal(contract(), alice(), candidate);
        let stake_handle = relayer.seal(contract(), alice(), stake);
        Ticket {
            ticket_id: id,
            market_id: MarketId(1),
            bettor: alice(),
            commitment: Commitment::commit(&alice(), MarketId(1), &candidate_handle, &stake_handle),
            claimed: false,
            candidate_handle,
            stake_handle,
        }
    }

    fn cache_for(relayer: Arc<InMemoryRelayer>) -> TicketDecryptionCache {
        let cell = Arc::new(AdapterCell::ready(relayer, RelayerConfig::default()));
        TicketDecryptionCache::new(cell, alice(), SCALE)
    }

    #[tokio::test]
    async fn test_decrypts_each_ticket() {
        let relayer = Arc::new(InMemoryRelayer::new());
        let tickets = vec![
            sealed_ticket(&relayer, 1, 0, 50_000),
            sealed_ticket(&relayer, 2, 2, 1_250_000),
        ];
        let cache = cache_for(relayer.clone());

        assert_eq!(cache.sync(&tickets, true), 2);
        cache.wait_idle().await;

        let first = cache.entry(1).unwrap();
        assert!(!first.is_decrypting());
        assert_eq!(first.candidate_index(), Some(0));
        assert_eq!(first.stake_display().as_deref(), Some("0.05"));

        let second = cache.entry(2).unwrap();
        assert_eq!(second.candidate_index(), Some(2));
        assert_eq!(second.stake_display().as_deref(), Some("1.25"));
        assert_eq!(relayer.decrypt_calls(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_ticket_set_issues_no_requests() {
        let relayer = Arc::new(InMemoryRelayer::new());
        let tickets = vec![
            sealed_ticket(&relayer, 1, 0, 10),
            sealed_ticket(&relayer, 2, 1, 20),
        ];
        let cache = cache_for(relayer.clone());

        cache.sync(&tickets, true);
        cache.wait_idle().await;

        // a fresh container holding equal tickets
        let refreshed = tickets.clone();
        assert_eq!(cache.sync(&refreshed, true), 0);
        cache.wait_idle().await;
        assert_eq!(relayer.decrypt_calls(), 2);
    }

    #[tokio::test]
    async fn test_only_new_tickets_are_requested() {
        let relayer = Arc::new(InMemoryRelayer::new());
        let mut tickets = vec![sealed_ticket(&relayer, 1, 0, 10)];
        let cache = cache_for(relayer.clone());

        cache.sync(&tickets, true);
        cache.wait_idle().await;

        tickets.push(sealed_ticket(&relayer, 2, 1, 20));
        assert_eq!(cache.sync(&tickets, true), 1);

        // reordering changes the key but every ticket is cached
        tickets.reverse();
        cache.wait_idle().await;
        assert_eq!(cache.sync(&tickets, true), 0);
        assert_eq!(relayer.decrypt_calls(), 2);
    }

    #[tokio::test]
    async fn test_changed_handles_are_decrypted_again() {
        let relayer = Arc::new(InMemoryRelayer::new());
        let original = sealed_ticket(&relayer, 1, 0, 10);
        let cache = cache_for(relayer.clone());
        cache.sync(std::slice::from_ref(&original), true);
        cache.wait_idle().await;

        let replaced = sealed_ticket(&relayer, 1, 2, 30);
        assert_eq!(cache.sync(std::slice::from_ref(&replaced), true), 1);
        cache.wait_idle().await;
        assert_eq!(cache.entry(1).unwrap().candidate_index(), Some(2));
    }

    #[tokio::test]
    async fn test_failure_is_scoped_to_one_ticket() {
        let relayer = Arc::new(InMemoryRelayer::new());
        let denied = sealed_ticket(&relayer, 1, 1, 10);
        let allowed = sealed_ticket(&relayer, 2, 0, 20);
        relayer.deny(denied.candidate_handle);
        let cache = cache_for(relayer.clone());

        cache.sync(&[denied, allowed], true);
        cache.wait_idle().await;

        let failed = cache.entry(1).unwrap();
        assert!(!failed.is_decrypting());
        assert!(matches!(failed.error(), Some(DecryptionError::AclDenied { .. })));
        assert_eq!(failed.candidate_index(), None);

        let ok = cache.entry(2).unwrap();
        assert!(ok.error().is_none());
        assert_eq!(ok.candidate_index(), Some(0));
    }

    #[tokio::test]
    async fn test_reveal_off_issues_nothing_and_keeps_results() {
        let relayer = Arc::new(InMemoryRelayer::new());
        let tickets = vec![sealed_ticket(&relayer, 1, 0, 10)];
        let cache = cache_for(relayer.clone());

        assert_eq!(cache.sync(&tickets, false), 0);
        assert!(cache.is_empty());

        cache.sync(&tickets, true);
        cache.wait_idle().await;
        assert_eq!(cache.sync(&tickets, false), 0);
        assert_eq!(cache.entry(1).unwrap().candidate_index(), Some(0));
        assert_eq!(cache.sync(&tickets, true), 0);
        assert_eq!(relayer.decrypt_calls(), 1);
    }

    #[tokio::test]
    async fn test_out_of_order_completion() {
        let relayer = Arc::new(InMemoryRelayer::new().with_latency(Duration::from_millis(20)));
        let tickets: Vec<Ticket> = (1..=5).map(|i| sealed_ticket(&relayer, i, i % 3, i * 100)).collect();
        let cache = cache_for(relayer);

        assert_eq!(cache.sync(&tickets, true), 5);
        assert_eq!(cache.pending_count(), 5);
        cache.wait_idle().await;
        assert_eq!(cache.pending_count(), 0);
        for i in 1..=5u64 {
            assert_eq!(cache.entry(i).unwrap().candidate_index(), Some((i % 3) as u32));
        }
    }

    #[tokio::test]
    async fn test_closed_cache_ignores_late_results() {
        let relayer = Arc::new(InMemoryRelayer::new().with_latency(Duration::from_millis(30)));
        let tickets = vec![sealed_ticket(&relayer, 1, 0, 10)];
        let cache = cache_for(relayer.clone());

        cache.sync(&tickets, true);
        cache.close();
        cache.wait_idle().await;

        assert!(cache.entry(1).unwrap().is_decrypting());
        assert_eq!(relayer.decrypt_calls(), 1);
        assert_eq!(cache.sync(&tickets, true), 0);
    }

    #[tokio::test]
    async fn test_invalidate_retries_failed_ticket() {
        let relayer = Arc::new(InMemoryRelayer::new());
        let ticket = sealed_ticket(&relayer, 1, 0, 10);
        let cache = TicketDecryptionCache::new(
            Arc::new(AdapterCell::ready(relayer.clone(), RelayerConfig::default())),
            Address::from_bytes([0xB0; 20]),
            SCALE,
        );

        cache.sync(std::slice::from_ref(&ticket), true);
        cache.wait_idle().await;
        assert!(cache.entry(1).unwrap().error().is_some());

        relayer.grant(&ticket.candidate_handle, Address::from_bytes([0xB0; 20]));
        relayer.grant(&ticket.stake_handle, Address::from_bytes([0xB0; 20]));
        assert_eq!(cache.sync(std::slice::from_ref(&ticket), true), 0);

        cache.invalidate(1);
        assert_eq!(cache.sync(std::slice::from_ref(&ticket), true), 1);
        cache.wait_idle().await;
        assert_eq!(cache.entry(1).unwrap().candidate_index(), Some(0));
    }

    #[tokio::test]
    async fn test_adapter_setup_failure_fails_tickets() {
        let relayer = Arc::new(InMemoryRelayer::new());
        let ticket = sealed_ticket(&relayer, 1, 0, 10);
        let factory = Arc::new(InMemoryRelayerFactory::new(relayer).failing_setups(1));
        let cell = Arc::new(AdapterCell::new(factory, RelayerConfig::default()));
        let cache = TicketDecryptionCache::new(cell, alice(), SCALE);

        cache.sync(&[ticket], true);
        cache.wait_idle().await;
        assert!(matches!(
            cache.entry(1).unwrap().error(),
            Some(DecryptionError::DecryptFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_removed_tickets_are_pruned() {
        let relayer = Arc::new(InMemoryRelayer::new());
        let tickets = vec![
            sealed_ticket(&relayer, 1, 0, 10),
            sealed_ticket(&relayer, 2, 0, 10),
        ];
        let cache = cache_for(relayer);
        cache.sync(&tickets, true);
        cache.wait_idle().await;

        assert_eq!(cache.sync(&tickets[..1], true), 0);
        assert_eq!(cache.len(), 1);
        assert!(cache.entry(2).is_none());
    }
}
