//! In-memory ledger
//!
//! Simulates the prediction contract: it accepts broadcasts, finalizes them
//! into tickets, and answers ticket queries. Like the contract it recomputes
//! each commitment from the sender, market and handles, and refuses a
//! commitment it has already accepted.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use blake3::Hasher;
use electionbet_commitment::{Commitment, MarketId};
use electionbet_fhe::Address;
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::errors::{QueryError, QueryResult, SubmissionError, SubmissionResult};
use crate::service::{LedgerQuery, LedgerSubmitter};
use crate::types::{Receipt, SubmissionRequest, Ticket, TicketId, TxReference};

/// A broadcast transaction awaiting finalization
#[derive(Clone, Debug)]
struct PendingTx {
    ticket: Ticket,
}

#[derive(Default)]
struct LedgerState {
    tickets: HashMap<MarketId, Vec<Ticket>>,
    pending: HashMap<TxReference, PendingTx>,
    /// Commitments accepted so far, including pending ones
    seen: HashSet<Commitment>,
    next_ticket_id: TicketId,
    block_number: u64,
    nonce: u64,
}

/// Ledger that keeps all state in process memory
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    next_broadcast_failure: Mutex<Option<SubmissionError>>,
    next_revert: Mutex<Option<String>>,
    next_query_failure: Mutex<Option<String>>,
    hold_confirmations: AtomicBool,
    confirmation_delay: Duration,
    broadcast_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState {
                next_ticket_id: 1,
                ..Default::default()
            }),
            next_broadcast_failure: Mutex::new(None),
            next_revert: Mutex::new(None),
            next_query_failure: Mutex::new(None),
            hold_confirmations: AtomicBool::new(false),
            confirmation_delay: Duration::ZERO,
            broadcast_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        }
    }

    /// Delay every confirmation by `delay`
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    /// Refuse the next broadcast as if the wallet rejected it
    pub fn reject_next(&self, reason: impl Into<String>) {
        *self.next_broadcast_failure.lock() = Some(SubmissionError::Rejected(reason.into()));
    }

    /// Fail the next broadcast at the transport level
    pub fn fail_next_broadcast(&self, reason: impl Into<String>) {
        *self.next_broadcast_failure.lock() = Some(SubmissionError::BroadcastFailed(reason.into()));
    }

    /// Revert the next transaction that reaches confirmation
    pub fn revert_next(&self, reason: impl Into<String>) {
        *self.next_revert.lock() = Some(reason.into());
    }

    /// Fail the next ticket query
    pub fn fail_next_query(&self, reason: impl Into<String>) {
        *self.next_query_failure.lock() = Some(reason.into());
    }

    /// Stop finalizing transactions; confirmation waits never resolve
    pub fn hold_confirmations(&self, hold: bool) {
        self.hold_confirmations.store(hold, Ordering::SeqCst);
    }

    /// Record a ticket directly, bypassing submission
    pub async fn insert_ticket(&self, ticket: Ticket) {
        let mut state = self.state.write().await;
        state.next_ticket_id = state.next_ticket_id.max(ticket.ticket_id + 1);
        state.seen.insert(ticket.commitment);
        state
            .tickets
            .entry(ticket.market_id)
            .or_default()
            .push(ticket);
    }

    /// Mark a ticket's reward as claimed.
    ///
    /// Returns false if the ticket does not exist or was already claimed.
    pub async fn claim(&self, market: MarketId, ticket_id: TicketId) -> bool {
        let mut state = self.state.write().await;
        let Some(ticket) = state
            .tickets
            .get_mut(&market)
            .and_then(|tickets| tickets.iter_mut().find(|t| t.ticket_id == ticket_id))
        else {
            return false;
        };
        if ticket.claimed {
            return false;
        }
        ticket.claimed = true;
        info!(%market, ticket_id, "Ticket claimed");
        true
    }

    /// Number of `broadcast` calls so far, including refused ones
    pub fn broadcast_count(&self) -> usize {
        self.broadcast_calls.load(Ordering::SeqCst)
    }

    /// Number of `tickets` calls so far
    pub fn query_count(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Number of transactions broadcast but not yet finalized
    pub async fn pending_count(&self) -> usize {
        self.state.read().await.pending.len()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn tx_reference(commitment: &Commitment, nonce: u64) -> TxReference {
    let mut hasher = Hasher::new();
    hasher.update(commitment.as_bytes());
    hasher.update(&nonce.to_le_bytes());
    TxReference::from_bytes(*hasher.finalize().as_bytes())
}

#[async_trait]
impl LedgerSubmitter for InMemoryLedger {
    async fn broadcast(&self, from: &Address, request: &SubmissionRequest) -> SubmissionResult<TxReference> {
        self.broadcast_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.next_broadcast_failure.lock().take() {
            warn!(%from, error = %error, "Broadcast refused by failure injection");
            return Err(error);
        }

        if request.proof.is_empty() {
            return Err(SubmissionError::Rejected("missing input proof".into()));
        }

        request
            .commitment
            .verify(
                from,
                request.market_id,
                &request.candidate_handle,
                &request.stake_handle,
            )
            .map_err(|e| SubmissionError::Rejected(e.to_string()))?;

        let mut state = self.state.write().await;
        if !state.seen.insert(request.commitment) {
            return Err(SubmissionError::Rejected(format!(
                "commitment {} already used",
                request.commitment.abbreviated()
            )));
        }

        state.nonce += 1;
        let tx = tx_reference(&request.commitment, state.nonce);
        let ticket_id = state.next_ticket_id;
        state.next_ticket_id += 1;
        state.pending.insert(
            tx,
            PendingTx {
                ticket: Ticket {
                    ticket_id,
                    market_id: request.market_id,
                    bettor: *from,
                    commitment: request.commitment,
                    claimed: false,
                    candidate_handle: request.candidate_handle,
                    stake_handle: request.stake_handle,
                },
            },
        );

        debug!(%tx, ticket_id, market = %request.market_id, "Transaction accepted");
        Ok(tx)
    }

    async fn wait_for_confirmation(&self, tx: &TxReference) -> SubmissionResult<Receipt> {
        if self.hold_confirmations.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }

        let mut state = self.state.write().await;
        let pending = state
            .pending
            .remove(tx)
            .ok_or_else(|| SubmissionError::Rejected(format!("unknown transaction {tx}")))?;

        if let Some(reason) = self.next_revert.lock().take() {
            state.seen.remove(&pending.ticket.commitment);
            warn!(%tx, %reason, "Transaction reverted");
            return Err(SubmissionError::Reverted(reason));
        }

        state.block_number += 1;
        let receipt = Receipt {
            tx: *tx,
            ticket_id: pending.ticket.ticket_id,
            block_number: state.block_number,
        };
        state
            .tickets
            .entry(pending.ticket.market_id)
            .or_default()
            .push(pending.ticket);

        debug!(%tx, block = receipt.block_number, "Transaction finalized");
        Ok(receipt)
    }
}

#[async_trait]
impl LedgerQuery for InMemoryLedger {
    async fn tickets(&self, market: MarketId) -> QueryResult<Vec<Ticket>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.next_query_failure.lock().take() {
            return Err(QueryError::Unavailable(reason));
        }
        Ok(self
            .state
            .read()
            .await
            .tickets
            .get(&market)
            .cloned()
            .unwrap_or_default())
    }
}
