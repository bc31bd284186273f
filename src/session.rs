//! Prediction Session
//!
//! Ties the connected identity, the shared encryption adapter, the ledger
//! and the ticket cache into one user session.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   PredictionSession                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  identity ──┐                                            │
//! │  form ──────┼──► PredictionSubmitter ──► LedgerSubmitter │
//! │             │           │                                │
//! │             │      AdapterCell (shared, set up once)     │
//! │             │           │                                │
//! │  reveal ────┴──► TicketDecryptionCache ◄── LedgerQuery   │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use electionbet_fhe::{AdapterCell, Address, InMemoryRelayer, RelayerConfig};
use electionbet_ledger::{InMemoryLedger, LedgerQuery, LedgerSubmitter, QueryError, Ticket};
use electionbet_tickets::{tickets_for, TicketDecryptionCache, TicketView};
use electionbet_wallet::{
    CandidateBook, PredictionForm, PredictionSubmitter, SubmissionConfig, SubmissionFailure,
    SubmissionObserver, SubmissionOutcome, SubmissionPhase,
};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from session operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No wallet connected")]
    NotConnected,
    #[error("Wallet changed while listing predictions")]
    IdentityChanged,
    #[error("Invalid submission config: {0}")]
    InvalidConfig(String),
    #[error("Ticket query failed: {0}")]
    Query(#[from] QueryError),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// One user's session against a market
pub struct PredictionSession {
    config: SubmissionConfig,
    adapter: Arc<AdapterCell>,
    query: Arc<dyn LedgerQuery>,
    submitter: PredictionSubmitter,
    identity: RwLock<Option<Address>>,
    form: Mutex<PredictionForm>,
    reveal: AtomicBool,
    cache: RwLock<Option<Arc<TicketDecryptionCache>>>,
}

impl PredictionSession {
    pub fn new(
        config: SubmissionConfig,
        adapter: Arc<AdapterCell>,
        submitter: Arc<dyn LedgerSubmitter>,
        query: Arc<dyn LedgerQuery>,
    ) -> Self {
        Self {
            submitter: PredictionSubmitter::new(config.clone(), adapter.clone(), submitter),
            config,
            adapter,
            query,
            identity: RwLock::new(None),
            form: Mutex::new(PredictionForm::default()),
            reveal: AtomicBool::new(true),
            cache: RwLock::new(None),
        }
    }

    /// Session backed by the in-memory relayer and ledger
    pub fn in_memory(
        config: SubmissionConfig,
        relayer: Arc<InMemoryRelayer>,
        ledger: Arc<InMemoryLedger>,
    ) -> Self {
        let relayer_config = RelayerConfig {
            contract: config.contract,
            ..Default::default()
        };
        let adapter = Arc::new(AdapterCell::ready(relayer, relayer_config));
        Self::new(config, adapter, ledger.clone(), ledger)
    }

    /// Set the submission observer
    pub fn with_observer(mut self, observer: Arc<dyn SubmissionObserver>) -> Self {
        self.submitter = self.submitter.with_observer(observer);
        self
    }

    /// Set the candidate catalog
    pub fn with_candidates(mut self, candidates: CandidateBook) -> Self {
        self.submitter = self.submitter.with_candidates(candidates);
        self
    }

    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    pub fn adapter(&self) -> &Arc<AdapterCell> {
        &self.adapter
    }

    pub fn candidates(&self) -> &CandidateBook {
        self.submitter.candidates()
    }

    /// Switch to `identity`; a different identity starts a fresh ticket cache
    pub fn connect(&self, identity: Address) {
        let previous = self.identity.write().replace(identity);
        if previous != Some(identity) {
            info!(%identity, "Wallet connected");
            self.drop_cache();
        }
    }

    pub fn disconnect(&self) {
        if let Some(identity) = self.identity.write().take() {
            info!(%identity, "Wallet disconnected");
        }
        self.drop_cache();
    }

    pub fn identity(&self) -> Option<Address> {
        *self.identity.read()
    }

    pub fn select_candidate(&self, candidate: u32) {
        self.form.lock().select(candidate);
    }

    pub fn set_stake(&self, stake: impl Into<String>) {
        self.form.lock().set_stake(stake);
    }

    /// Snapshot of the form
    pub fn form(&self) -> PredictionForm {
        self.form.lock().clone()
    }

    /// Submit the form as entered.
    ///
    /// The stake field is cleared only if the attempt is confirmed and the
    /// user has not edited it in the meantime.
    pub async fn submit(&self) -> Result<SubmissionOutcome, SubmissionFailure> {
        let identity = self.identity();
        let mut attempt = self.form();
        let entered = attempt.stake.clone();

        let outcome = self.submitter.submit(identity.as_ref(), &mut attempt).await?;

        let mut form = self.form.lock();
        if form.stake == entered {
            form.clear_stake();
        }
        Ok(outcome)
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.submitter.phase()
    }

    /// Abandon a submission that has not reached the ledger
    pub fn cancel(&self) -> bool {
        self.submitter.cancel()
    }

    pub fn reveal(&self) -> bool {
        self.reveal.load(Ordering::Acquire)
    }

    pub fn set_reveal(&self, reveal: bool) {
        self.reveal.store(reveal, Ordering::Release);
    }

    /// Tickets of the connected identity in the configured market
    pub async fn my_tickets(&self) -> SessionResult<Vec<Ticket>> {
        let identity = self.identity().ok_or(SessionError::NotConnected)?;
        self.tickets_of(&identity).await
    }

    async fn tickets_of(&self, identity: &Address) -> SessionResult<Vec<Ticket>> {
        let all = self.query.tickets(self.config.market_id).await?;
        Ok(tickets_for(&all, identity))
    }

    /// List the connected identity's predictions, starting decryption of
    /// any ticket not yet revealed.
    ///
    /// Views of tickets still being decrypted show as decrypting; call
    /// `wait_for_decryption` and list again to see their plaintext.
    pub async fn my_predictions(&self) -> SessionResult<Vec<TicketView>> {
        self.config
            .validate()
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;
        let identity = self.identity().ok_or(SessionError::NotConnected)?;
        let mine = self.tickets_of(&identity).await?;

        // The wallet may have changed during the query. Hold the identity
        // until the views are built so a disconnect cannot land in between.
        let current = self.identity.read();
        match *current {
            None => return Err(SessionError::NotConnected),
            Some(now) if now != identity => {
                debug!(%identity, %now, "Identity changed during listing; discarding tickets");
                return Err(SessionError::IdentityChanged);
            }
            Some(_) => {}
        }

        let cache = self.cache_for(identity);
        let reveal = self.reveal();
        let requested = cache.sync(&mine, reveal);
        debug!(tickets = mine.len(), requested, "Listed predictions");
        Ok(cache.views(&mine, reveal))
    }

    /// Wait for outstanding ticket decryptions
    pub async fn wait_for_decryption(&self) {
        let cache = self.cache.read().clone();
        if let Some(cache) = cache {
            cache.wait_idle().await;
        }
    }

    fn cache_for(&self, identity: Address) -> Arc<TicketDecryptionCache> {
        let mut slot = self.cache.write();
        match slot.as_ref() {
            Some(cache) if *cache.identity() == identity => cache.clone(),
            _ => {
                let cache = Arc::new(TicketDecryptionCache::new(
                    self.adapter.clone(),
                    identity,
                    self.config.base_unit_scale,
                ));
                if let Some(old) = slot.replace(cache.clone()) {
                    old.close();
                }
                cache
            }
        }
    }

    fn drop_cache(&self) {
        if let Some(cache) = self.cache.write().take() {
            cache.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use electionbet_commitment::MarketId;
    use electionbet_ledger::TicketStatus;
    use electionbet_tickets::TicketDisplay;
    use std::time::Duration;

    fn alice() -> Address {
        Address::from_bytes([0xA1; 20])
    }

    fn session() -> (PredictionSession, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let session = PredictionSession::in_memory(
            SubmissionConfig::default(),
            Arc::new(InMemoryRelayer::new()),
            ledger.clone(),
        );
        (session, ledger)
    }

    #[tokio::test]
    async fn test_submit_then_reveal() {
        let (session, _ledger) = session();
        session.connect(alice());
        session.select_candidate(1);
        session.set_stake("0.05");

        let outcome = session.submit().await.unwrap();
        assert_eq!(outcome.request.value, 50_000);
        assert!(session.form().stake.is_empty());

        let views = session.my_predictions().await.unwrap();
        assert_eq!(views.len(), 1);
        session.wait_for_decryption().await;

        let views = session.my_predictions().await.unwrap();
        assert_eq!(
            views[0].display,
            TicketDisplay::Revealed {
                candidate_index: 1,
                stake: "0.05".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_requires_connection() {
        let (session, _ledger) = session();
        assert_eq!(session.my_predictions().await, Err(SessionError::NotConnected));

        session.select_candidate(0);
        session.set_stake("1");
        let failure = session.submit().await.unwrap_err();
        assert_eq!(failure.stage, electionbet_wallet::FailureStage::Validation);
        assert_eq!(session.form().stake, "1");
    }

    #[tokio::test]
    async fn test_hidden_when_reveal_off() {
        let (session, _ledger) = session();
        session.connect(alice());
        session.select_candidate(0);
        session.set_stake("1");
        session.submit().await.unwrap();

        assert!(session.reveal());
        session.set_reveal(false);
        let views = session.my_predictions().await.unwrap();
        assert_eq!(views[0].display, TicketDisplay::Hidden);
    }

    #[tokio::test]
    async fn test_switching_identity_resets_cache() {
        let (session, _ledger) = session();
        session.connect(alice());
        session.select_candidate(0);
        session.set_stake("1");
        session.submit().await.unwrap();
        session.my_predictions().await.unwrap();
        session.wait_for_decryption().await;

        session.connect(Address::from_bytes([0xB0; 20]));
        assert!(session.my_predictions().await.unwrap().is_empty());

        session.disconnect();
        assert_eq!(session.identity(), None);
    }

    /// Ledger view that answers ticket queries after a delay
    struct SlowQuery {
        inner: Arc<InMemoryLedger>,
        delay: Duration,
    }

    #[async_trait]
    impl LedgerQuery for SlowQuery {
        async fn tickets(&self, market: MarketId) -> Result<Vec<Ticket>, QueryError> {
            tokio::time::sleep(self.delay).await;
            self.inner.tickets(market).await
        }
    }

    /// Session whose ticket listing takes 50ms, with one confirmed ticket for alice
    async fn slow_session() -> (PredictionSession, Arc<InMemoryRelayer>) {
        let relayer = Arc::new(InMemoryRelayer::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let config = SubmissionConfig::default();
        let adapter = Arc::new(AdapterCell::ready(
            relayer.clone(),
            RelayerConfig {
                contract: config.contract,
                ..Default::default()
            },
        ));
        let query = Arc::new(SlowQuery {
            inner: ledger.clone(),
            delay: Duration::from_millis(50),
        });
        let session = PredictionSession::new(config, adapter, ledger, query);

        session.connect(alice());
        session.select_candidate(2);
        session.set_stake("1");
        session.submit().await.unwrap();
        (session, relayer)
    }

    #[tokio::test]
    async fn test_disconnect_during_listing() {
        let (session, relayer) = slow_session().await;

        let (listed, _) = tokio::join!(session.my_predictions(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.disconnect();
        });

        assert_eq!(listed, Err(SessionError::NotConnected));
        assert_eq!(relayer.decrypt_calls(), 0);
        session.wait_for_decryption().await;
        assert_eq!(relayer.decrypt_calls(), 0);
    }

    #[tokio::test]
    async fn test_switch_during_listing() {
        let (session, relayer) = slow_session().await;

        let (listed, _) = tokio::join!(session.my_predictions(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.connect(Address::from_bytes([0xB0; 20]));
        });

        assert_eq!(listed, Err(SessionError::IdentityChanged));
        assert_eq!(relayer.decrypt_calls(), 0);

        // the new identity lists its own, empty, set
        assert!(session.my_predictions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unusable_config_rejects_listing() {
        let ledger = Arc::new(InMemoryLedger::new());
        let relayer = Arc::new(InMemoryRelayer::new());
        let config = SubmissionConfig {
            base_unit_scale: 0,
            ..Default::default()
        };
        let session = PredictionSession::in_memory(config, relayer.clone(), ledger.clone());
        session.connect(alice());

        assert!(matches!(
            session.my_predictions().await,
            Err(SessionError::InvalidConfig(_))
        ));
        assert_eq!(ledger.query_count(), 0);
        assert_eq!(relayer.decrypt_calls(), 0);
    }

    #[test]
    fn test_views_serialize_for_display() {
        let view = TicketView {
            ticket_id: 3,
            commitment: "0xabcd…1234".to_string(),
            status: TicketStatus::Active,
            display: TicketDisplay::Revealed {
                candidate_index: 1,
                stake: "0.05".to_string(),
            },
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["ticket_id"], 3);
        assert_eq!(value["status"], "Active");
        assert_eq!(value["display"]["state"], "revealed");
        assert_eq!(value["display"]["candidate_index"], 1);
    }

    #[tokio::test]
    async fn test_query_failure_surfaces() {
        let (session, ledger) = session();
        session.connect(alice());
        ledger.fail_next_query("node offline");
        assert!(matches!(
            session.my_predictions().await,
            Err(SessionError::Query(QueryError::Unavailable(_)))
        ));
    }
}
