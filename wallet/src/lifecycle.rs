//! Encrypted Prediction Lifecycle
//!
//! Orchestrates one prediction from the form to a finalized ticket:
//! 1. Validate - check connection, selection and stake
//! 2. Encrypt - turn candidate and stake into ciphertext handles
//! 3. Commit - bind the handles to the submitter and market
//! 4. Broadcast - hand the payload to the ledger
//! 5. Confirm - wait for finalization
//!
//! Each attempt is an `AttemptState` value advanced by a single driver
//! loop. Only one attempt runs per submitter; a second `submit` while one
//! is running is rejected without touching the running attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use electionbet_commitment::{Commitment, MarketId};
use electionbet_fhe::{AdapterCell, Address, CiphertextHandle, EncryptedPayload};
use electionbet_ledger::{
    LedgerSubmitter, Receipt, StakeAmount, SubmissionError, SubmissionRequest, TxReference,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::candidate::CandidateBook;
use crate::errors::{FailureStage, LifecycleError, LifecycleResult, SubmissionFailure, ValidationError};
use crate::validation::{validate, PredictionForm, PredictionInput};

/// Observable progress of the current attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionPhase {
    Idle,
    Validating,
    Encrypting,
    Committing,
    Broadcasting,
    Confirming,
    Succeeded,
    Failed,
}

impl SubmissionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionPhase::Succeeded | SubmissionPhase::Failed)
    }

    /// Whether the transaction may already be on the network
    pub fn is_past_broadcast(&self) -> bool {
        matches!(self, SubmissionPhase::Broadcasting | SubmissionPhase::Confirming)
    }
}

/// Configuration for prediction submission
#[derive(Clone, Debug)]
pub struct SubmissionConfig {
    /// Market predictions are placed in
    pub market_id: MarketId,
    /// Prediction contract inputs are encrypted for
    pub contract: Address,
    /// Smallest accepted stake
    pub min_stake: StakeAmount,
    /// Ledger base units per whole stake unit
    pub base_unit_scale: u64,
    /// Upper bound on the wait for finalization
    pub confirmation_timeout: Duration,
    /// Display unit of stakes
    pub stake_unit: String,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            market_id: MarketId(1),
            contract: Address::ZERO,
            min_stake: StakeAmount::from_atto(10_000_000_000_000_000), // 0.01
            base_unit_scale: 1_000_000,
            confirmation_timeout: Duration::from_secs(120),
            stake_unit: "ETH".to_string(),
        }
    }
}

impl SubmissionConfig {
    pub fn validate(&self) -> LifecycleResult<()> {
        if self.min_stake.is_zero() {
            return Err(LifecycleError::InvalidConfig("min_stake must be positive".into()));
        }
        if self.base_unit_scale == 0 {
            return Err(LifecycleError::InvalidConfig("base_unit_scale must be positive".into()));
        }
        if self.confirmation_timeout.is_zero() {
            return Err(LifecycleError::InvalidConfig(
                "confirmation_timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// User-facing notification for a confirmed prediction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionNotice {
    pub title: String,
    pub message: String,
}

impl SubmissionNotice {
    pub fn confirmed(candidate_name: &str, stake: &StakeAmount, unit: &str) -> Self {
        Self {
            title: "Prediction Encrypted".to_string(),
            message: format!(
                "Your prediction for {candidate_name} ({stake} {unit}) has been encrypted and submitted on-chain."
            ),
        }
    }
}

/// Result of a confirmed attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub request: SubmissionRequest,
    pub tx: TxReference,
    pub receipt: Receipt,
    pub notice: SubmissionNotice,
}

impl SubmissionOutcome {
    pub fn commitment(&self) -> &Commitment {
        &self.request.commitment
    }

    pub fn handles(&self) -> (CiphertextHandle, CiphertextHandle) {
        (self.request.candidate_handle, self.request.stake_handle)
    }
}

/// Callbacks for lifecycle events
#[async_trait]
pub trait SubmissionObserver: Send + Sync {
    /// Called on every phase change, including the terminal one
    async fn on_phase(&self, phase: SubmissionPhase);
    /// Called once per confirmed attempt
    async fn on_succeeded(&self, outcome: &SubmissionOutcome);
    /// Called once per failed attempt
    async fn on_failed(&self, failure: &SubmissionFailure);
}

/// Default no-op observer
pub struct NoOpObserver;

#[async_trait]
impl SubmissionObserver for NoOpObserver {
    async fn on_phase(&self, _phase: SubmissionPhase) {}
    async fn on_succeeded(&self, _outcome: &SubmissionOutcome) {}
    async fn on_failed(&self, _failure: &SubmissionFailure) {}
}

/// Validated attempt data carried between stages
#[derive(Clone, Debug)]
struct Validated {
    submitter: Address,
    input: PredictionInput,
    stake_base_units: u64,
}

/// State of one attempt
enum AttemptState {
    Validating,
    Encrypting(Validated),
    Committing(Validated, EncryptedPayload),
    Broadcasting(Validated, SubmissionRequest),
    Confirming(Validated, SubmissionRequest, TxReference),
    Succeeded(Box<SubmissionOutcome>),
    Failed(SubmissionFailure),
}

impl AttemptState {
    fn phase(&self) -> SubmissionPhase {
        match self {
            AttemptState::Validating => SubmissionPhase::Validating,
            AttemptState::Encrypting(..) => SubmissionPhase::Encrypting,
            AttemptState::Committing(..) => SubmissionPhase::Committing,
            AttemptState::Broadcasting(..) => SubmissionPhase::Broadcasting,
            AttemptState::Confirming(..) => SubmissionPhase::Confirming,
            AttemptState::Succeeded(_) => SubmissionPhase::Succeeded,
            AttemptState::Failed(_) => SubmissionPhase::Failed,
        }
    }
}

/// Holds the single-attempt slot; releases it when dropped
struct AttemptGuard<'a> {
    in_flight: &'a AtomicBool,
    phase: &'a RwLock<SubmissionPhase>,
}

impl<'a> AttemptGuard<'a> {
    fn acquire(in_flight: &'a AtomicBool, phase: &'a RwLock<SubmissionPhase>) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { in_flight, phase })
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        let mut phase = self.phase.write();
        if phase.is_past_broadcast() {
            // the transaction may still land; keep the phase so callers can tell
            warn!(phase = ?*phase, "Submission abandoned after broadcast; transaction may still confirm");
        } else if !phase.is_terminal() {
            *phase = SubmissionPhase::Idle;
        }
        drop(phase);
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Resolves once a cancel has been requested
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Prediction submission state machine
pub struct PredictionSubmitter {
    config: SubmissionConfig,
    adapter: Arc<AdapterCell>,
    ledger: Arc<dyn LedgerSubmitter>,
    candidates: CandidateBook,
    observer: Arc<dyn SubmissionObserver>,
    phase: RwLock<SubmissionPhase>,
    in_flight: AtomicBool,
    cancel_tx: watch::Sender<bool>,
}

impl PredictionSubmitter {
    pub fn new(
        config: SubmissionConfig,
        adapter: Arc<AdapterCell>,
        ledger: Arc<dyn LedgerSubmitter>,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            config,
            adapter,
            ledger,
            candidates: CandidateBook::default(),
            observer: Arc::new(NoOpObserver),
            phase: RwLock::new(SubmissionPhase::Idle),
            in_flight: AtomicBool::new(false),
            cancel_tx,
        }
    }

    /// Set the lifecycle observer
    pub fn with_observer(mut self, observer: Arc<dyn SubmissionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Set the catalog used to name candidates in notifications
    pub fn with_candidates(mut self, candidates: CandidateBook) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    pub fn candidates(&self) -> &CandidateBook {
        &self.candidates
    }

    /// Phase of the current or most recent attempt
    pub fn phase(&self) -> SubmissionPhase {
        *self.phase.read()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Abandon the running attempt if it has not been broadcast yet.
    ///
    /// Returns true only if the attempt will end as cancelled. A
    /// transaction that reached the ledger cannot be recalled, so later
    /// cancels are ignored and return false.
    pub fn cancel(&self) -> bool {
        // Held across the send: the driver takes the write lock to pass the
        // broadcast gate, so it either sees this cancel or has already moved on.
        let phase = self.phase.read();
        if phase.is_past_broadcast() {
            warn!(phase = ?*phase, "Transaction already sent; cancel ignored");
            return false;
        }
        if *phase == SubmissionPhase::Idle || phase.is_terminal() || !self.is_in_flight() {
            return false;
        }
        info!(phase = ?*phase, "Cancelling prediction submission");
        self.cancel_tx.send_replace(true);
        true
    }

    /// Run one submission attempt.
    ///
    /// The stake is cleared from `form` only when the attempt is confirmed;
    /// on failure the form is left as entered so the user can retry.
    pub async fn submit(
        &self,
        identity: Option<&Address>,
        form: &mut PredictionForm,
    ) -> Result<SubmissionOutcome, SubmissionFailure> {
        let Some(_guard) = AttemptGuard::acquire(&self.in_flight, &self.phase) else {
            warn!("Submission already in flight; ignoring submit");
            return Err(SubmissionFailure::in_flight());
        };
        {
            let mut phase = self.phase.write();
            self.cancel_tx.send_replace(false);
            *phase = SubmissionPhase::Validating;
        }

        let result = self.drive(identity, form).await;
        if result.is_ok() {
            form.clear_stake();
        }
        result
    }

    async fn enter(&self, phase: SubmissionPhase) {
        *self.phase.write() = phase;
        debug!(?phase, "Submission phase");
        self.observer.on_phase(phase).await;
    }

    fn check(&self, identity: Option<&Address>, form: &PredictionForm) -> Result<Validated, SubmissionFailure> {
        self.config
            .validate()
            .map_err(|e| SubmissionFailure::new(FailureStage::Configuration, e))?;
        self.check_input(identity, form)
            .map_err(|e| SubmissionFailure::new(FailureStage::Validation, e))
    }

    fn check_input(&self, identity: Option<&Address>, form: &PredictionForm) -> Result<Validated, LifecycleError> {
        let input = validate(identity, form.candidate, &form.stake, &self.config.min_stake)?;
        let submitter = identity.copied().ok_or(ValidationError::NotConnected)?;
        let stake_base_units = input.base_units(self.config.base_unit_scale)?;
        Ok(Validated {
            submitter,
            input,
            stake_base_units,
        })
    }

    async fn encrypt(&self, attempt: &Validated) -> Result<EncryptedPayload, LifecycleError> {
        let adapter = self.adapter.get().await?;
        let payload = adapter
            .encrypt(
                &self.config.contract,
                &attempt.submitter,
                attempt.input.candidate_index,
                attempt.stake_base_units,
            )
            .await?;
        Ok(payload)
    }

    /// Drive one attempt from `Validating` to a terminal state
    async fn drive(
        &self,
        identity: Option<&Address>,
        form: &PredictionForm,
    ) -> Result<SubmissionOutcome, SubmissionFailure> {
        let mut cancel_rx = self.cancel_tx.subscribe();
        let mut state = AttemptState::Validating;

        loop {
            self.enter(state.phase()).await;

            state = match state {
                AttemptState::Validating => match self.check(identity, form) {
                    Ok(_) if *cancel_rx.borrow() => {
                        AttemptState::Failed(SubmissionFailure::new(FailureStage::Validation, LifecycleError::Cancelled))
                    }
                    Ok(attempt) => {
                        info!(submitter = %attempt.submitter, market = %self.config.market_id, "Submitting prediction");
                        AttemptState::Encrypting(attempt)
                    }
                    Err(failure) => AttemptState::Failed(failure),
                },

                AttemptState::Encrypting(attempt) => {
                    let outcome = tokio::select! {
                        biased;
                        _ = cancelled(&mut cancel_rx) => Err(LifecycleError::Cancelled),
                        payload = self.encrypt(&attempt) => payload,
                    };
                    match outcome {
                        Ok(_) if *cancel_rx.borrow() => {
                            AttemptState::Failed(SubmissionFailure::new(FailureStage::Encryption, LifecycleError::Cancelled))
                        }
                        Ok(payload) => AttemptState::Committing(attempt, payload),
                        Err(e) => AttemptState::Failed(SubmissionFailure::new(FailureStage::Encryption, e)),
                    }
                }

                AttemptState::Committing(attempt, payload) => {
                    // fresh handles every attempt, so the commitment is never reused
                    let commitment = Commitment::commit(
                        &attempt.submitter,
                        self.config.market_id,
                        &payload.candidate_handle,
                        &payload.stake_handle,
                    );
                    debug!(commitment = %commitment.abbreviated(), "Commitment computed");

                    // Broadcast gate: the last point at which the attempt can be
                    // abandoned. Decided under the phase lock so `cancel` cannot
                    // slip in between the check and the phase change.
                    let mut phase = self.phase.write();
                    if *cancel_rx.borrow() {
                        drop(phase);
                        AttemptState::Failed(SubmissionFailure::new(FailureStage::Commitment, LifecycleError::Cancelled))
                    } else {
                        *phase = SubmissionPhase::Broadcasting;
                        drop(phase);
                        let request = SubmissionRequest {
                            market_id: self.config.market_id,
                            candidate_handle: payload.candidate_handle,
                            stake_handle: payload.stake_handle,
                            proof: payload.proof,
                            commitment,
                            value: attempt.stake_base_units,
                        };
                        AttemptState::Broadcasting(attempt, request)
                    }
                }

                AttemptState::Broadcasting(attempt, request) => {
                    match self.ledger.broadcast(&attempt.submitter, &request).await {
                        Ok(tx) => {
                            info!(%tx, "Prediction broadcast");
                            AttemptState::Confirming(attempt, request, tx)
                        }
                        Err(e) => AttemptState::Failed(SubmissionFailure::new(FailureStage::Broadcast, e)),
                    }
                }

                AttemptState::Confirming(attempt, request, tx) => {
                    let waited = tokio::time::timeout(
                        self.config.confirmation_timeout,
                        self.ledger.wait_for_confirmation(&tx),
                    )
                    .await
                    .unwrap_or(Err(SubmissionError::ConfirmationTimeout));

                    match waited {
                        Ok(receipt) => {
                            let name = self.candidates.display_name(attempt.input.candidate_index);
                            let notice = SubmissionNotice::confirmed(&name, &attempt.input.stake, &self.config.stake_unit);
                            AttemptState::Succeeded(Box::new(SubmissionOutcome {
                                request,
                                tx,
                                receipt,
                                notice,
                            }))
                        }
                        Err(e) => AttemptState::Failed(SubmissionFailure::new(FailureStage::Confirmation, e)),
                    }
                }

                AttemptState::Succeeded(outcome) => {
                    info!(tx = %outcome.tx, ticket_id = outcome.receipt.ticket_id, "Prediction confirmed");
                    self.observer.on_succeeded(&outcome).await;
                    return Ok(*outcome);
                }

                AttemptState::Failed(failure) => {
                    if failure.is_cancelled() {
                        info!(stage = %failure.stage, "Prediction submission cancelled");
                    } else {
                        warn!(stage = %failure.stage, error = %failure.error, "Prediction submission failed");
                    }
                    self.observer.on_failed(&failure).await;
                    return Err(failure);
                }
            };
        }
    }
}
