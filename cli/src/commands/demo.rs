//! Demo Command - Place and reveal a prediction in memory
//!
//! Runs the full client flow against the in-memory relayer and ledger:
//! validate, encrypt, commit, broadcast, confirm, then list and decrypt the
//! submitter's tickets. Other bettors' tickets are seeded first so the
//! listing shows ownership filtering.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Args, ValueEnum};
use electionbet::commitment::Commitment;
use electionbet::fhe::{Address, InMemoryRelayer};
use electionbet::ledger::{InMemoryLedger, Ticket};
use electionbet::session::PredictionSession;
use electionbet::tickets::TicketDisplay;
use electionbet::wallet::{
    SubmissionFailure, SubmissionObserver, SubmissionOutcome, SubmissionPhase,
};
use tracing::info;

use crate::config::AppConfig;

/// Stage to inject a failure at
#[derive(Clone, Copy, Debug, ValueEnum)]
enum InjectedFailure {
    Encryption,
    Broadcast,
    Revert,
}

/// Run a prediction end to end against in-memory services
#[derive(Args)]
pub struct DemoCommand {
    /// Candidate index to predict
    #[arg(long, default_value_t = 1)]
    candidate: u32,

    /// Stake in whole units
    #[arg(long, default_value = "0.05")]
    stake: String,

    /// Submitting account (random if omitted)
    #[arg(long)]
    identity: Option<Address>,

    /// Tickets from other accounts to seed the market with
    #[arg(long, default_value_t = 2)]
    others: usize,

    /// List tickets without decrypting them
    #[arg(long)]
    hide: bool,

    /// Make the attempt fail at this stage
    #[arg(long, value_enum)]
    fail: Option<InjectedFailure>,

    /// Simulated relayer latency in milliseconds
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Print the ticket listing as JSON
    #[arg(long)]
    json: bool,
}

/// Prints each phase as the attempt advances
struct ProgressPrinter;

#[async_trait]
impl SubmissionObserver for ProgressPrinter {
    async fn on_phase(&self, phase: SubmissionPhase) {
        println!("  · {:?}", phase);
    }

    async fn on_succeeded(&self, outcome: &SubmissionOutcome) {
        println!();
        println!("✅ {}", outcome.notice.title);
        println!("   {}", outcome.notice.message);
        println!("   commitment: {}", outcome.commitment());
        println!("   tx:         {}", outcome.tx);
    }

    async fn on_failed(&self, failure: &SubmissionFailure) {
        println!();
        println!("❌ {}", failure.user_message());
    }
}

impl DemoCommand {
    pub async fn execute(self, config: &AppConfig) -> anyhow::Result<()> {
        let submission = config.submission_config();
        let relayer = Arc::new(
            InMemoryRelayer::new().with_latency(Duration::from_millis(self.latency_ms)),
        );
        let ledger = Arc::new(InMemoryLedger::new());

        self.seed_others(config, &relayer, &ledger).await;

        let identity = self
            .identity
            .unwrap_or_else(|| Address::from_bytes(rand::random()));
        info!(%identity, market = %submission.market_id, "Starting demo");

        match self.fail {
            Some(InjectedFailure::Encryption) => relayer.fail_next_encrypt("relayer unreachable"),
            Some(InjectedFailure::Broadcast) => ledger.fail_next_broadcast("nonce too low"),
            Some(InjectedFailure::Revert) => ledger.revert_next("market closed"),
            None => {}
        }

        let session = PredictionSession::in_memory(submission, relayer, ledger)
            .with_observer(Arc::new(ProgressPrinter));
        session.set_reveal(!self.hide);
        session.connect(identity);
        session.select_candidate(self.candidate);
        session.set_stake(self.stake.clone());

        println!("Submitting prediction as {}", identity);
        // The observer has already reported the failure
        let submitted = session.submit().await.is_ok();

        session.my_predictions().await?;
        session.wait_for_decryption().await;
        let views = session.my_predictions().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&views)?);
        } else {
            println!();
            println!("My predictions ({}):", views.len());
            for view in &views {
                let shown = match &view.display {
                    TicketDisplay::Hidden => "hidden".to_string(),
                    TicketDisplay::Decrypting => "decrypting...".to_string(),
                    TicketDisplay::Failed { message } => format!("unavailable ({})", message),
                    TicketDisplay::Revealed {
                        candidate_index,
                        stake,
                    } => format!(
                        "{} for {} {}",
                        session.candidates().display_name(*candidate_index),
                        stake,
                        config.market.stake_unit
                    ),
                };
                println!("  #{} {} [{}] {}", view.ticket_id, view.commitment, view.status, shown);
            }
        }

        if !submitted {
            anyhow::bail!("Prediction was not placed");
        }
        Ok(())
    }

    async fn seed_others(
        &self,
        config: &AppConfig,
        relayer: &InMemoryRelayer,
        ledger: &InMemoryLedger,
    ) {
        let submission = config.submission_config();
        for n in 0..self.others {
            let bettor = Address::from_bytes(rand::random());
            let candidate = (n % 3) as u64;
            let candidate_handle = relayer.seal(submission.contract, bettor, candidate);
            let stake_handle = relayer.seal(submission.contract, bettor, submission.base_unit_scale);
            ledger
                .insert_ticket(Ticket {
                    ticket_id: n as u64 + 1,
                    market_id: submission.market_id,
                    bettor,
                    commitment: Commitment::commit(
                        &bettor,
                        submission.market_id,
                        &candidate_handle,
                        &stake_handle,
                    ),
                    claimed: false,
                    candidate_handle,
                    stake_handle,
                })
                .await;
        }
    }
}
