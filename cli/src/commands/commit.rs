//! Commit Command - Compute or check a submission commitment

use clap::Args;
use electionbet::commitment::{Commitment, MarketId};
use electionbet::fhe::{Address, CiphertextHandle};

use crate::config::AppConfig;

/// Compute the commitment binding a submitter and market to two handles
#[derive(Args)]
pub struct CommitCommand {
    /// Submitting account
    #[arg(long)]
    identity: Address,

    /// Market id (defaults to the configured market)
    #[arg(long)]
    market: Option<u64>,

    /// Handle of the encrypted candidate index
    #[arg(long)]
    candidate_handle: CiphertextHandle,

    /// Handle of the encrypted stake
    #[arg(long)]
    stake_handle: CiphertextHandle,

    /// Check against this commitment instead of printing a new one
    #[arg(long)]
    verify: Option<Commitment>,
}

impl CommitCommand {
    pub async fn execute(self, config: &AppConfig) -> anyhow::Result<()> {
        let market = MarketId(self.market.unwrap_or(config.market.market_id));

        if let Some(expected) = self.verify {
            expected.verify(&self.identity, market, &self.candidate_handle, &self.stake_handle)?;
            println!("✅ Commitment {} matches", expected.abbreviated());
            return Ok(());
        }

        let commitment = Commitment::commit(
            &self.identity,
            market,
            &self.candidate_handle,
            &self.stake_handle,
        );
        println!("{}", commitment);
        Ok(())
    }
}
