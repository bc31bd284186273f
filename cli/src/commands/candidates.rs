//! Candidates Command - List the ballot

use clap::Args;
use electionbet::wallet::CandidateBook;

/// List the candidates on the ballot
#[derive(Args)]
pub struct CandidatesCommand {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

impl CandidatesCommand {
    pub async fn execute(self) -> anyhow::Result<()> {
        let book = CandidateBook::default();

        if self.json {
            let profiles: Vec<_> = book.iter().collect();
            println!("{}", serde_json::to_string_pretty(&profiles)?);
            return Ok(());
        }

        println!("{:<4} {:<24} {:<14} {:>6} {:>8}", "ID", "NAME", "PARTY", "ODDS", "SUPPORT");
        for profile in book.iter() {
            println!(
                "{:<4} {:<24} {:<14} {:>6} {:>7.1}%",
                profile.id, profile.name, profile.party, profile.odds, profile.support
            );
        }

        Ok(())
    }
}
