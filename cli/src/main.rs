//! ElectionBet CLI
//!
//! Command-line client for encrypted election predictions.
//!
//! # Usage
//!
//! ```bash
//! # Write a configuration for the local chain
//! electionbet init --network local
//!
//! # List the ballot
//! electionbet candidates
//!
//! # Compute the commitment binding two ciphertext handles
//! electionbet commit --identity 0x.. --candidate-handle 0x.. --stake-handle 0x..
//!
//! # Place and reveal a prediction against the in-memory relayer and ledger
//! electionbet demo --candidate 1 --stake 0.05
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

use commands::{CandidatesCommand, CommitCommand, DemoCommand, InitCommand};
use config::{AppConfig, LogFormat};

/// ElectionBet client
#[derive(Parser)]
#[command(name = "electionbet")]
#[command(author = "ElectionBet Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Encrypted election predictions", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "ELECTIONBET_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file
    Init(InitCommand),

    /// List the candidates on the ballot
    Candidates(CandidatesCommand),

    /// Compute a submission commitment
    Commit(CommitCommand),

    /// Run a prediction end to end in memory
    Demo(DemoCommand),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `init` writes the file the other commands read
    let config = match cli.command {
        Commands::Init(_) | Commands::Version => AppConfig::default(),
        _ => AppConfig::load_or_default(cli.config.as_deref())?,
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        config.logging.format
    };
    logging::init(&level, format)?;

    match cli.command {
        Commands::Init(cmd) => cmd.execute(cli.config).await,
        Commands::Candidates(cmd) => cmd.execute().await,
        Commands::Commit(cmd) => cmd.execute(&config).await,
        Commands::Demo(cmd) => cmd.execute(&config).await,
        Commands::Version => {
            println!("electionbet {}", electionbet::VERSION);
            println!("Encrypted election predictions");
            Ok(())
        }
    }
}
