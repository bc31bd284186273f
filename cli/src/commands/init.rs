//! Init Command - Write a client configuration

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::config::{default_config_path, AppConfig};

/// Write a configuration file for a network
#[derive(Args)]
pub struct InitCommand {
    /// Network to configure (local, sepolia)
    #[arg(short, long, default_value = "local")]
    network: String,

    /// Force overwrite existing configuration
    #[arg(short, long)]
    force: bool,
}

impl InitCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> anyhow::Result<()> {
        let config_path = config_path.unwrap_or_else(default_config_path);
        let config = AppConfig::for_network(&self.network)?;

        info!("Initializing configuration for {} network", self.network);

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Configuration already exists at {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        config.save(&config_path)?;
        info!("Configuration saved to {}", config_path.display());

        println!();
        println!("✅ Configuration written to {}", config_path.display());
        println!();
        println!("Market:      {}", config.market.market_id);
        println!("Minimum bet: {} {}", config.market.min_stake, config.market.stake_unit);
        println!("Relayer:     {}", config.relayer.network);
        println!();
        if config.validate().is_err() {
            println!("Set market.contract to the deployed prediction contract before use.");
        } else {
            println!("Try it out:");
            println!("  electionbet demo --config {}", config_path.display());
        }

        Ok(())
    }
}
