//! Client Configuration
//!
//! Handles loading and saving client configuration from TOML files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use electionbet::commitment::MarketId;
use electionbet::config::{
    RelayerConfig, RelayerNetwork, SubmissionConfig, DEFAULT_BASE_UNIT_SCALE,
    DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_MARKET_ID, DEFAULT_STAKE_UNIT,
};
use electionbet::fhe::Address;
use electionbet::ledger::StakeAmount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Full client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Market and stake settings
    #[serde(default)]
    pub market: MarketSettings,

    /// Encryption relayer settings
    #[serde(default)]
    pub relayer: RelayerSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else the default location, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::load(&default_config_path()) {
                Err(ConfigError::NotFound(_)) => Ok(Self::local()),
                other => other,
            },
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Create configuration for a specific network
    pub fn for_network(network: &str) -> Result<Self, ConfigError> {
        match network {
            "local" => Ok(Self::local()),
            "sepolia" => Ok(Self::sepolia()),
            other => Err(ConfigError::Invalid(format!(
                "Unknown network '{}' (expected local or sepolia)",
                other
            ))),
        }
    }

    /// Local development chain
    pub fn local() -> Self {
        Self::default()
    }

    /// Sepolia test network. `market.contract` still has to be filled in
    /// with the deployed prediction contract.
    pub fn sepolia() -> Self {
        Self {
            relayer: RelayerSettings {
                network: RelayerNetwork::Sepolia,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                format: LogFormat::Json,
            },
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relayer.network == RelayerNetwork::Sepolia && self.market.contract == Address::ZERO
        {
            return Err(ConfigError::Invalid(
                "market.contract must be set for sepolia".to_string(),
            ));
        }

        self.submission_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Settings for the submission state machine
    pub fn submission_config(&self) -> SubmissionConfig {
        SubmissionConfig {
            market_id: MarketId(self.market.market_id),
            contract: self.market.contract,
            min_stake: self.market.min_stake,
            base_unit_scale: self.market.base_unit_scale,
            confirmation_timeout: Duration::from_secs(self.market.confirmation_timeout_secs),
            stake_unit: self.market.stake_unit.clone(),
        }
    }

    /// Settings for the encryption adapter
    pub fn relayer_config(&self) -> RelayerConfig {
        RelayerConfig {
            network: self.relayer.network,
            contract: self.market.contract,
        }
    }
}

/// Market and stake settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSettings {
    /// Market predictions are placed in
    pub market_id: u64,

    /// Deployed prediction contract
    pub contract: Address,

    /// Smallest accepted stake, in whole units
    pub min_stake: StakeAmount,

    /// Ledger base units per whole stake unit
    pub base_unit_scale: u64,

    pub confirmation_timeout_secs: u64,

    /// Display unit of stakes
    pub stake_unit: String,
}

impl Default for MarketSettings {
    fn default() -> Self {
        let defaults = SubmissionConfig::default();
        Self {
            market_id: DEFAULT_MARKET_ID,
            contract: defaults.contract,
            min_stake: defaults.min_stake,
            base_unit_scale: DEFAULT_BASE_UNIT_SCALE,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            stake_unit: DEFAULT_STAKE_UNIT.to_string(),
        }
    }
}

/// Encryption relayer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerSettings {
    pub network: RelayerNetwork,
}

impl Default for RelayerSettings {
    fn default() -> Self {
        Self {
            network: RelayerNetwork::Local,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter when RUST_LOG is unset
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Get default config directory
pub fn default_config_dir() -> PathBuf {
    directories::ProjectDirs::from("io", "electionbet", "electionbet")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".electionbet"))
}

/// Get default config file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}
