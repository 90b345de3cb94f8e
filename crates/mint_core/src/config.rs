use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::MintError;

// ---------------------------------------------------------------------------
// PriceSource
// ---------------------------------------------------------------------------

/// Where the mint payment comes from.
///
/// `Fixed` carries an amount in display units (ether) that is converted to
/// base units before submission. `Live` reads the contract's price view right
/// before each submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PriceSource {
    Fixed { amount: String },
    Live,
}

impl Default for PriceSource {
    fn default() -> Self {
        Self::Live
    }
}

// ---------------------------------------------------------------------------
// MintConfig
// ---------------------------------------------------------------------------

/// Application configuration stored at `~/.mintpad/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MintConfig {
    /// Wallet JSON-RPC endpoint. `None` is treated as "no wallet installed".
    pub rpc_url: Option<String>,
    pub rpc_timeout_secs: u64,
    /// Contract build artifact (ABI + per-network deployments).
    pub artifact_path: Option<PathBuf>,
    pub expected_network_id: Option<u64>,
    /// Name of the contract's no-argument price view.
    pub price_method: String,
    pub price: PriceSource,
    pub gas_limit: u64,

    // Timeouts, 0 disables.
    pub connect_timeout_secs: u64,
    pub mint_timeout_secs: u64,

    pub event_poll_interval_ms: u64,
    pub receipt_poll_interval_ms: u64,

    pub log_level: String,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            rpc_timeout_secs: 30,
            artifact_path: None,
            expected_network_id: None,
            price_method: "listingPrice".into(),
            price: PriceSource::Live,
            gas_limit: 285_000,
            connect_timeout_secs: 120,
            mint_timeout_secs: 600,
            event_poll_interval_ms: 2_000,
            receipt_poll_interval_ms: 1_000,
            log_level: "info".into(),
        }
    }
}

impl MintConfig {
    /// Returns the base config directory: `~/.mintpad/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".mintpad"))
    }

    /// Returns the config file path: `~/.mintpad/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.mintpad/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Default artifact location: `~/.mintpad/SmartContract.json`
    pub fn default_artifact_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("SmartContract.json"))
    }

    /// Ensures all required directories exist.
    pub fn ensure_dirs() -> Result<()> {
        for dir in [Self::base_dir()?, Self::logs_dir()?] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Loads config from disk, or creates default if missing.
    pub fn load() -> Result<Self> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load config from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self =
                serde_json::from_str(&content).with_context(|| "Failed to parse config.json")?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to_path(&path)
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Check the fields that cannot be fixed up at runtime.
    pub fn validate(&self) -> Result<(), MintError> {
        if let Some(url) = &self.rpc_url {
            if !validate_url(url) {
                return Err(MintError::Config(format!("invalid RPC URL: {url}")));
            }
        }
        if self.gas_limit == 0 {
            return Err(MintError::Config("gas_limit must be non-zero".into()));
        }
        if self.price_method.trim().is_empty() {
            return Err(MintError::Config("price_method must not be empty".into()));
        }
        if let PriceSource::Fixed { amount } = &self.price {
            if amount.trim().is_empty() {
                return Err(MintError::Config("fixed price amount is empty".into()));
            }
        }
        Ok(())
    }

    pub fn artifact_path(&self) -> Result<PathBuf> {
        match &self.artifact_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_artifact_path(),
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.connect_timeout_secs)
    }

    pub fn mint_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.mint_timeout_secs)
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_interval_ms.max(1))
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms.max(1))
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}
