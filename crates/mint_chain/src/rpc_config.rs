use std::time::Duration;

use mint_core::{MintConfig, validate_url};
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Endpoint and polling cadence for a JSON-RPC wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcSettings {
    pub url: String,
    pub timeout_secs: u64,
    pub event_poll_interval: Duration,
    pub receipt_poll_interval: Duration,
}

impl RpcSettings {
    /// Settings for `url` with default timeout and polling intervals.
    ///
    /// Returns `Err` if the URL fails validation.
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let url = url.into();
        if !validate_url(&url) {
            anyhow::bail!("invalid RPC URL: {url}");
        }
        Ok(Self {
            url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            event_poll_interval: Duration::from_secs(2),
            receipt_poll_interval: Duration::from_secs(1),
        })
    }

    /// Settings derived from the application config, or `None` when no wallet
    /// endpoint is configured.
    pub fn from_config(config: &MintConfig) -> anyhow::Result<Option<Self>> {
        let Some(url) = config.rpc_url.as_deref() else {
            return Ok(None);
        };
        let mut settings = Self::new(url)?;
        settings.timeout_secs = config.rpc_timeout_secs.max(1);
        settings.event_poll_interval = config.event_poll_interval();
        settings.receipt_poll_interval = config.receipt_poll_interval();
        Ok(Some(settings))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
