use std::collections::HashMap;
use std::path::Path;

use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A compiled contract artifact: ABI plus the addresses it was deployed to,
/// keyed by network id (the `networks` map of a truffle build file).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractArtifact {
    #[serde(default, rename = "contractName", skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
    #[serde(default)]
    pub abi: serde_json::Value,
    #[serde(default)]
    pub networks: HashMap<String, Deployment>,
}

/// Where an artifact lives on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub address: Address,
    #[serde(default, rename = "transactionHash", skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
}

impl ContractArtifact {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse contract artifact")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read contract artifact: {}", path.display()))?;
        let artifact = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            networks = artifact.networks.len(),
            "contract artifact loaded"
        );
        Ok(artifact)
    }

    /// Deployed address on `network_id`, if the artifact knows one.
    pub fn deployment(&self, network_id: u64) -> Option<Address> {
        self.networks
            .get(&network_id.to_string())
            .map(|deployment| deployment.address)
    }

    pub fn with_deployment(mut self, network_id: u64, address: Address) -> Self {
        self.networks.insert(
            network_id.to_string(),
            Deployment {
                address,
                transaction_hash: None,
            },
        );
        self
    }

    /// Whether the ABI declares a function with this name.
    pub fn has_function(&self, name: &str) -> bool {
        self.abi.as_array().is_some_and(|entries| {
            entries.iter().any(|entry| {
                entry.get("type").and_then(|t| t.as_str()) == Some("function")
                    && entry.get("name").and_then(|n| n.as_str()) == Some(name)
            })
        })
    }

    /// Fail unless the ABI declares the price view, `maxSupply` and `mint`.
    pub fn ensure_mint_interface(&self, price_method: &str) -> Result<()> {
        let missing: Vec<&str> = [price_method, "maxSupply", "mint"]
            .into_iter()
            .filter(|name| !self.has_function(name))
            .collect();
        if !missing.is_empty() {
            anyhow::bail!(
                "contract artifact does not declare: {}",
                missing.join(", ")
            );
        }
        Ok(())
    }
}

/// Human-readable label for well-known network ids.
pub fn network_label(network_id: u64) -> Option<&'static str> {
    match network_id {
        1 => Some("Ethereum Mainnet"),
        5 => Some("Goerli"),
        137 => Some("Polygon"),
        8453 => Some("Base Mainnet"),
        11155111 => Some("Sepolia"),
        1337 | 5777 | 31337 => Some("Local Dev Chain"),
        _ => None,
    }
}
