//! Capability traits for the two external collaborators: the wallet provider
//! that authorizes accounts, and the contract binding it hands out.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors any provider or contract binding may return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("user rejected the request")]
    UserRejected,

    /// The node or wallet answered with an error object. Displays as the bare
    /// message so it can be shown to the user as-is.
    #[error("{message}")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },
}

impl ProviderError {
    /// Map a JSON-RPC error object, recognising the user-rejection code.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        if code == USER_REJECTED_CODE {
            Self::UserRejected
        } else {
            Self::Rpc {
                code,
                message: message.into(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Events & transaction types
// ---------------------------------------------------------------------------

/// Notifications the wallet fires after a successful connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

/// Parameters attached to a state-changing contract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxParams {
    pub from: Address,
    /// Ceiling on gas estimation, a cost guard rather than a correctness check.
    pub gas_limit: u64,
    /// Payment in base units.
    pub value: U256,
}

/// A mined, successful transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A wallet that authorizes addresses and signs on the user's behalf.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Human-readable display name.
    fn name(&self) -> &str;

    fn is_installed(&self) -> bool;

    /// Ask the wallet to authorize accounts; the first is the active one.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    async fn network_id(&self) -> Result<u64, ProviderError>;

    /// Standing subscription to account and network changes. The stream ends
    /// when the receiver is dropped.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<WalletEvent>;

    /// Bind a contract handle at `address` on the wallet's current network.
    fn bind_contract(&self, address: Address) -> Arc<dyn ContractHandle>;
}

/// A deployed mint contract on one network.
#[async_trait]
pub trait ContractHandle: Send + Sync + fmt::Debug {
    fn address(&self) -> Address;

    /// Listing price in base units.
    async fn price(&self) -> Result<U256, ProviderError>;

    async fn max_supply(&self) -> Result<U256, ProviderError>;

    /// Submit `mint(to)` and wait for the receipt. `Err` covers both
    /// submission failures and reverted transactions.
    async fn mint(&self, to: Address, tx: TxParams) -> Result<TxReceipt, ProviderError>;
}
