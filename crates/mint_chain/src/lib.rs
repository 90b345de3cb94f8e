// Chain-side vocabulary: amounts, artifacts, endpoints and wallet capabilities.

pub mod artifact;
pub mod jsonrpc;
pub mod provider;
pub mod rpc_config;
pub mod units;

// Re-export primary types for convenient access.
pub use alloy_primitives::{Address, B256, U256};
pub use artifact::{ContractArtifact, Deployment, network_label};
pub use jsonrpc::{JsonRpcContract, JsonRpcWallet, RpcClient};
pub use provider::{
    ContractHandle, ProviderError, TxParams, TxReceipt, WalletEvent, WalletProvider,
};
pub use rpc_config::RpcSettings;
pub use units::{BASE_UNIT_DECIMALS, format_display, to_base_units};
