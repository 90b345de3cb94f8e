use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mint_chain::{Address, ContractHandle, U256};
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Receiver of "account data may have changed" signals.
///
/// Implementations must tolerate repeated calls for the same account.
#[async_trait]
pub trait AccountRefresher: Send + Sync {
    async fn refresh(&self, account: Address);

    /// The session bound a new contract handle, or dropped it (`None`).
    fn contract_changed(&self, _contract: Option<Arc<dyn ContractHandle>>) {}
}

/// Values read on behalf of the active account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountData {
    pub account: Option<Address>,
    pub price: Option<U256>,
    pub max_supply: Option<U256>,
    pub loading: bool,
    pub error: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// In-memory [`AccountRefresher`] that re-reads the contract views into an
/// [`AccountData`] snapshot.
#[derive(Default)]
pub struct AccountDataStore {
    contract: RwLock<Option<Arc<dyn ContractHandle>>>,
    data: RwLock<AccountData>,
}

impl AccountDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> AccountData {
        self.data.read().clone()
    }
}

#[async_trait]
impl AccountRefresher for AccountDataStore {
    async fn refresh(&self, account: Address) {
        let contract = self.contract.read().clone();
        {
            let mut data = self.data.write();
            data.account = Some(account);
            data.loading = true;
            data.error = None;
        }

        let Some(contract) = contract else {
            let mut data = self.data.write();
            data.loading = false;
            data.error = Some("no contract bound".into());
            return;
        };

        let price = contract.price().await;
        let max_supply = contract.max_supply().await;

        let mut data = self.data.write();
        // A newer refresh for another account may have started meanwhile.
        if data.account != Some(account) {
            debug!(%account, "discarding stale account data");
            return;
        }
        let mut errors = Vec::new();
        match price {
            Ok(price) => data.price = Some(price),
            Err(e) => errors.push(e.to_string()),
        }
        match max_supply {
            Ok(supply) => data.max_supply = Some(supply),
            Err(e) => errors.push(e.to_string()),
        }
        if !errors.is_empty() {
            warn!(%account, errors = ?errors, "account data refresh incomplete");
            data.error = Some(errors.join("; "));
        }
        data.loading = false;
        data.refreshed_at = Some(Utc::now());
    }

    fn contract_changed(&self, contract: Option<Arc<dyn ContractHandle>>) {
        if contract.is_none() {
            *self.data.write() = AccountData::default();
        }
        *self.contract.write() = contract;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mint_chain::{ProviderError, TxParams, TxReceipt};

    #[derive(Debug)]
    struct StaticContract {
        price: Result<U256, ProviderError>,
    }

    #[async_trait]
    impl ContractHandle for StaticContract {
        fn address(&self) -> Address {
            Address::repeat_byte(0xcc)
        }
        async fn price(&self) -> Result<U256, ProviderError> {
            self.price.clone()
        }
        async fn max_supply(&self) -> Result<U256, ProviderError> {
            Ok(U256::from(10_000u32))
        }
        async fn mint(&self, _to: Address, _tx: TxParams) -> Result<TxReceipt, ProviderError> {
            Err(ProviderError::Transport("not used".into()))
        }
    }

    #[tokio::test]
    async fn refresh_without_contract_records_error() {
        let store = AccountDataStore::new();
        store.refresh(Address::repeat_byte(1)).await;

        let data = store.snapshot();
        assert_eq!(data.account, Some(Address::repeat_byte(1)));
        assert!(!data.loading);
        assert!(data.error.is_some());
    }

    #[tokio::test]
    async fn refresh_reads_contract_views() {
        let store = AccountDataStore::new();
        store.contract_changed(Some(Arc::new(StaticContract {
            price: Ok(U256::from(5u8)),
        })));
        store.refresh(Address::repeat_byte(2)).await;

        let data = store.snapshot();
        assert_eq!(data.price, Some(U256::from(5u8)));
        assert_eq!(data.max_supply, Some(U256::from(10_000u32)));
        assert!(data.error.is_none());
        assert!(data.refreshed_at.is_some());
    }

    #[tokio::test]
    async fn failed_view_keeps_other_value() {
        let store = AccountDataStore::new();
        store.contract_changed(Some(Arc::new(StaticContract {
            price: Err(ProviderError::from_rpc(-32000, "execution reverted")),
        })));
        store.refresh(Address::repeat_byte(3)).await;

        let data = store.snapshot();
        assert!(data.price.is_none());
        assert_eq!(data.max_supply, Some(U256::from(10_000u32)));
        assert_eq!(data.error.as_deref(), Some("execution reverted"));
    }

    #[tokio::test]
    async fn unbinding_clears_snapshot() {
        let store = AccountDataStore::new();
        store.contract_changed(Some(Arc::new(StaticContract {
            price: Ok(U256::from(1u8)),
        })));
        store.refresh(Address::repeat_byte(4)).await;
        store.contract_changed(None);

        assert_eq!(store.snapshot(), AccountData::default());
    }
}
