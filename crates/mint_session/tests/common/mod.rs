#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mint_chain::{
    Address, B256, ContractArtifact, ContractHandle, ProviderError, TxParams, TxReceipt, U256,
    WalletEvent, WalletProvider,
};
use mint_session::{AccountRefresher, SessionSettings, WalletSession};
use parking_lot::Mutex;
use tokio::sync::mpsc;

pub const NETWORK_ID: u64 = 5777;

pub fn account(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn contract_address() -> Address {
    Address::repeat_byte(0xc0)
}

pub fn artifact() -> ContractArtifact {
    ContractArtifact::default().with_deployment(NETWORK_ID, contract_address())
}

// ---------------------------------------------------------------------------
// FakeContract
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FakeContract {
    pub price: Mutex<Result<U256, ProviderError>>,
    pub max_supply: Mutex<Result<U256, ProviderError>>,
    pub mint_results: Mutex<VecDeque<Result<TxReceipt, ProviderError>>>,
    pub mint_calls: Mutex<Vec<(Address, TxParams)>>,
    pub price_calls: Mutex<usize>,
    /// When set, `mint` sleeps this long before answering.
    pub mint_delay: Mutex<Option<Duration>>,
}

impl FakeContract {
    pub fn new(price: U256) -> Arc<Self> {
        Arc::new(Self {
            price: Mutex::new(Ok(price)),
            max_supply: Mutex::new(Ok(U256::from(10_000u32))),
            mint_results: Mutex::new(VecDeque::new()),
            mint_calls: Mutex::new(Vec::new()),
            price_calls: Mutex::new(0),
            mint_delay: Mutex::new(None),
        })
    }

    pub fn queue_mint(&self, result: Result<TxReceipt, ProviderError>) {
        self.mint_results.lock().push_back(result);
    }

    pub fn mint_calls(&self) -> Vec<(Address, TxParams)> {
        self.mint_calls.lock().clone()
    }

    pub fn price_calls(&self) -> usize {
        *self.price_calls.lock()
    }
}

pub fn receipt() -> TxReceipt {
    TxReceipt {
        tx_hash: B256::repeat_byte(0x77),
        block_number: Some(12),
        gas_used: Some(120_000),
    }
}

#[async_trait]
impl ContractHandle for FakeContract {
    fn address(&self) -> Address {
        contract_address()
    }

    async fn price(&self) -> Result<U256, ProviderError> {
        *self.price_calls.lock() += 1;
        self.price.lock().clone()
    }

    async fn max_supply(&self) -> Result<U256, ProviderError> {
        self.max_supply.lock().clone()
    }

    async fn mint(&self, to: Address, tx: TxParams) -> Result<TxReceipt, ProviderError> {
        self.mint_calls.lock().push((to, tx));
        let delay = *self.mint_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.mint_results.lock().pop_front();
        next.unwrap_or_else(|| Ok(receipt()))
    }
}

// ---------------------------------------------------------------------------
// FakeWallet
// ---------------------------------------------------------------------------

pub struct FakeWallet {
    pub installed: bool,
    pub accounts: Mutex<Result<Vec<Address>, ProviderError>>,
    pub network_id: Mutex<u64>,
    pub contract: Arc<FakeContract>,
    pub events: Mutex<Option<mpsc::UnboundedSender<WalletEvent>>>,
    pub subscriptions: Mutex<usize>,
    /// When set, `request_accounts` never answers.
    pub hang: bool,
}

impl FakeWallet {
    pub fn new(contract: Arc<FakeContract>) -> Arc<Self> {
        Arc::new(Self {
            installed: true,
            accounts: Mutex::new(Ok(vec![account(0xa1)])),
            network_id: Mutex::new(NETWORK_ID),
            contract,
            events: Mutex::new(None),
            subscriptions: Mutex::new(0),
            hang: false,
        })
    }

    /// Fire a wallet notification into the live subscription.
    pub fn emit(&self, event: WalletEvent) -> bool {
        self.events
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.accounts.lock().clone()
    }

    async fn network_id(&self) -> Result<u64, ProviderError> {
        Ok(*self.network_id.lock())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<WalletEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock() = Some(tx);
        *self.subscriptions.lock() += 1;
        rx
    }

    fn bind_contract(&self, address: Address) -> Arc<dyn ContractHandle> {
        assert_eq!(address, contract_address());
        self.contract.clone()
    }
}

// ---------------------------------------------------------------------------
// RecordingRefresher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingRefresher {
    pub calls: Mutex<Vec<Address>>,
    pub bound: Mutex<Option<Address>>,
}

impl RecordingRefresher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Address> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AccountRefresher for RecordingRefresher {
    async fn refresh(&self, account: Address) {
        self.calls.lock().push(account);
    }

    fn contract_changed(&self, contract: Option<Arc<dyn ContractHandle>>) {
        *self.bound.lock() = contract.map(|c| c.address());
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn session_with(
    wallet: Option<Arc<FakeWallet>>,
    refresher: Arc<RecordingRefresher>,
) -> WalletSession {
    WalletSession::new(
        wallet.map(|w| w as Arc<dyn WalletProvider>),
        artifact(),
        SessionSettings::default(),
        refresher,
    )
}

/// Both present or both absent.
pub fn assert_pairing(session: &WalletSession) {
    assert_eq!(
        session.account().is_some(),
        session.contract().is_some(),
        "account and contract handle out of step: {:?}",
        session.state()
    );
}
