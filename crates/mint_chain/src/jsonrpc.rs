//! Wallet and contract bindings over an Ethereum JSON-RPC endpoint.
//!
//! Uses raw `reqwest` against the node (or wallet bridge) configured in
//! [`RpcSettings`]. Account and network notifications are produced by a
//! background poller since plain HTTP has no push channel.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, B256, Bytes, U64, U256, keccak256};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::provider::{ContractHandle, ProviderError, TxParams, TxReceipt, WalletEvent, WalletProvider};
use crate::rpc_config::RpcSettings;

const MAX_SUPPLY_SIGNATURE: &str = "maxSupply()";
const MINT_SIGNATURE: &str = "mint(address)";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptWire {
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    gas_used: Option<U64>,
}

impl ReceiptWire {
    fn into_receipt(self, tx_hash: B256) -> Result<TxReceipt, ProviderError> {
        if self.status == Some(U64::ZERO) {
            return Err(ProviderError::Reverted { tx_hash });
        }
        Ok(TxReceipt {
            tx_hash,
            block_number: self.block_number.map(|n| n.to::<u64>()),
            gas_used: self.gas_used.map(|n| n.to::<u64>()),
        })
    }
}

fn decode_envelope<T: DeserializeOwned>(envelope: RpcEnvelope) -> Result<T, ProviderError> {
    if let Some(err) = envelope.error {
        return Err(ProviderError::from_rpc(err.code, err.message));
    }
    serde_json::from_value(envelope.result).map_err(|e| ProviderError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// RpcClient
// ---------------------------------------------------------------------------

/// Minimal JSON-RPC 2.0 client.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(settings: &RpcSettings) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: settings.url.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let envelope: RpcEnvelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ProviderError::Transport(format!("HTTP {status}")));
            }
            Err(e) => return Err(ProviderError::Decode(e.to_string())),
        };
        decode_envelope(envelope)
    }
}

// ---------------------------------------------------------------------------
// JsonRpcWallet
// ---------------------------------------------------------------------------

/// A [`WalletProvider`] backed by a node that manages unlocked accounts.
pub struct JsonRpcWallet {
    client: Arc<RpcClient>,
    settings: RpcSettings,
    price_method: String,
}

impl JsonRpcWallet {
    pub fn new(settings: RpcSettings, price_method: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Arc::new(RpcClient::new(&settings)?);
        Ok(Self {
            client,
            settings,
            price_method: price_method.into(),
        })
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    fn name(&self) -> &str {
        "json-rpc"
    }

    fn is_installed(&self) -> bool {
        true
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.client.call("eth_requestAccounts", json!([])).await
    }

    async fn network_id(&self) -> Result<u64, ProviderError> {
        let raw: String = self.client.call("net_version", json!([])).await?;
        parse_network_id(&raw)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<WalletEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let client = Arc::clone(&self.client);
                let interval = self.settings.event_poll_interval;
                handle.spawn(poll_wallet_events(client, interval, tx));
            }
            Err(_) => warn!("no async runtime; wallet change notifications disabled"),
        }
        rx
    }

    fn bind_contract(&self, address: Address) -> Arc<dyn ContractHandle> {
        Arc::new(JsonRpcContract::new(
            Arc::clone(&self.client),
            address,
            &self.price_method,
            self.settings.receipt_poll_interval,
        ))
    }
}

fn parse_network_id(raw: &str) -> Result<u64, ProviderError> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|_| ProviderError::Decode(format!("invalid network id: {raw:?}")))
}

/// Emit an event whenever the polled accounts or network differ from the
/// previous observation. The first observation is the baseline.
async fn poll_wallet_events(
    client: Arc<RpcClient>,
    interval: Duration,
    tx: mpsc::UnboundedSender<WalletEvent>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_accounts: Option<Vec<Address>> = None;
    let mut last_network: Option<u64> = None;

    loop {
        ticker.tick().await;
        if tx.is_closed() {
            break;
        }

        match client.call::<Vec<Address>>("eth_accounts", json!([])).await {
            Ok(accounts) => {
                if last_accounts.as_ref().is_some_and(|prev| *prev != accounts)
                    && tx.send(WalletEvent::AccountsChanged(accounts.clone())).is_err()
                {
                    break;
                }
                last_accounts = Some(accounts);
            }
            Err(e) => debug!(error = %e, "account poll failed"),
        }

        match client.call::<String>("net_version", json!([])).await {
            Ok(raw) => match parse_network_id(&raw) {
                Ok(network) => {
                    if last_network.is_some_and(|prev| prev != network)
                        && tx.send(WalletEvent::ChainChanged(network)).is_err()
                    {
                        break;
                    }
                    last_network = Some(network);
                }
                Err(e) => debug!(error = %e, "network poll returned garbage"),
            },
            Err(e) => debug!(error = %e, "network poll failed"),
        }
    }
    debug!("wallet event poller stopped");
}

// ---------------------------------------------------------------------------
// JsonRpcContract
// ---------------------------------------------------------------------------

/// [`ContractHandle`] issuing `eth_call` / `eth_sendTransaction` directly.
#[derive(Clone)]
pub struct JsonRpcContract {
    client: Arc<RpcClient>,
    address: Address,
    price_selector: [u8; 4],
    receipt_poll_interval: Duration,
}

impl std::fmt::Debug for JsonRpcContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcContract")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl JsonRpcContract {
    pub fn new(
        client: Arc<RpcClient>,
        address: Address,
        price_method: &str,
        receipt_poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            address,
            price_selector: selector(&format!("{price_method}()")),
            receipt_poll_interval,
        }
    }

    async fn view_u256(&self, selector: [u8; 4]) -> Result<U256, ProviderError> {
        let data = Bytes::copy_from_slice(&selector);
        let raw: Bytes = self
            .client
            .call("eth_call", json!([{ "to": self.address, "data": data }, "latest"]))
            .await?;
        decode_word(&raw)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt, ProviderError> {
        let client = &self.client;
        poll_receipt(tx_hash, self.receipt_poll_interval, move || {
            client.call("eth_getTransactionReceipt", json!([tx_hash]))
        })
        .await
    }
}

#[async_trait]
impl ContractHandle for JsonRpcContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn price(&self) -> Result<U256, ProviderError> {
        self.view_u256(self.price_selector).await
    }

    async fn max_supply(&self) -> Result<U256, ProviderError> {
        self.view_u256(selector(MAX_SUPPLY_SIGNATURE)).await
    }

    async fn mint(&self, to: Address, tx: TxParams) -> Result<TxReceipt, ProviderError> {
        let request = json!([{
            "from": tx.from,
            "to": self.address,
            "gas": U64::from(tx.gas_limit),
            "value": tx.value,
            "data": encode_mint_call(to),
        }]);
        let tx_hash: B256 = self.client.call("eth_sendTransaction", request).await?;
        info!(%tx_hash, contract = %self.address, "mint transaction submitted");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        info!(%tx_hash, block = ?receipt.block_number, "mint transaction mined");
        Ok(receipt)
    }
}

/// Poll until the transaction is mined.
///
/// The hash is already known to the node, so transport and decode failures
/// only skip a round. The caller's mint timeout bounds the wait.
async fn poll_receipt<F, Fut>(
    tx_hash: B256,
    interval: Duration,
    mut fetch: F,
) -> Result<TxReceipt, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<ReceiptWire>, ProviderError>>,
{
    loop {
        match fetch().await {
            Ok(Some(receipt)) => return receipt.into_receipt(tx_hash),
            Ok(None) => {}
            Err(e @ (ProviderError::Transport(_) | ProviderError::Decode(_))) => {
                debug!(%tx_hash, error = %e, "receipt poll failed; retrying");
            }
            Err(e) => return Err(e),
        }
        tokio::time::sleep(interval).await;
    }
}

/// First four bytes of the keccak hash of a function signature.
fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn encode_mint_call(to: Address) -> Bytes {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&selector(MINT_SIGNATURE));
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(to.as_slice());
    Bytes::from(data)
}

fn decode_word(raw: &[u8]) -> Result<U256, ProviderError> {
    if raw.len() < 32 {
        return Err(ProviderError::Decode(format!(
            "expected a 32-byte word, got {} bytes",
            raw.len()
        )));
    }
    Ok(U256::from_be_slice(&raw[..32]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> RpcEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn selectors_match_known_values() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn mint_calldata_layout() {
        let to = Address::repeat_byte(0x42);
        let data = encode_mint_call(to);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &selector(MINT_SIGNATURE));
        assert!(data[4..16].iter().all(|b| *b == 0));
        assert_eq!(&data[16..], to.as_slice());
    }

    #[test]
    fn decode_word_reads_first_slot() {
        let mut raw = [0u8; 32];
        raw[31] = 0x2a;
        assert_eq!(decode_word(&raw).unwrap(), U256::from(42u8));
    }

    #[test]
    fn decode_word_rejects_empty_return() {
        let err = decode_word(&[]).unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn envelope_result_decodes() {
        let accounts: Vec<Address> = decode_envelope(envelope(
            r#"{"jsonrpc":"2.0","id":1,"result":["0x1111111111111111111111111111111111111111"]}"#,
        ))
        .unwrap();
        assert_eq!(accounts, vec![Address::repeat_byte(0x11)]);
    }

    #[test]
    fn envelope_error_maps_code() {
        let err = decode_envelope::<Vec<Address>>(envelope(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"User rejected"}}"#,
        ))
        .unwrap_err();
        assert_eq!(err, ProviderError::UserRejected);

        let err = decode_envelope::<B256>(envelope(
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32000,"message":"insufficient funds for gas * price + value"}}"#,
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "insufficient funds for gas * price + value");
    }

    #[test]
    fn pending_receipt_is_none() {
        let receipt: Option<ReceiptWire> =
            decode_envelope(envelope(r#"{"jsonrpc":"2.0","id":3,"result":null}"#)).unwrap();
        assert!(receipt.is_none());
    }

    #[test]
    fn receipt_status_zero_is_revert() {
        let hash = B256::repeat_byte(0x01);
        let receipt: ReceiptWire = serde_json::from_str(
            r#"{"status":"0x0","blockNumber":"0x10","gasUsed":"0x5208"}"#,
        )
        .unwrap();
        assert_eq!(
            receipt.into_receipt(hash).unwrap_err(),
            ProviderError::Reverted { tx_hash: hash }
        );
    }

    #[test]
    fn receipt_success_converts_numbers() {
        let hash = B256::repeat_byte(0x02);
        let receipt: ReceiptWire = serde_json::from_str(
            r#"{"status":"0x1","blockNumber":"0x10","gasUsed":"0x5208"}"#,
        )
        .unwrap();
        let receipt = receipt.into_receipt(hash).unwrap();
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.gas_used, Some(21_000));
    }

    fn mined() -> ReceiptWire {
        serde_json::from_str(r#"{"status":"0x1","blockNumber":"0x7","gasUsed":"0x5208"}"#).unwrap()
    }

    fn scripted(
        responses: Vec<Result<Option<ReceiptWire>, ProviderError>>,
    ) -> impl FnMut() -> std::future::Ready<Result<Option<ReceiptWire>, ProviderError>> {
        let mut responses = std::collections::VecDeque::from(responses);
        move || std::future::ready(responses.pop_front().unwrap_or(Ok(None)))
    }

    #[tokio::test]
    async fn receipt_wait_survives_transient_failures() {
        let hash = B256::repeat_byte(0x03);
        let fetch = scripted(vec![
            Err(ProviderError::Transport("connection reset".into())),
            Ok(None),
            Err(ProviderError::Decode("truncated body".into())),
            Ok(Some(mined())),
        ]);

        let receipt = poll_receipt(hash, Duration::from_millis(1), fetch).await.unwrap();
        assert_eq!(receipt.tx_hash, hash);
        assert_eq!(receipt.block_number, Some(7));
    }

    #[tokio::test]
    async fn receipt_wait_stops_on_rpc_error() {
        let hash = B256::repeat_byte(0x04);
        let fetch = scripted(vec![
            Ok(None),
            Err(ProviderError::from_rpc(-32601, "method not found")),
            Ok(Some(mined())),
        ]);

        let err = poll_receipt(hash, Duration::from_millis(1), fetch).await.unwrap_err();
        assert_eq!(err.to_string(), "method not found");
    }

    #[test]
    fn network_id_accepts_decimal_and_hex() {
        assert_eq!(parse_network_id("5777").unwrap(), 5777);
        assert_eq!(parse_network_id("0x1").unwrap(), 1);
        assert!(parse_network_id("mainnet").is_err());
    }

    #[test]
    fn wallet_binds_contract_at_address() {
        let settings = RpcSettings::new("http://localhost:8545").unwrap();
        let wallet = JsonRpcWallet::new(settings, "listingPrice").unwrap();
        let contract = wallet.bind_contract(Address::repeat_byte(0x33));
        assert_eq!(contract.address(), Address::repeat_byte(0x33));
        assert!(wallet.is_installed());
    }
}
