use std::sync::Arc;
use std::time::Duration;

use mint_chain::{
    Address, ContractArtifact, ContractHandle, ProviderError, WalletEvent, WalletProvider,
    network_label,
};
use mint_core::{MintConfig, MintError};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::account_data::AccountRefresher;

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Connection to the wallet.
///
/// The account and the contract handle only exist together, inside
/// `Connected`; an error only exists inside `Failed`.
#[derive(Debug, Clone)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected {
        account: Address,
        contract: Arc<dyn ContractHandle>,
        network_id: u64,
    },
    Failed {
        error: MintError,
    },
}

impl ConnectionState {
    pub fn status(&self) -> ConnectionStatus {
        match self {
            Self::Disconnected => ConnectionStatus::Disconnected,
            Self::Connecting => ConnectionStatus::Connecting,
            Self::Connected { .. } => ConnectionStatus::Connected,
            Self::Failed { .. } => ConnectionStatus::Failed,
        }
    }

    pub fn account(&self) -> Option<Address> {
        match self {
            Self::Connected { account, .. } => Some(*account),
            _ => None,
        }
    }

    pub fn contract(&self) -> Option<Arc<dyn ContractHandle>> {
        match self {
            Self::Connected { contract, .. } => Some(Arc::clone(contract)),
            _ => None,
        }
    }

    pub fn network_id(&self) -> Option<u64> {
        match self {
            Self::Connected { network_id, .. } => Some(*network_id),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&MintError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Status-line text for a failed connection.
    pub fn error_message(&self) -> Option<String> {
        self.error().map(MintError::user_message)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

// ---------------------------------------------------------------------------
// SessionSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    /// Reject any other network even if the artifact has a deployment there.
    pub expected_network_id: Option<u64>,
    pub connect_timeout: Option<Duration>,
}

impl SessionSettings {
    pub fn from_config(config: &MintConfig) -> Self {
        Self {
            expected_network_id: config.expected_network_id,
            connect_timeout: config.connect_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// WalletSession
// ---------------------------------------------------------------------------

struct Negotiated {
    account: Address,
    network_id: u64,
    contract: Arc<dyn ContractHandle>,
    events: mpsc::UnboundedReceiver<WalletEvent>,
}

/// Wallet session manager.
///
/// Created `Disconnected`. Only [`connect`](Self::connect), account-change
/// notifications and [`reset`](Self::reset) move it between states.
pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    artifact: ContractArtifact,
    settings: SessionSettings,
    refresher: Arc<dyn AccountRefresher>,
    state: ConnectionState,
    events: Option<mpsc::UnboundedReceiver<WalletEvent>>,
    generation: u64,
}

impl WalletSession {
    /// `provider` is `None` when no wallet is present in the environment.
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        artifact: ContractArtifact,
        settings: SessionSettings,
        refresher: Arc<dyn AccountRefresher>,
    ) -> Self {
        Self {
            provider,
            artifact,
            settings,
            refresher,
            state: ConnectionState::Disconnected,
            events: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    pub fn account(&self) -> Option<Address> {
        self.state.account()
    }

    pub fn contract(&self) -> Option<Arc<dyn ContractHandle>> {
        self.state.contract()
    }

    /// Bumped by every [`connect`](Self::connect) and [`reset`](Self::reset).
    /// Account switches inside a connection leave it unchanged.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    /// Authorize an account, bind the contract for the active network and
    /// subscribe to wallet notifications.
    ///
    /// Ends either `Connected` or `Failed`; nothing is retried. Calling it
    /// again restarts the whole negotiation with a fresh subscription.
    pub async fn connect(&mut self) -> &ConnectionState {
        self.events = None;
        self.state = ConnectionState::Connecting;
        self.generation += 1;
        info!(provider = ?self.provider_name(), "connecting to wallet");

        let outcome = match self.settings.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.negotiate())
                .await
                .unwrap_or_else(|_| {
                    Err(MintError::Timeout {
                        operation: "wallet authorization",
                        secs: limit.as_secs(),
                    })
                }),
            None => self.negotiate().await,
        };

        match outcome {
            Ok(Negotiated {
                account,
                network_id,
                contract,
                events,
            }) => {
                info!(
                    %account,
                    network_id,
                    network = network_label(network_id).unwrap_or("unknown"),
                    contract = %contract.address(),
                    "wallet connected"
                );
                self.refresher.contract_changed(Some(Arc::clone(&contract)));
                self.events = Some(events);
                self.state = ConnectionState::Connected {
                    account,
                    contract,
                    network_id,
                };
            }
            Err(error) => {
                warn!(error = %error, kind = ?error.kind(), "wallet connection failed");
                self.refresher.contract_changed(None);
                self.state = ConnectionState::Failed { error };
            }
        }
        &self.state
    }

    async fn negotiate(&self) -> Result<Negotiated, MintError> {
        let provider = self
            .provider
            .as_ref()
            .filter(|p| p.is_installed())
            .ok_or(MintError::ProviderUnavailable)?;

        let accounts = provider.request_accounts().await.map_err(connect_error)?;
        let account = *accounts
            .first()
            .ok_or_else(|| MintError::Unknown("wallet authorized no accounts".into()))?;

        let network_id = provider.network_id().await.map_err(connect_error)?;
        if self
            .settings
            .expected_network_id
            .is_some_and(|expected| expected != network_id)
        {
            return Err(MintError::NetworkMismatch {
                network_id: Some(network_id),
            });
        }
        let address = self
            .artifact
            .deployment(network_id)
            .ok_or(MintError::NetworkMismatch {
                network_id: Some(network_id),
            })?;

        let contract = provider.bind_contract(address);
        let events = provider.subscribe();
        Ok(Negotiated {
            account,
            network_id,
            contract,
            events,
        })
    }

    /// Switch the active account inside the current connection and ask for an
    /// account-data refresh. The contract handle stays bound.
    ///
    /// Returns `false` (and changes nothing) when not connected.
    pub async fn update_account(&mut self, account: Address) -> bool {
        let ConnectionState::Connected {
            account: current, ..
        } = &mut self.state
        else {
            warn!(%account, "account update ignored; wallet not connected");
            return false;
        };
        *current = account;
        info!(%account, "active account changed");
        self.refresher.refresh(account).await;
        true
    }

    /// Drop the connection and its subscription, back to `Disconnected`.
    pub fn reset(&mut self) {
        if self.events.take().is_some() || self.state.is_connected() {
            info!("wallet session reset");
        }
        self.state = ConnectionState::Disconnected;
        self.generation += 1;
        self.refresher.contract_changed(None);
    }

    /// Apply one wallet notification.
    pub async fn handle_event(&mut self, event: WalletEvent) {
        debug!(?event, "wallet event");
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                Some(account) => {
                    self.update_account(*account).await;
                }
                // Locked wallet or revoked permission.
                None => self.reset(),
            },
            WalletEvent::ChainChanged(network_id) => {
                info!(network_id, "network changed");
                self.reset();
            }
        }
    }

    /// Apply every notification already queued, without waiting.
    /// Returns how many were applied.
    pub async fn drain_events(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(events) = self.events.as_mut() {
            while let Ok(event) = events.try_recv() {
                pending.push(event);
            }
        }
        let count = pending.len();
        for event in pending {
            self.handle_event(event).await;
        }
        count
    }

    /// Wait for the next notification and apply it. `None` when there is no
    /// live subscription.
    pub async fn next_event(&mut self) -> Option<WalletEvent> {
        let event = self.events.as_mut()?.recv().await;
        match event {
            Some(event) => {
                self.handle_event(event.clone()).await;
                Some(event)
            }
            None => {
                debug!("wallet event stream closed");
                self.events = None;
                None
            }
        }
    }
}

fn connect_error(err: ProviderError) -> MintError {
    match err {
        ProviderError::UserRejected => MintError::UserRejected,
        other => MintError::Unknown(other.to_string()),
    }
}
