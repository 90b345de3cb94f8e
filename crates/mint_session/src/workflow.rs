use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mint_chain::{
    Address, B256, ContractHandle, ProviderError, TxParams, TxReceipt, U256, format_display,
    to_base_units,
};
use mint_core::{ErrorKind, MintConfig, MintError, PriceSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::account_data::AccountRefresher;
use crate::session::WalletSession;

pub const SUBMITTING_MESSAGE: &str = "Minting your NFT...";
pub const SUCCESS_MESSAGE: &str = "Successfully minted your NFT";

// ---------------------------------------------------------------------------
// MintAttempt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MintPhase {
    Idle,
    Submitting,
    Success,
    Error,
    /// No receipt within the mint timeout. The transaction may still land.
    TimedOut,
}

impl MintPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::TimedOut)
    }
}

/// One pass through the mint lifecycle. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintAttempt {
    pub id: String,
    pub phase: MintPhase,
    pub message: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub tx_hash: Option<B256>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl MintAttempt {
    pub fn idle() -> Self {
        Self {
            id: String::new(),
            phase: MintPhase::Idle,
            message: None,
            error_kind: None,
            tx_hash: None,
            started_at: None,
            finished_at: None,
        }
    }

    fn submitting() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phase: MintPhase::Submitting,
            message: Some(SUBMITTING_MESSAGE.into()),
            started_at: Some(Utc::now()),
            ..Self::idle()
        }
    }

    fn succeed(&mut self, receipt: &TxReceipt) {
        self.phase = MintPhase::Success;
        self.message = Some(SUCCESS_MESSAGE.into());
        self.tx_hash = Some(receipt.tx_hash);
        self.finished_at = Some(Utc::now());
    }

    fn fail(&mut self, error: &MintError) {
        self.phase = if error.kind() == ErrorKind::Timeout {
            MintPhase::TimedOut
        } else {
            MintPhase::Error
        };
        self.message = Some(error.user_message());
        self.error_kind = Some(error.kind());
        self.finished_at = Some(Utc::now());
    }
}

impl Default for MintAttempt {
    fn default() -> Self {
        Self::idle()
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub price: PriceSource,
    pub gas_limit: u64,
    pub mint_timeout: Option<Duration>,
}

impl WorkflowSettings {
    pub fn from_config(config: &MintConfig) -> Self {
        Self {
            price: config.price.clone(),
            gas_limit: config.gas_limit,
            mint_timeout: config.mint_timeout(),
        }
    }
}

/// Price with any fixed amount already converted to base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolvedPrice {
    Fixed(U256),
    Live,
}

/// Latest values read from the contract views, for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivedValues {
    pub price: Option<U256>,
    pub max_supply: Option<U256>,
}

// ---------------------------------------------------------------------------
// PendingMint / MintOutcome
// ---------------------------------------------------------------------------

/// A mint that has been admitted and marked `Submitting` but not yet sent.
///
/// Owns everything it needs so the workflow stays free while the transaction
/// is in flight. The attempt stays `Submitting` only while this value, its
/// `run` future or the resulting [`MintOutcome`] is alive; once all of them
/// are dropped the workflow fails the attempt on its next admission check.
#[derive(Debug)]
pub struct PendingMint {
    ticket: Arc<str>,
    account: Address,
    contract: Arc<dyn ContractHandle>,
    price: ResolvedPrice,
    gas_limit: u64,
    timeout: Option<Duration>,
}

/// Result of [`PendingMint::run`], to be handed back to
/// [`MintWorkflow::finish`].
#[derive(Debug)]
pub struct MintOutcome {
    ticket: Arc<str>,
    account: Address,
    contract: Arc<dyn ContractHandle>,
    pub result: Result<TxReceipt, MintError>,
}

impl PendingMint {
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn attempt_id(&self) -> &str {
        &self.ticket
    }

    /// Resolve the payment, submit and wait for the receipt.
    pub async fn run(self) -> MintOutcome {
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.submit())
                .await
                .unwrap_or_else(|_| {
                    Err(MintError::Timeout {
                        operation: "mint confirmation",
                        secs: limit.as_secs(),
                    })
                }),
            None => self.submit().await,
        };
        MintOutcome {
            ticket: self.ticket,
            account: self.account,
            contract: self.contract,
            result,
        }
    }

    async fn submit(&self) -> Result<TxReceipt, MintError> {
        let value = match self.price {
            ResolvedPrice::Fixed(value) => value,
            ResolvedPrice::Live => self.contract.price().await.map_err(view_error)?,
        };
        debug!(
            attempt_id = %self.ticket,
            account = %self.account,
            value = %format_display(value),
            gas_limit = self.gas_limit,
            "submitting mint"
        );

        let tx = TxParams {
            from: self.account,
            gas_limit: self.gas_limit,
            value,
        };
        self.contract
            .mint(self.account, tx)
            .await
            .map_err(|e| MintError::Transaction(e.to_string()))
    }
}

fn view_error(err: ProviderError) -> MintError {
    MintError::ViewQuery(err.to_string())
}

// ---------------------------------------------------------------------------
// MintWorkflow
// ---------------------------------------------------------------------------

/// Orchestrates mint attempts against the session's contract.
///
/// At most one attempt is in flight: [`begin`](Self::begin) refuses while the
/// current attempt is `Submitting`.
pub struct MintWorkflow {
    price: ResolvedPrice,
    gas_limit: u64,
    mint_timeout: Option<Duration>,
    refresher: Arc<dyn AccountRefresher>,
    attempt: MintAttempt,
    derived: DerivedValues,
    status: Option<String>,
    in_flight: Option<Weak<str>>,
    observed_generation: Option<u64>,
}

impl MintWorkflow {
    /// Fails when a fixed price is not an exact display amount.
    pub fn new(
        settings: WorkflowSettings,
        refresher: Arc<dyn AccountRefresher>,
    ) -> Result<Self, MintError> {
        let price = match &settings.price {
            PriceSource::Fixed { amount } => ResolvedPrice::Fixed(to_base_units(amount)?),
            PriceSource::Live => ResolvedPrice::Live,
        };
        Ok(Self {
            price,
            gas_limit: settings.gas_limit,
            mint_timeout: settings.mint_timeout,
            refresher,
            attempt: MintAttempt::idle(),
            derived: DerivedValues::default(),
            status: None,
            in_flight: None,
            observed_generation: None,
        })
    }

    pub fn attempt(&self) -> &MintAttempt {
        &self.attempt
    }

    pub fn phase(&self) -> MintPhase {
        self.attempt.phase
    }

    /// The single user-visible status line.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn derived(&self) -> &DerivedValues {
        &self.derived
    }

    /// Whether a mint button should be enabled.
    pub fn can_mint(&self, session: &WalletSession) -> bool {
        session.state().is_connected() && !self.is_in_flight()
    }

    /// `Submitting` with a live pending mint or outcome somewhere.
    fn is_in_flight(&self) -> bool {
        self.attempt.phase == MintPhase::Submitting
            && self
                .in_flight
                .as_ref()
                .is_some_and(|ticket| ticket.strong_count() > 0)
    }

    /// Fail a `Submitting` attempt whose pending mint and outcome were both
    /// dropped without reaching [`finish`](Self::finish).
    pub fn reap_abandoned(&mut self) -> bool {
        if self.attempt.phase != MintPhase::Submitting || self.is_in_flight() {
            return false;
        }
        self.fail_abandoned();
        true
    }

    /// Give up on the in-flight attempt `attempt_id`. Its outcome, if it ever
    /// arrives, is ignored. Returns whether anything was abandoned.
    pub fn abandon(&mut self, attempt_id: &str) -> bool {
        if self.attempt.phase != MintPhase::Submitting || self.attempt.id != attempt_id {
            return false;
        }
        self.fail_abandoned();
        true
    }

    fn fail_abandoned(&mut self) {
        warn!(attempt_id = %self.attempt.id, "mint abandoned before completion");
        self.attempt.fail(&MintError::Unknown(
            "mint abandoned before completion".into(),
        ));
        self.status = self.attempt.message.clone();
        self.in_flight = None;
    }

    /// Admit a new attempt and mark it `Submitting`.
    pub fn begin(&mut self, session: &WalletSession) -> Result<PendingMint, MintError> {
        self.reap_abandoned();
        if self.attempt.phase == MintPhase::Submitting {
            warn!(attempt_id = %self.attempt.id, "mint rejected; another is in flight");
            return Err(MintError::MintInFlight);
        }
        let (Some(account), Some(contract)) = (session.account(), session.contract()) else {
            return Err(MintError::NotConnected);
        };

        self.attempt = MintAttempt::submitting();
        self.status = self.attempt.message.clone();
        let ticket: Arc<str> = Arc::from(self.attempt.id.as_str());
        self.in_flight = Some(Arc::downgrade(&ticket));
        info!(attempt_id = %self.attempt.id, %account, "mint started");

        Ok(PendingMint {
            ticket,
            account,
            contract,
            price: self.price,
            gas_limit: self.gas_limit,
            timeout: self.mint_timeout,
        })
    }

    /// Record the outcome of the in-flight attempt.
    ///
    /// On success, requests exactly one account-data refresh and re-reads the
    /// contract views. Outcomes for any other attempt are ignored.
    pub async fn finish(&mut self, outcome: MintOutcome) -> &MintAttempt {
        if *outcome.ticket != *self.attempt.id || self.attempt.phase != MintPhase::Submitting {
            warn!(attempt_id = %outcome.ticket, "ignoring outcome of a stale mint attempt");
            return &self.attempt;
        }
        self.in_flight = None;

        match outcome.result {
            Ok(receipt) => {
                self.attempt.succeed(&receipt);
                self.status = self.attempt.message.clone();
                info!(
                    attempt_id = %self.attempt.id,
                    tx_hash = %receipt.tx_hash,
                    gas_used = ?receipt.gas_used,
                    "mint succeeded"
                );
                self.refresher.refresh(outcome.account).await;
                self.refresh_from(&outcome.contract).await;
            }
            Err(error) => {
                self.attempt.fail(&error);
                self.status = self.attempt.message.clone();
                warn!(
                    attempt_id = %self.attempt.id,
                    error = %error,
                    kind = ?error.kind(),
                    "mint failed"
                );
            }
        }
        &self.attempt
    }

    /// [`begin`](Self::begin), [`PendingMint::run`] and
    /// [`finish`](Self::finish) in one go.
    ///
    /// `Err` only when the attempt was not admitted; transaction failures end
    /// up in the returned attempt.
    pub async fn mint(&mut self, session: &WalletSession) -> Result<&MintAttempt, MintError> {
        let pending = self.begin(session)?;
        let outcome = pending.run().await;
        Ok(self.finish(outcome).await)
    }

    /// Query price and max supply. Each query fails independently; a failure
    /// only updates the status line.
    pub async fn refresh_derived_values(&mut self, session: &WalletSession) -> &DerivedValues {
        if let Some(contract) = session.contract() {
            self.refresh_from(&contract).await;
        }
        &self.derived
    }

    async fn refresh_from(&mut self, contract: &Arc<dyn ContractHandle>) {
        match contract.price().await {
            Ok(price) => self.derived.price = Some(price),
            Err(e) => self.record_view_error("price", e),
        }
        match contract.max_supply().await {
            Ok(supply) => self.derived.max_supply = Some(supply),
            Err(e) => self.record_view_error("max supply", e),
        }
    }

    fn record_view_error(&mut self, view: &str, err: ProviderError) {
        let error = view_error(err);
        warn!(view, error = %error, "contract view query failed");
        self.status = Some(error.user_message());
    }

    /// React to the session connecting, failing or being reset.
    ///
    /// Keyed on [`WalletSession::generation`], so a reconnect that binds the
    /// same deployment still counts. When a contract is bound the derived
    /// values are re-read and one account-data refresh is requested. Returns
    /// whether anything was refreshed.
    pub async fn on_connection_change(&mut self, session: &WalletSession) -> bool {
        let generation = session.generation();
        if self.observed_generation == Some(generation) {
            return false;
        }
        self.observed_generation = Some(generation);
        self.derived = DerivedValues::default();

        let (Some(account), Some(contract)) = (session.account(), session.contract()) else {
            return false;
        };
        debug!(%account, contract = %contract.address(), generation, "contract bound; refreshing");
        self.refresh_from(&contract).await;
        self.refresher.refresh(account).await;
        true
    }
}
