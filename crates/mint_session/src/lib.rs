//! Wallet session and mint workflow.
//!
//! [`WalletSession`] owns the connection to the wallet and is the only writer
//! of [`ConnectionState`]. [`MintWorkflow`] borrows the session to read the
//! active account and contract handle and is the only writer of
//! [`MintAttempt`]. Both report account changes to an [`AccountRefresher`].

pub mod account_data;
pub mod session;
pub mod workflow;

pub use account_data::{AccountData, AccountDataStore, AccountRefresher};
pub use session::{ConnectionState, ConnectionStatus, SessionSettings, WalletSession};
pub use workflow::{
    DerivedValues, MintAttempt, MintOutcome, MintPhase, MintWorkflow, PendingMint,
    WorkflowSettings,
};
