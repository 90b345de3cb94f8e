use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything that can end a connect or mint cycle.
///
/// Every error is caught at the boundary where the external call was made and
/// folded into a terminal state carrying [`MintError::user_message`]. The
/// variant itself is kept alongside so callers can branch on [`ErrorKind`]
/// instead of matching display strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MintError {
    #[error("wallet provider is not installed")]
    ProviderUnavailable,

    #[error("no contract deployment for network {network_id:?}")]
    NetworkMismatch { network_id: Option<u64> },

    #[error("request rejected by the user")]
    UserRejected,

    #[error("{0}")]
    Transaction(String),

    #[error("{0}")]
    ViewQuery(String),

    #[error("timed out after {secs}s waiting for {operation}")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("a mint is already in flight")]
    MintInFlight,

    #[error("wallet is not connected")]
    NotConnected,

    #[error("invalid amount {amount:?}: {reason}")]
    InvalidAmount { amount: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unexpected error: {0}")]
    Unknown(String),
}

/// Coarse classification of a [`MintError`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ProviderUnavailable,
    NetworkMismatch,
    UserRejected,
    TransactionError,
    ViewQueryError,
    Timeout,
    /// Caller misuse: mint while another is in flight or while disconnected.
    InvalidState,
    InvalidInput,
    UnknownError,
}

impl MintError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProviderUnavailable => ErrorKind::ProviderUnavailable,
            Self::NetworkMismatch { .. } => ErrorKind::NetworkMismatch,
            Self::UserRejected => ErrorKind::UserRejected,
            Self::Transaction(_) => ErrorKind::TransactionError,
            Self::ViewQuery(_) => ErrorKind::ViewQueryError,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::MintInFlight | Self::NotConnected => ErrorKind::InvalidState,
            Self::InvalidAmount { .. } | Self::Config(_) => ErrorKind::InvalidInput,
            Self::Unknown(_) => ErrorKind::UnknownError,
        }
    }

    /// The single status line shown to the user.
    ///
    /// Connection failures collapse into three canned reasons; transaction and
    /// view-query failures surface the provider's own description.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderUnavailable => "Install wallet".into(),
            Self::NetworkMismatch { .. } => "Change network".into(),
            Self::UserRejected | Self::Unknown(_) => "Something went wrong".into(),
            Self::Transaction(msg) | Self::ViewQuery(msg) => msg.clone(),
            Self::Timeout { operation, .. } => format!("Timed out waiting for {operation}"),
            Self::MintInFlight => "A mint is already in progress".into(),
            Self::NotConnected => "Connect your wallet first".into(),
            Self::InvalidAmount { amount, .. } => format!("Invalid amount: {amount}"),
            Self::Config(msg) => format!("Configuration issue: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_failures_use_canned_messages() {
        assert_eq!(MintError::ProviderUnavailable.user_message(), "Install wallet");
        assert_eq!(
            MintError::NetworkMismatch { network_id: Some(5) }.user_message(),
            "Change network"
        );
        assert_eq!(MintError::UserRejected.user_message(), "Something went wrong");
        assert_eq!(
            MintError::Unknown("socket closed".into()).user_message(),
            "Something went wrong"
        );
    }

    #[test]
    fn transaction_errors_surface_provider_text() {
        let err = MintError::Transaction("insufficient funds".into());
        assert_eq!(err.user_message(), "insufficient funds");
        assert_eq!(err.to_string(), "insufficient funds");
        assert_eq!(err.kind(), ErrorKind::TransactionError);
    }

    #[test]
    fn kinds_cover_taxonomy() {
        assert_eq!(MintError::ProviderUnavailable.kind(), ErrorKind::ProviderUnavailable);
        assert_eq!(
            MintError::NetworkMismatch { network_id: None }.kind(),
            ErrorKind::NetworkMismatch
        );
        assert_eq!(MintError::UserRejected.kind(), ErrorKind::UserRejected);
        assert_eq!(MintError::ViewQuery("x".into()).kind(), ErrorKind::ViewQueryError);
        assert_eq!(
            MintError::Timeout { operation: "receipt", secs: 1 }.kind(),
            ErrorKind::Timeout
        );
        assert_eq!(MintError::MintInFlight.kind(), ErrorKind::InvalidState);
        assert_eq!(MintError::NotConnected.kind(), ErrorKind::InvalidState);
        assert_eq!(MintError::Unknown("?".into()).kind(), ErrorKind::UnknownError);
    }

    #[test]
    fn timeout_message_names_operation() {
        let err = MintError::Timeout { operation: "mint confirmation", secs: 30 };
        assert_eq!(err.user_message(), "Timed out waiting for mint confirmation");
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn error_kind_serializes() {
        let json = serde_json::to_string(&ErrorKind::TransactionError).unwrap();
        assert_eq!(json, "\"TransactionError\"");
    }
}
