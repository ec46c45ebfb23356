//! Errors: wallet refusals, operation failures and their user-facing messages

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::protocol::codes;
use crate::core::{AmountError, ChainId, InvalidAddress};

pub type WalletResult<T> = Result<T, WalletError>;

/// EIP-1193 provider refusal (`{code, message}`)
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn user_rejected() -> Self {
        Self::new(codes::USER_REJECTED, "User rejected the request.")
    }

    /// A failure raised on our side of the provider boundary.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(codes::TRANSPORT, message)
    }

    /// A rejection whose `code` may be missing or not an integer.
    pub fn from_rejection(code: Option<f64>, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| "unknown provider error".to_string());
        match code.filter(|c| c.is_finite() && c.fract() == 0.0) {
            Some(code) => Self::new(code as i64, message),
            None => Self::transport(message),
        }
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code == codes::USER_REJECTED
    }

    /// Refusals answered by registering the chain instead of switching to it.
    pub fn wants_registration(&self) -> bool {
        self.code == codes::UNRECOGNIZED_CHAIN || self.code == codes::INTERNAL_ERROR
    }
}

/// The user-initiated action a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Connect,
    SwitchNetwork,
    AddNetwork,
    SendTransaction,
    RefreshBalance,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Connect => "connect wallet",
            Action::SwitchNetwork => "switch network",
            Action::AddNetwork => "add network",
            Action::SendTransaction => "send transaction",
            Action::RefreshBalance => "refresh balance",
        })
    }
}

/// Error taxonomy used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The human declined a prompt.
    UserDeclined,
    /// The wallet lacks a chain or capability.
    Unsupported,
    /// Any other wallet or storage failure.
    Transport,
    /// A completion or signal from a provider that is no longer active.
    InconsistentState,
    /// Caller mistake: not connected, bad input, busy.
    Usage,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("{}", rejection_message(.0))]
    UserRejected(Action),
    #[error("{}", failure_message(.action, &.source.message))]
    Rpc { action: Action, source: RpcError },
    #[error("chain {0} is not supported")]
    UnsupportedChain(ChainId),
    #[error("Wallet not connected")]
    NotConnected,
    #[error("a connection attempt is already in progress")]
    AlreadyConnecting,
    #[error("wallet {0} has not been announced")]
    UnknownWallet(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("wallet returned no accounts")]
    NoAccounts,
    #[error("unexpected wallet response: {0}")]
    InvalidResponse(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("superseded by a newer session")]
    Superseded,
}

fn rejection_message(action: &Action) -> &'static str {
    match action {
        Action::Connect => {
            "Connection request rejected. Please connect your wallet to use this application."
        }
        Action::SwitchNetwork => "Network switch rejected by user",
        Action::AddNetwork => "Network addition rejected by user",
        Action::SendTransaction => "Transaction rejected by user",
        Action::RefreshBalance => "Balance request rejected by user",
    }
}

fn failure_message(action: &Action, message: &str) -> String {
    match action {
        Action::SendTransaction => format!("Transaction failed: {}", message),
        other => format!("Failed to {}: {}", other, message),
    }
}

impl WalletError {
    /// Classify a provider refusal raised while performing `action`.
    pub fn from_rpc(action: Action, error: RpcError) -> Self {
        if error.is_user_rejected() {
            WalletError::UserRejected(action)
        } else {
            WalletError::Rpc { action, source: error }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::UserRejected(_) => ErrorKind::UserDeclined,
            WalletError::Rpc { source, .. } if source.wants_registration() => ErrorKind::Unsupported,
            WalletError::UnsupportedChain(_) => ErrorKind::Unsupported,
            WalletError::Rpc { .. }
            | WalletError::NoAccounts
            | WalletError::InvalidResponse(_)
            | WalletError::Storage(_) => ErrorKind::Transport,
            WalletError::Superseded => ErrorKind::InconsistentState,
            WalletError::NotConnected
            | WalletError::AlreadyConnecting
            | WalletError::UnknownWallet(_)
            | WalletError::InvalidInput(_) => ErrorKind::Usage,
        }
    }
}

impl From<InvalidAddress> for WalletError {
    fn from(e: InvalidAddress) -> Self {
        WalletError::InvalidInput(e.to_string())
    }
}

impl From<AmountError> for WalletError {
    fn from(e: AmountError) -> Self {
        WalletError::InvalidInput(format!("invalid amount: {}", e))
    }
}

impl From<StorageError> for WalletError {
    fn from(e: StorageError) -> Self {
        WalletError::Storage(e.to_string())
    }
}

/// Persistence adapter failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("io: {0}")]
    Io(String),
    #[error("serialization: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_messages_are_friendly() {
        let err = WalletError::from_rpc(Action::SendTransaction, RpcError::user_rejected());
        assert_eq!(err.to_string(), "Transaction rejected by user");
        assert_eq!(err.kind(), ErrorKind::UserDeclined);

        let err = WalletError::from_rpc(Action::Connect, RpcError::user_rejected());
        assert!(err.to_string().starts_with("Connection request rejected"));
    }

    #[test]
    fn failures_carry_provider_message() {
        let err = WalletError::from_rpc(Action::Connect, RpcError::new(-32000, "boom"));
        assert_eq!(err.to_string(), "Failed to connect wallet: boom");
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err = WalletError::from_rpc(Action::SendTransaction, RpcError::new(-32000, "nonce"));
        assert_eq!(err.to_string(), "Transaction failed: nonce");
    }

    #[test]
    fn registration_codes_are_unsupported() {
        assert!(RpcError::new(4902, "unknown chain").wants_registration());
        assert!(RpcError::new(-32603, "internal").wants_registration());
        assert!(!RpcError::user_rejected().wants_registration());
        let err = WalletError::from_rpc(Action::SwitchNetwork, RpcError::new(4902, "x"));
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn rejection_without_code_is_transport_failure() {
        let err = RpcError::from_rejection(None, Some("request is not a function".into()));
        assert_eq!(err.code, codes::TRANSPORT);
        assert!(!err.wants_registration());
        assert_eq!(WalletError::from_rpc(Action::SwitchNetwork, err).kind(), ErrorKind::Transport);

        assert!(!RpcError::from_rejection(Some(f64::NAN), None).wants_registration());
        assert!(!RpcError::from_rejection(Some(-32603.5), None).wants_registration());
        assert_eq!(RpcError::from_rejection(None, None).message, "unknown provider error");

        let wallet = RpcError::from_rejection(Some(-32603.0), Some("Internal JSON-RPC error.".into()));
        assert_eq!(wallet.code, codes::INTERNAL_ERROR);
        assert!(wallet.wants_registration());
    }

    #[test]
    fn balance_failures_name_the_refresh() {
        let err = WalletError::from_rpc(Action::RefreshBalance, RpcError::new(-32000, "header not found"));
        assert_eq!(err.to_string(), "Failed to refresh balance: header not found");
    }
}
