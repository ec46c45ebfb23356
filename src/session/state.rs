//! Session state: the single-writer container behind every snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{networks, Address, ChainId, WalletDescriptor};
use crate::error::{ErrorKind, WalletError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Version of the provider handle a completion or signal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct HandleToken(pub u64);

/// A user-facing error with a bounded display lifetime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    pub message: String,
    pub kind: ErrorKind,
    pub raised_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

/// What consumers observe. A chain id is only ever present together with an address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub connecting: bool,
    pub wallet: Option<WalletDescriptor>,
    pub address: Option<Address>,
    pub chain_id: Option<ChainId>,
    pub chain_name: Option<String>,
    pub balance: Option<String>,
    pub currency_symbol: Option<String>,
    pub unsupported_chain: bool,
    pub error: Option<ErrorNotice>,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}

/// Result of a successful account request, not yet committed.
#[derive(Debug, Clone)]
pub(crate) struct Established {
    pub address: Address,
    pub chain_id: ChainId,
    pub balance: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub status: ConnectionStatus,
    pub token: HandleToken,
    pub wallet: Option<WalletDescriptor>,
    pub address: Option<Address>,
    pub chain_id: Option<ChainId>,
    pub balance: Option<String>,
    pub unsupported_chain: bool,
    pub error: Option<ErrorNotice>,
    error_seq: u64,
}

impl SessionState {
    fn bump(&mut self) -> HandleToken {
        self.token = HandleToken(self.token.0 + 1);
        self.token
    }

    /// Drop every session field and invalidate the current token.
    pub fn clear_session(&mut self) {
        self.bump();
        self.status = ConnectionStatus::Disconnected;
        self.wallet = None;
        self.address = None;
        self.chain_id = None;
        self.balance = None;
        self.unsupported_chain = false;
    }

    pub fn begin_connect(&mut self, wallet: WalletDescriptor) -> HandleToken {
        self.clear_session();
        self.status = ConnectionStatus::Connecting;
        self.wallet = Some(wallet);
        self.error = None;
        self.token
    }

    pub fn commit(&mut self, established: Established) {
        self.status = ConnectionStatus::Connected;
        self.unsupported_chain = !networks::is_supported(established.chain_id);
        self.address = Some(established.address);
        self.chain_id = Some(established.chain_id);
        self.balance = established.balance;
    }

    /// Abandon a failed connect attempt.
    pub fn fail_connect(&mut self) {
        self.clear_session();
    }

    pub fn is_current(&self, token: HandleToken) -> bool {
        self.token == token
    }

    pub fn is_live(&self, token: HandleToken) -> bool {
        self.token == token && self.status == ConnectionStatus::Connected
    }

    /// Returns true when the address actually changed; the old balance is dropped with it.
    pub fn set_address(&mut self, address: Address) -> bool {
        if self.address.as_ref() == Some(&address) {
            return false;
        }
        self.address = Some(address);
        self.balance = None;
        true
    }

    /// Returns whether the new chain is in the registry.
    pub fn set_chain(&mut self, chain: ChainId) -> bool {
        let supported = networks::is_supported(chain);
        self.chain_id = Some(chain);
        self.unsupported_chain = !supported;
        supported
    }

    pub fn raise_error(&mut self, error: &WalletError, now: DateTime<Utc>) -> u64 {
        self.error_seq += 1;
        self.error = Some(ErrorNotice {
            message: error.to_string(),
            kind: error.kind(),
            raised_at: now,
            seq: self.error_seq,
        });
        self.error_seq
    }

    /// Clear the error only if it is still the one raised as `seq`.
    pub fn expire_error(&mut self, seq: u64) -> bool {
        match &self.error {
            Some(notice) if notice.seq == seq => {
                self.error = None;
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let network = self.chain_id.and_then(networks::network_info);
        SessionSnapshot {
            status: self.status,
            connecting: self.status == ConnectionStatus::Connecting,
            wallet: self.wallet.clone(),
            address: self.address,
            chain_id: self.chain_id,
            chain_name: self.chain_id.map(networks::display_name),
            balance: self.balance.clone(),
            currency_symbol: network.map(|n| n.native_currency.symbol.to_string()),
            unsupported_chain: self.unsupported_chain,
            error: self.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn established(chain: u64) -> Established {
        Established {
            address: Address::parse("0x1111111111111111111111111111111111111111").unwrap(),
            chain_id: ChainId(chain),
            balance: Some("1.0".into()),
        }
    }

    fn wallet() -> WalletDescriptor {
        WalletDescriptor::new("1", "Wallet", "data:,", "io.wallet")
    }

    #[test]
    fn clear_invalidates_token() {
        let mut state = SessionState::default();
        let token = state.begin_connect(wallet());
        state.commit(established(11_155_111));
        assert!(state.is_live(token));

        state.clear_session();
        assert!(!state.is_live(token));
        let snap = state.snapshot();
        assert_eq!(snap.status, ConnectionStatus::Disconnected);
        assert!(snap.address.is_none() && snap.chain_id.is_none() && snap.balance.is_none());
    }

    #[test]
    fn commit_flags_unsupported_chain() {
        let mut state = SessionState::default();
        state.begin_connect(wallet());
        state.commit(established(1));
        assert!(state.unsupported_chain);
        assert_eq!(state.snapshot().chain_name.as_deref(), Some("Chain 1"));
        assert!(state.set_chain(ChainId(4202)));
        assert!(!state.unsupported_chain);
        assert_eq!(state.snapshot().currency_symbol.as_deref(), Some("ETH"));
    }

    #[test]
    fn only_latest_error_expires() {
        let mut state = SessionState::default();
        let first = state.raise_error(&WalletError::NotConnected, Utc::now());
        let second = state.raise_error(&WalletError::AlreadyConnecting, Utc::now());
        assert!(!state.expire_error(first));
        assert!(state.error.is_some());
        assert!(state.expire_error(second));
        assert!(state.error.is_none());
    }
}
