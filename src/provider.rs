//! Provider capability: the injectable seam over EIP-1193 wallet objects
//!
//! ```text
//! Discovery ──announce──▶ ProviderDetail { info, provider }
//!                                              │
//!                         request(method, params) ──▶ Value | RpcError
//!                         subscribe(sink)          ──▶ ListenerId
//!                         unsubscribe(id)
//! ```
//!
//! Browser builds bind these to `window` and the injected provider object;
//! tests bind them to [`crate::mock`].

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::rc::Rc;

use crate::core::protocol::methods;
use crate::core::{units, Address, ChainId, WalletDescriptor, U256};
use crate::error::{Action, RpcError, WalletError, WalletResult};

/// Events emitted by a provider, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSignal {
    AccountsChanged(Vec<String>),
    /// Hex chain id as delivered by the wallet
    ChainChanged(String),
    Connect { chain_id: String },
    Disconnect(RpcError),
}

pub type SignalSink = Rc<dyn Fn(ProviderSignal)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[async_trait(?Send)]
pub trait Provider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Register `sink` for every provider signal until [`Provider::unsubscribe`].
    fn subscribe(&self, sink: SignalSink) -> ListenerId;

    fn unsubscribe(&self, id: ListenerId);
}

pub type ProviderHandle = Rc<dyn Provider>;

/// An announced wallet: descriptor plus the handle it was announced with.
#[derive(Clone)]
pub struct ProviderDetail {
    pub info: WalletDescriptor,
    pub provider: ProviderHandle,
}

impl ProviderDetail {
    pub fn new(info: WalletDescriptor, provider: ProviderHandle) -> Self {
        Self { info, provider }
    }
}

impl fmt::Debug for ProviderDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDetail").field("info", &self.info).finish_non_exhaustive()
    }
}

/// Listener registration released exactly once, on drop.
pub struct Subscription {
    provider: ProviderHandle,
    id: Option<ListenerId>,
}

impl Subscription {
    pub fn new(provider: ProviderHandle, sink: SignalSink) -> Self {
        let id = provider.subscribe(sink);
        Self { provider, id: Some(id) }
    }

    pub fn id(&self) -> Option<ListenerId> {
        self.id
    }

    pub fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.provider.unsubscribe(id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

// =============================================================================
// Typed requests
// =============================================================================

pub(crate) async fn request_accounts(
    provider: &dyn Provider,
    method: &str,
) -> WalletResult<Vec<String>> {
    let value = provider
        .request(method, json!([]))
        .await
        .map_err(|e| WalletError::from_rpc(Action::Connect, e))?;
    serde_json::from_value(value)
        .map_err(|e| WalletError::InvalidResponse(format!("{}: {}", method, e)))
}

pub(crate) async fn request_chain_id(provider: &dyn Provider) -> WalletResult<ChainId> {
    let value = provider
        .request(methods::CHAIN_ID, json!([]))
        .await
        .map_err(|e| WalletError::from_rpc(Action::Connect, e))?;
    let hex = value
        .as_str()
        .ok_or_else(|| WalletError::InvalidResponse(format!("{}: {}", methods::CHAIN_ID, value)))?;
    ChainId::from_hex(hex).map_err(|e| WalletError::InvalidResponse(e.to_string()))
}

pub(crate) async fn request_balance(provider: &dyn Provider, address: &Address) -> WalletResult<U256> {
    let value = provider
        .request(methods::GET_BALANCE, json!([address, methods::BLOCK_LATEST]))
        .await
        .map_err(|e| WalletError::from_rpc(Action::RefreshBalance, e))?;
    let hex = value
        .as_str()
        .ok_or_else(|| WalletError::InvalidResponse(format!("{}: {}", methods::GET_BALANCE, value)))?;
    units::parse_quantity(hex).map_err(|e| WalletError::InvalidResponse(e.to_string()))
}
