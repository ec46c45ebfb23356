//! Network Switch Controller
//!
//! `switch_to(chain)`:
//! - chain outside the registry: warn, no provider request
//! - `wallet_switchEthereumChain` refused with 4902 / -32603: `wallet_addEthereumChain`
//!   with the registry entry, no second switch (the wallet switches on registration)
//! - any other refusal: reported, chain left as is, no retry

use serde_json::json;
use tracing::{debug, info, warn};

use crate::core::protocol::methods;
use crate::core::{networks, ChainId};
use crate::error::{Action, WalletError, WalletResult};
use crate::provider::{self, Provider};
use crate::session::SessionManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The wallet switched directly.
    Switched,
    /// The wallet did not know the chain and accepted its registration.
    Registered,
}

/// Ask `provider` to move to `chain`, registering the chain when the wallet does not know it.
pub(crate) async fn request_switch(provider: &dyn Provider, chain: ChainId) -> WalletResult<SwitchOutcome> {
    let info = networks::network_info(chain).ok_or(WalletError::UnsupportedChain(chain))?;

    let switched = provider
        .request(methods::SWITCH_CHAIN, json!([{ "chainId": chain.to_hex() }]))
        .await;
    match switched {
        Ok(_) => Ok(SwitchOutcome::Switched),
        Err(e) if e.wants_registration() => {
            info!(chain = %chain, code = e.code, "chain unknown to wallet, registering");
            provider
                .request(methods::ADD_CHAIN, json!([info.add_chain_params()]))
                .await
                .map_err(|e| WalletError::from_rpc(Action::AddNetwork, e))?;
            Ok(SwitchOutcome::Registered)
        }
        Err(e) => Err(WalletError::from_rpc(Action::SwitchNetwork, e)),
    }
}

#[derive(Clone)]
pub struct NetworkSwitchController {
    session: SessionManager,
}

impl NetworkSwitchController {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub async fn switch_to(&self, chain: ChainId) -> WalletResult<SwitchOutcome> {
        if !networks::is_supported(chain) {
            warn!(chain = %chain, "attempt to switch to an unsupported chain");
            return Err(WalletError::UnsupportedChain(chain));
        }
        let Some(handle) = self.session.active_handle() else {
            return Err(WalletError::NotConnected);
        };

        let outcome = match request_switch(handle.provider.as_ref(), chain).await {
            Ok(outcome) => outcome,
            Err(_) if !self.session.is_live(handle.token) => {
                debug!(chain = %chain, "dropping switch failure from a replaced session");
                return Err(WalletError::Superseded);
            }
            Err(e) => {
                self.session.report(&e);
                return Err(e);
            }
        };
        info!(chain = %chain, ?outcome, "network switch accepted");

        // Reconcile with the wallet's own view; chainChanged may lag or never come.
        match provider::request_chain_id(handle.provider.as_ref()).await {
            Ok(current) => self.session.apply_chain(handle.token, current),
            Err(e) => warn!(error = %e, "could not read chain after switch"),
        }
        Ok(outcome)
    }
}
