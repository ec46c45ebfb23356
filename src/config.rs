//! Client Configuration - passed from the embedding page or application

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::protocol::storage::PREVIOUSLY_CONNECTED_PROVIDER_RDNS;
use crate::core::{ChainId, SupportedChain};

/// What to do when the wallet moves to a chain outside the network registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedChainPolicy {
    /// Raise the unsupported-network indicator and nothing else.
    #[default]
    Flag,
    /// Raise the indicator and ask the wallet to switch to the fallback chain.
    Switch,
}

/// Client configuration. Higher layers construct this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub app: String,
    pub storage_key: String,
    pub error_display_ms: u64,
    pub balance_refresh_delay_ms: u64,
    /// Reconnect with `eth_accounts` (no prompt) instead of `eth_requestAccounts`.
    pub silent_reconnect: bool,
    pub unsupported_chain_policy: UnsupportedChainPolicy,
    pub fallback_chain: ChainId,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app: "wallet-selector".into(),
            storage_key: PREVIOUSLY_CONNECTED_PROVIDER_RDNS.into(),
            error_display_ms: 5_000,
            balance_refresh_delay_ms: 1_000,
            silent_reconnect: true,
            unsupported_chain_policy: UnsupportedChainPolicy::Flag,
            fallback_chain: SupportedChain::Sepolia.chain_id(),
        }
    }
}

impl ClientConfig {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into(), ..Default::default() }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_error_display(mut self, display: Duration) -> Self {
        self.error_display_ms = display.as_millis() as u64;
        self
    }

    pub fn with_balance_refresh_delay(mut self, delay: Duration) -> Self {
        self.balance_refresh_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_silent_reconnect(mut self, silent: bool) -> Self {
        self.silent_reconnect = silent;
        self
    }

    pub fn with_unsupported_chain_policy(mut self, policy: UnsupportedChainPolicy) -> Self {
        self.unsupported_chain_policy = policy;
        self
    }

    pub fn with_fallback_chain(mut self, chain: SupportedChain) -> Self {
        self.fallback_chain = chain.chain_id();
        self
    }

    pub fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }

    pub fn balance_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.balance_refresh_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_display_windows() {
        let config = ClientConfig::default();
        assert_eq!(config.error_display(), Duration::from_secs(5));
        assert_eq!(config.balance_refresh_delay(), Duration::from_secs(1));
        assert_eq!(config.storage_key, "PREVIOUSLY_CONNECTED_PROVIDER_RDNS");
        assert_eq!(config.fallback_chain, ChainId(11_155_111));
        assert_eq!(config.unsupported_chain_policy, UnsupportedChainPolicy::Flag);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ClientConfig::from_json(r#"{"unsupportedChainPolicy":"switch","fallbackChain":4202}"#)
            .unwrap();
        assert_eq!(config.unsupported_chain_policy, UnsupportedChainPolicy::Switch);
        assert_eq!(config.fallback_chain, ChainId(4202));
        assert_eq!(config.error_display_ms, 5_000);
    }

    #[test]
    fn policy_names_are_snake_case() {
        assert_eq!(serde_json::to_value(UnsupportedChainPolicy::Switch).unwrap(), "switch");
        let config = ClientConfig::from_json(r#"{"unsupportedChainPolicy":"flag"}"#).unwrap();
        assert_eq!(config.unsupported_chain_policy, UnsupportedChainPolicy::Flag);
        assert!(ClientConfig::from_json(r#"{"unsupportedChainPolicy":"sometimes"}"#).is_err());
    }
}
