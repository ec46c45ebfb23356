//! Network registry: the fixed set of chains this client knows how to register
//!
//! | Chain | Id | Currency |
//! |-------|----|----------|
//! | Sepolia | 11155111 | ETH |
//! | Lisk Sepolia | 4202 | ETH |
//! | Base Sepolia | 84532 | ETH |
//! | Scroll Sepolia | 534351 | ETH |
//!
//! Any other chain id is valid but unsupported.

use serde::Serialize;
use serde_json::Value;

use super::types::ChainId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedChain {
    Sepolia,
    LiskSepolia,
    BaseSepolia,
    ScrollSepolia,
}

impl SupportedChain {
    pub const ALL: [SupportedChain; 4] = [
        SupportedChain::Sepolia,
        SupportedChain::LiskSepolia,
        SupportedChain::BaseSepolia,
        SupportedChain::ScrollSepolia,
    ];

    pub fn chain_id(&self) -> ChainId {
        match self {
            SupportedChain::Sepolia => ChainId(11_155_111),
            SupportedChain::LiskSepolia => ChainId(4202),
            SupportedChain::BaseSepolia => ChainId(84_532),
            SupportedChain::ScrollSepolia => ChainId(534_351),
        }
    }

    pub fn from_chain_id(chain: ChainId) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.chain_id() == chain)
    }

    pub fn info(&self) -> &'static NetworkInfo {
        match self {
            SupportedChain::Sepolia => &SEPOLIA,
            SupportedChain::LiskSepolia => &LISK_SEPOLIA,
            SupportedChain::BaseSepolia => &BASE_SEPOLIA,
            SupportedChain::ScrollSepolia => &SCROLL_SEPOLIA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub chain_id: ChainId,
    pub chain_name: &'static str,
    pub native_currency: NativeCurrency,
    pub rpc_urls: &'static [&'static str],
    pub block_explorer_urls: &'static [&'static str],
}

/// `wallet_addEthereumChain` parameter object
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddChainParams<'a> {
    chain_id: String,
    chain_name: &'a str,
    native_currency: &'a NativeCurrency,
    rpc_urls: &'a [&'a str],
    block_explorer_urls: &'a [&'a str],
}

impl NetworkInfo {
    pub fn add_chain_params(&self) -> Value {
        let params = AddChainParams {
            chain_id: self.chain_id.to_hex(),
            chain_name: self.chain_name,
            native_currency: &self.native_currency,
            rpc_urls: self.rpc_urls,
            block_explorer_urls: self.block_explorer_urls,
        };
        serde_json::to_value(params).unwrap_or(Value::Null)
    }
}

const ETH: NativeCurrency = NativeCurrency { name: "ETH", symbol: "ETH", decimals: 18 };

static SEPOLIA: NetworkInfo = NetworkInfo {
    chain_id: ChainId(11_155_111),
    chain_name: "Sepolia test network",
    native_currency: ETH,
    rpc_urls: &["https://sepolia.infura.io/v3/"],
    block_explorer_urls: &["https://sepolia.etherscan.io"],
};

static LISK_SEPOLIA: NetworkInfo = NetworkInfo {
    chain_id: ChainId(4202),
    chain_name: "Lisk Sepolia Testnet",
    native_currency: ETH,
    rpc_urls: &["https://rpc.sepolia-api.lisk.com/"],
    block_explorer_urls: &["https://sepolia-blockscout.lisk.com/"],
};

static BASE_SEPOLIA: NetworkInfo = NetworkInfo {
    chain_id: ChainId(84_532),
    chain_name: "Base Sepolia Testnet",
    native_currency: ETH,
    rpc_urls: &["https://base-sepolia-rpc.publicnode.com/"],
    block_explorer_urls: &["https://sepolia.basescan.org/"],
};

static SCROLL_SEPOLIA: NetworkInfo = NetworkInfo {
    chain_id: ChainId(534_351),
    chain_name: "Scroll Sepolia Testnet",
    native_currency: ETH,
    rpc_urls: &["https://sepolia-rpc.scroll.io/"],
    block_explorer_urls: &["https://sepolia.scrollscan.com/"],
};

/// Decimals assumed for chains outside the registry.
pub const DEFAULT_DECIMALS: u8 = 18;

pub fn network_info(chain: ChainId) -> Option<&'static NetworkInfo> {
    SupportedChain::from_chain_id(chain).map(|c| c.info())
}

pub fn is_supported(chain: ChainId) -> bool {
    SupportedChain::from_chain_id(chain).is_some()
}

/// Registry entries in presentation order.
pub fn supported_networks() -> impl Iterator<Item = &'static NetworkInfo> {
    SupportedChain::ALL.into_iter().map(|c| c.info())
}

pub fn display_name(chain: ChainId) -> String {
    match network_info(chain) {
        Some(info) => info.chain_name.to_string(),
        None => format!("Chain {}", chain),
    }
}

pub fn decimals_for(chain: Option<ChainId>) -> u8 {
    chain
        .and_then(network_info)
        .map(|info| info.native_currency.decimals)
        .unwrap_or(DEFAULT_DECIMALS)
}
