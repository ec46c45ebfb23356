//! Protocol constants for EIP-6963 discovery and EIP-1193 providers
//!
//! Centralized registry for event names, request methods and refusal codes.

/// EIP-6963 window events
pub mod discovery {
    pub const REQUEST_EVENT: &str = "eip6963:requestProvider";
    pub const ANNOUNCE_EVENT: &str = "eip6963:announceProvider";
}

/// EIP-1193 request methods
pub mod methods {
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const ACCOUNTS: &str = "eth_accounts";
    pub const CHAIN_ID: &str = "eth_chainId";
    pub const GET_BALANCE: &str = "eth_getBalance";
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
    pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
    pub const SEND_TRANSACTION: &str = "eth_sendTransaction";

    pub const BLOCK_LATEST: &str = "latest";
}

/// EIP-1193 provider events
pub mod events {
    pub const ACCOUNTS_CHANGED: &str = "accountsChanged";
    pub const CHAIN_CHANGED: &str = "chainChanged";
    pub const CONNECT: &str = "connect";
    pub const DISCONNECT: &str = "disconnect";

    pub const ALL: &[&str] = &[ACCOUNTS_CHANGED, CHAIN_CHANGED, CONNECT, DISCONNECT];
}

/// Provider refusal codes
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Local: the failure never reached the wallet or carried no numeric code.
    pub const TRANSPORT: i64 = -1;
}

/// Durable storage keys
pub mod storage {
    pub const PREVIOUSLY_CONNECTED_PROVIDER_RDNS: &str = "PREVIOUSLY_CONNECTED_PROVIDER_RDNS";
}
