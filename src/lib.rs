//! Wallet Selector: EIP-6963 wallet discovery, one session, network switching.
//!
//! # Architecture
//!
//! ```text
//! Client (entry point)
//!   │
//!   ├── ProviderRegistry ◀── Discovery (window events | MockDiscovery)
//!   │     └── announced wallets, deduplicated by uuid
//!   │
//!   ├── SessionManager (single writer)
//!   │     ├── Disconnected → Connecting → Connected
//!   │     ├── provider signals, tagged with the handle token
//!   │     └── ConnectionHint → KeyValueStore (file | localStorage | memory)
//!   │
//!   ├── NetworkSwitchController (switch, register on 4902 / -32603)
//!   │
//!   └── TransactionSubmitter (native transfer, delayed balance refresh)
//! ```
//!
//! # Operations
//!
//! | Operation | Method | Description |
//! |-----------|--------|-------------|
//! | discover | `client.start()` | Listen for announcements, request providers, reconnect |
//! | connect | `client.connect(uuid)` | Authorize accounts, subscribe to signals |
//! | disconnect | `client.disconnect()` | Unsubscribe, clear session and persisted wallet |
//! | switch | `client.switch_chain(id)` | Move the wallet to a supported network |
//! | send | `client.send(to, amount)` | Native-currency transfer from the session account |
//!
//! # Features
//!
//! - `native` - Tokio runtime, file persistence, stderr logging
//! - `wasm` - Browser bindings (window discovery, localStorage, `WalletSelector`)
//!
//! # Usage
//!
//! ```ignore
//! use wallet_selector::{Client, ClientConfig, ChainId, MemoryStore, TokioRuntime};
//!
//! let client = Client::new(ClientConfig::new("myapp"), discovery, Rc::new(MemoryStore::new()), Rc::new(TokioRuntime::new()));
//! client.start();
//!
//! let session = client.connect(&client.wallets()[0].uuid).await?;
//! client.switch_chain(ChainId(4202)).await?;
//! let hash = client.send("0x...", "0.01").await?;
//! ```

// =============================================================================
// Shared modules (compile everywhere)
// =============================================================================
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod mock;
pub mod provider;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod switch;
pub mod transfer;

// =============================================================================
// Native-only modules (filesystem, tokio, stderr)
// =============================================================================
#[cfg(feature = "native")]
pub mod logging;

// =============================================================================
// WASM-only modules (browser, localStorage, wasm-bindgen)
// =============================================================================
#[cfg(feature = "wasm")]
pub mod wasm;

// =============================================================================
// Re-exports: Shared
// =============================================================================
pub use client::Client;
pub use config::{ClientConfig, UnsupportedChainPolicy};
pub use crate::core::{
    truncate_address, Address, ChainId, NetworkInfo, SupportedChain, WalletDescriptor, U256,
};
pub use error::{Action, ErrorKind, RpcError, StorageError, WalletError, WalletResult};
pub use provider::{Provider, ProviderDetail, ProviderHandle, ProviderSignal, Subscription};
pub use registry::{Discovery, ProviderRegistry};
pub use runtime::Runtime;
pub use session::{
    ActiveHandle, ConnectionStatus, ErrorNotice, HandleToken, ReconnectOutcome, SessionManager,
    SessionSnapshot,
};
pub use storage::{ConnectionHint, KeyValueStore, MemoryStore};
pub use switch::{NetworkSwitchController, SwitchOutcome};
pub use transfer::TransactionSubmitter;

// =============================================================================
// Re-exports: Native
// =============================================================================
#[cfg(feature = "native")]
pub use runtime::TokioRuntime;
#[cfg(feature = "native")]
pub use storage::FileStore;

// =============================================================================
// Re-exports: WASM
// =============================================================================
#[cfg(feature = "wasm")]
pub use wasm::{BrowserProvider, BrowserRuntime, LocalStorage, WalletSelector, WindowDiscovery};
