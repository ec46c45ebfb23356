//! Core: pure types and tables shared by native and browser builds

pub mod networks;
pub mod protocol;
pub mod types;
pub mod units;

pub use networks::{NativeCurrency, NetworkInfo, SupportedChain};
pub use types::{truncate_address, Address, ChainId, InvalidAddress, WalletDescriptor};
pub use units::{AmountError, U256};
