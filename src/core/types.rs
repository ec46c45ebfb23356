//! Shared value types: chain ids, addresses, wallet descriptors

use serde::{Deserialize, Serialize};
use std::fmt;

use super::units::{self, AmountError};

/// Positive integer naming a network. Wallets exchange it as `0x` hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn from_hex(value: &str) -> Result<Self, AmountError> {
        let raw = units::parse_quantity(value)?;
        let id = u64::try_from(raw).map_err(|_| AmountError::Overflow)?;
        if id == 0 {
            return Err(AmountError::InvalidHex(value.to_string()));
        }
        Ok(Self(id))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.0)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// 20-byte account address. Displays and serializes as lowercase `0x` hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(alloy_primitives::Address);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address: {0}")]
pub struct InvalidAddress(pub String);

impl Address {
    /// Parse `0x` + 40 hex digits, any case. Checksums are not enforced.
    pub fn parse(value: &str) -> Result<Self, InvalidAddress> {
        let value = value.trim();
        let invalid = || InvalidAddress(value.to_string());
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .ok_or_else(invalid)?;
        digits.parse::<alloy_primitives::Address>().map(Self).map_err(|_| invalid())
    }

    /// Short form for display: `0x1234...abcd`.
    pub fn truncated(&self) -> String {
        truncate_address(&self.to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = InvalidAddress;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// First six and last four characters, or empty for an empty input.
pub fn truncate_address(address: &str) -> String {
    if address.is_empty() {
        return String::new();
    }
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// EIP-6963 provider info. `uuid` identifies the wallet instance for this page load;
/// `rdns` identifies the wallet implementation across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDescriptor {
    pub uuid: String,
    pub name: String,
    pub icon: String,
    pub rdns: String,
}

impl WalletDescriptor {
    pub fn new(
        uuid: impl Into<String>,
        name: impl Into<String>,
        icon: impl Into<String>,
        rdns: impl Into<String>,
    ) -> Self {
        Self { uuid: uuid.into(), name: name.into(), icon: icon.into(), rdns: rdns.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_hex_roundtrip() {
        let sepolia = ChainId::from_hex("0xaa36a7").unwrap();
        assert_eq!(sepolia, ChainId(11_155_111));
        assert_eq!(sepolia.to_hex(), "0xaa36a7");
        assert!(ChainId::from_hex("0x0").is_err());
        assert!(ChainId::from_hex("11155111").is_err());
    }

    #[test]
    fn address_normalizes_to_lowercase() {
        let addr = Address::parse("0xAbCdEf0123456789aBcDeF0123456789AbCdEf01").unwrap();
        assert_eq!(addr.to_string(), "0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(addr.truncated(), "0xabcd...ef01");
        assert_eq!(
            serde_json::to_value(addr).unwrap(),
            serde_json::json!("0xabcdef0123456789abcdef0123456789abcdef01")
        );
    }

    #[test]
    fn address_rejects_bad_input() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse("0xabc").is_err());
        assert!(Address::parse("abcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(Address::parse("0xzzcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(Address::parse("0xabcdef0123456789abcdef0123456789abcdef0102").is_err());
    }

    #[test]
    fn truncate_handles_short_values() {
        assert_eq!(truncate_address(""), "");
        assert_eq!(truncate_address("0x12"), "0x12");
    }
}
