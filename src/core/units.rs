//! Units: hex quantities and decimal amounts
//!
//! Wallets speak `0x`-prefixed hex quantities in the smallest native unit (wei).
//! Humans speak decimal strings in whole units (ETH). Arithmetic is `U256` throughout.

use alloy_primitives::utils::{self, ParseUnits};
use thiserror::Error;

pub use alloy_primitives::U256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("empty value")]
    Empty,
    #[error("invalid hex quantity: {0}")]
    InvalidHex(String),
    #[error("invalid decimal amount: {0}")]
    InvalidDecimal(String),
    #[error("too many decimal places (max {0})")]
    TooPrecise(u8),
    #[error("value out of range")]
    Overflow,
}

/// Parse a `0x`-prefixed hex quantity (`"0x1"`, `"0xde0b6b3a7640000"`).
pub fn parse_quantity(value: &str) -> Result<U256, AmountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AmountError::Empty);
    }
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| AmountError::InvalidHex(value.to_string()))?;
    U256::from_str_radix(digits, 16).map_err(|_| AmountError::Overflow)
}

/// Format a quantity as minimal `0x` hex (`0` → `"0x0"`).
pub fn to_quantity(value: U256) -> String {
    format!("0x{:x}", value)
}

/// Convert a decimal string in whole units into the smallest unit.
///
/// `parse_units("0.5", 18)` → `500000000000000000`.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }
    let invalid = || AmountError::InvalidDecimal(amount.to_string());

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(AmountError::TooPrecise(decimals));
    }

    let normalized = format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        if fraction.is_empty() { "0" } else { fraction }
    );
    match utils::parse_units(&normalized, decimals).map_err(|_| AmountError::Overflow)? {
        ParseUnits::U256(value) => Ok(value),
        _ => Err(invalid()),
    }
}

/// Format a smallest-unit value as a decimal string in whole units.
///
/// Keeps at least one fractional digit: `1 ETH` → `"1.0"`, `0.5 ETH` → `"0.5"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let full = utils::format_units(value, decimals).unwrap_or_else(|_| value.to_string());
    match full.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            format!("{}.{}", whole, if fraction.is_empty() { "0" } else { fraction })
        }
        None => format!("{}.0", full),
    }
}
