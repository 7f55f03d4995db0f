//! Address validation and amount conversion.

use alloy::primitives::utils::parse_units;
use alloy::primitives::{Address, U256};

use crate::blockchain::types::{BlockchainError, BlockchainResult};

pub fn has_0x_prefix(s: &str) -> bool {
    s.len() >= 2 && s.as_bytes()[0] == b'0' && matches!(s.as_bytes()[1], b'x' | b'X')
}

/// Check an address string, optionally requiring its EIP-55 checksum form.
///
/// Checksummed addresses must carry the `0x` prefix.
pub fn is_valid_address(s: &str, checksummed: bool) -> bool {
    let parsed = match parse_address(s) {
        Ok(address) => address,
        Err(_) => return false,
    };
    !checksummed || (has_0x_prefix(s) && parsed.to_checksum(None) == s)
}

/// Parse a 40-hex-digit address, with or without `0x`.
pub fn parse_address(s: &str) -> BlockchainResult<Address> {
    let hex = if has_0x_prefix(s) { &s[2..] } else { s };
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BlockchainError::InvalidInput(format!(
            "'{}' is not a valid address",
            s
        )));
    }
    hex.parse::<Address>()
        .map_err(|e| BlockchainError::InvalidInput(format!("'{}' is not a valid address: {}", s, e)))
}

/// Convert a whole-token amount such as `0.1` into base units.
pub fn to_base_units(amount: f64, decimals: u8) -> BlockchainResult<U256> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(BlockchainError::InvalidInput(format!(
            "payout must be positive, got {}",
            amount
        )));
    }
    let parsed = parse_units(&amount.to_string(), decimals)
        .map_err(|e| BlockchainError::InvalidInput(format!("payout {}: {}", amount, e)))?;
    Ok(parsed.get_absolute())
}
