//! Claim request parsing.
//!
//! The body is parsed once, by the rate-limit middleware, and the validated
//! [`Claim`] travels to the handler as a request extension.

use alloy::primitives::Address;
use serde::Deserialize;

use crate::blockchain::units::{is_valid_address, parse_address};
use crate::http::response::ClaimError;

/// Request ID header name.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Body of `POST /api/claim`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimRequest {
    pub address: String,
}

/// A claim whose destination address has been validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub address: Address,
}

impl Claim {
    pub fn from_body(body: &[u8]) -> Result<Self, ClaimError> {
        let request: ClaimRequest = serde_json::from_slice(body)
            .map_err(|e| ClaimError::InvalidInput(format!("invalid request body: {}", e)))?;
        Self::from_address(&request.address)
    }

    /// Any 40-hex-digit address is accepted; the checksum is not enforced.
    pub fn from_address(address: &str) -> Result<Self, ClaimError> {
        let address = address.trim();
        if !is_valid_address(address, false) {
            return Err(ClaimError::InvalidInput("invalid address".to_string()));
        }
        let address = parse_address(address).map_err(|e| ClaimError::InvalidInput(e.to_string()))?;
        Ok(Self { address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_parse_claim_body() {
        let claim =
            Claim::from_body(br#"{"address":"0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B"}"#)
                .unwrap();
        assert_eq!(
            claim.address,
            address!("Ab5801a7D398351b8bE11C439e05C5B3259aeC9B")
        );
    }

    #[test]
    fn test_lowercase_and_unprefixed_accepted() {
        assert!(Claim::from_address("0xab5801a7d398351b8be11c439e05c5b3259aec9b").is_ok());
        assert!(Claim::from_address(" ab5801a7d398351b8be11c439e05c5b3259aec9b ").is_ok());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            Claim::from_body(b"not json"),
            Err(ClaimError::InvalidInput(_))
        ));
        assert!(matches!(
            Claim::from_body(br#"{"addr":"0x00"}"#),
            Err(ClaimError::InvalidInput(_))
        ));
        let err = Claim::from_address("0x1234").unwrap_err();
        assert_eq!(err.to_string(), "invalid address");
    }
}
