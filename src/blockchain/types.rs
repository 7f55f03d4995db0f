//! Chain-specific types and error definitions.

use alloy::primitives::{Address, U256};
use std::time::Duration;
use thiserror::Error;

// Re-export BlockchainConfig from config module to avoid duplication
pub use crate::config::schema::BlockchainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Clone, Error)]
pub enum BlockchainError {
    /// Every provider was unreachable or returned a transport error.
    #[error("RPC connectivity failure: {0}")]
    Connectivity(String),

    /// An RPC call or the claim deadline expired.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The node rejected a submission for a nonce reason.
    #[error("{0}")]
    NonceConflict(String),

    /// The node rejected a submission or call. The message is the node's own.
    #[error("{0}")]
    Rejected(String),

    /// Malformed address, zero amount, or an operation that is not configured.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The inputs for a fee quote could not be obtained.
    #[error("Fee quote unavailable: {0}")]
    FeeUnavailable(String),

    /// Invalid private key format or signing failure.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl BlockchainError {
    /// Classify a node rejection message.
    pub fn rejection(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_nonce_related(&message) {
            Self::NonceConflict(message)
        } else {
            Self::Rejected(message)
        }
    }

    /// Whether this error should trigger a nonce resync.
    pub fn is_nonce_conflict(&self) -> bool {
        matches!(self, Self::NonceConflict(_))
    }
}

/// Case-insensitive match on "nonce" in a failure message.
pub fn is_nonce_related(message: &str) -> bool {
    message.to_ascii_lowercase().contains("nonce")
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Fee pricing supported by the target network, decided once per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMode {
    /// The latest header carries a positive base fee (EIP-1559).
    Dynamic,
    /// Only a fixed gas price is accepted.
    Legacy,
}

/// Fee fields for one transaction. The two shapes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeQuote {
    Legacy {
        gas_price: u128,
    },
    Dynamic {
        max_priority_fee_per_gas: u128,
        max_fee_per_gas: u128,
    },
}

impl FeeQuote {
    /// Build a dynamic quote as `base_fee * 2 + tip`.
    pub fn dynamic(base_fee: u128, tip: u128) -> Self {
        Self::Dynamic {
            max_priority_fee_per_gas: tip,
            max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(tip),
        }
    }

    pub fn mode(&self) -> FeeMode {
        match self {
            Self::Legacy { .. } => FeeMode::Legacy,
            Self::Dynamic { .. } => FeeMode::Dynamic,
        }
    }
}

/// A single payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub to: Address,
    pub amount: U256,
    /// Recipient's current token balance. Only consulted for token transfers.
    pub recipient_balance: Option<U256>,
}

impl TransferRequest {
    pub fn native(to: Address, amount: U256) -> Self {
        Self {
            to,
            amount,
            recipient_balance: None,
        }
    }

    pub fn token(to: Address, amount: U256, recipient_balance: U256) -> Self {
        Self {
            to,
            amount,
            recipient_balance: Some(recipient_balance),
        }
    }
}
