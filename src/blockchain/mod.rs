//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment (private key) → wallet.rs (signing, nonce ownership)
//! Config (RPC URLs)         → client.rs (RPC with timeouts and failover)
//!     → fees.rs (legacy or EIP-1559 quote)
//!     → encoding.rs (ERC-20 call data)
//!     → transaction.rs (build, sign, broadcast)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod encoding;
pub mod fees;
pub mod mock;
pub mod nonce;
pub mod transaction;
pub mod types;
pub mod units;
pub mod wallet;

pub use client::{BlockchainClient, ChainClient};
pub use fees::FeeStrategy;
pub use nonce::NonceSequencer;
pub use transaction::{TransferKind, TxBroadcaster};
pub use types::{
    BlockchainConfig, BlockchainError, BlockchainResult, ChainId, FeeMode, FeeQuote,
    TransferRequest,
};
pub use wallet::Account;
