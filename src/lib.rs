//! Testnet faucet library.
//!
//! Dispenses a fixed amount of native currency or ERC-20 tokens per claim,
//! with a cooldown per caller and per destination address.

pub mod blockchain;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::FaucetConfig;
pub use http::FaucetServer;
pub use lifecycle::Shutdown;
