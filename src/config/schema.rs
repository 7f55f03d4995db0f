//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the faucet.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the faucet.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FaucetConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Payout and cooldown policy.
    pub faucet: FaucetSection,

    /// Optional ERC-20 token; absent means native payouts.
    pub token: TokenConfig,

    /// Block explorer links echoed by `/api/info`.
    pub explorer: ExplorerConfig,

    pub hcaptcha: HcaptchaConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Blockchain integration settings.
    pub blockchain: BlockchainConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Number of trusted reverse proxies in front of the faucet.
    ///
    /// Zero means the socket peer address identifies the caller and
    /// `X-Forwarded-For` is ignored.
    pub proxy_count: usize,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            proxy_count: 0,
            max_body_size: 4 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FaucetSection {
    /// Amount sent per claim, in whole tokens (e.g., 0.1).
    pub payout: f64,

    /// Cooldown between claims by the same caller or address, in minutes.
    pub interval_minutes: u64,

    /// Network name shown to users.
    pub network: String,

    /// Currency symbol shown to users.
    pub symbol: String,

    /// Deadline for one whole claim, in seconds.
    pub claim_timeout_secs: u64,

    /// How often expired rate-limit entries are evicted, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for FaucetSection {
    fn default() -> Self {
        Self {
            payout: 0.1,
            interval_minutes: 1440,
            network: "sepolia".to_string(),
            symbol: "ETH".to_string(),
            claim_timeout_secs: 5,
            sweep_interval_secs: 60,
        }
    }
}

/// ERC-20 payout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Token contract address (hex).
    pub address: Option<String>,

    /// Token decimals used to scale `faucet.payout`.
    pub decimals: u8,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            address: None,
            decimals: 18,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub url: String,

    /// Path appended to `url` before a transaction hash.
    pub tx_path: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            tx_path: "/tx/".to_string(),
        }
    }
}

/// hCaptcha settings. Only the site key is used, for `/api/info`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HcaptchaConfig {
    pub site_key: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Blockchain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Expected chain ID. When unset the node's reported ID is used.
    pub chain_id: Option<u64>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: None,
            rpc_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FaucetConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.server.proxy_count, 0);
        assert_eq!(config.faucet.payout, 0.1);
        assert_eq!(config.faucet.interval_minutes, 1440);
        assert_eq!(config.faucet.claim_timeout_secs, 5);
        assert_eq!(config.token.decimals, 18);
        assert!(config.token.address.is_none());
        assert_eq!(config.blockchain.rpc_timeout_secs, 10);
    }

    #[test]
    fn test_partial_sections() {
        let config: FaucetConfig = toml::from_str(
            r#"
            [server]
            proxy_count = 2

            [faucet]
            payout = 5.0
            symbol = "TKN"

            [token]
            address = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
            decimals = 6

            [blockchain]
            rpc_url = "https://rpc.sepolia.org"
            chain_id = 11155111
            "#,
        )
        .unwrap();

        assert_eq!(config.server.proxy_count, 2);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.faucet.payout, 5.0);
        assert_eq!(config.faucet.symbol, "TKN");
        assert_eq!(config.faucet.network, "sepolia");
        assert_eq!(config.token.decimals, 6);
        assert_eq!(config.blockchain.chain_id, Some(11155111));
        assert!(config.blockchain.failover_urls.is_empty());
    }
}
