//! Configuration validation.
//!
//! Every problem is reported, not only the first.

use std::fmt;
use std::net::SocketAddr;

use crate::blockchain::units::{parse_address, to_base_units};
use crate::config::schema::FaucetConfig;
use crate::security::rate_limit::MAX_INTERVAL;

/// Upper bound for `faucet.interval_minutes`.
pub const MAX_INTERVAL_MINUTES: u64 = MAX_INTERVAL.as_secs() / 60;

/// One semantic problem with a config value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `faucet.payout`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &FaucetConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.max_body_size == 0 {
        errors.push(ValidationError::new("server.max_body_size", "must be greater than zero"));
    }

    if let Err(e) = to_base_units(config.faucet.payout, config.token.decimals) {
        errors.push(ValidationError::new("faucet.payout", e.to_string()));
    }
    if config.faucet.interval_minutes == 0 {
        errors.push(ValidationError::new("faucet.interval_minutes", "must be greater than zero"));
    } else if config.faucet.interval_minutes > MAX_INTERVAL_MINUTES {
        errors.push(ValidationError::new(
            "faucet.interval_minutes",
            format!("must be at most {} (one year)", MAX_INTERVAL_MINUTES),
        ));
    }
    if config.faucet.claim_timeout_secs == 0 {
        errors.push(ValidationError::new("faucet.claim_timeout_secs", "must be greater than zero"));
    }
    if config.faucet.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("faucet.sweep_interval_secs", "must be greater than zero"));
    }

    if let Some(address) = &config.token.address {
        if let Err(e) = parse_address(address) {
            errors.push(ValidationError::new("token.address", e.to_string()));
        }
    }

    for (field, url) in std::iter::once(("blockchain.rpc_url", &config.blockchain.rpc_url)).chain(
        config
            .blockchain
            .failover_urls
            .iter()
            .map(|url| ("blockchain.failover_urls", url)),
    ) {
        if url::Url::parse(url).is_err() {
            errors.push(ValidationError::new(field, format!("'{}' is not a valid URL", url)));
        }
    }
    if config.blockchain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("blockchain.rpc_timeout_secs", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
