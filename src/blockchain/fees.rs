//! Fee mode selection and per-transaction fee quoting.
//!
//! The mode is probed once when the strategy is built and never changes.
//! Re-probing means building a new strategy with [`FeeStrategy::probe`].

use crate::blockchain::client::ChainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, FeeMode, FeeQuote};

/// Immutable fee pricing policy for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeStrategy {
    mode: FeeMode,
}

impl FeeStrategy {
    /// Inspect the latest header: a present, positive base fee means the
    /// network prices dynamically. Failing to fetch the header is an error.
    pub async fn probe<C: ChainClient>(chain: &C) -> BlockchainResult<Self> {
        let base_fee = chain.latest_base_fee().await?;
        let mode = match base_fee {
            Some(fee) if fee > 0 => FeeMode::Dynamic,
            _ => FeeMode::Legacy,
        };

        tracing::info!(mode = ?mode, base_fee = ?base_fee, "Fee mode selected");
        Ok(Self { mode })
    }

    pub fn with_mode(mode: FeeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> FeeMode {
        self.mode
    }

    /// Quote fees for a transaction about to be sent.
    ///
    /// Dynamic quotes use the latest header at call time, not the one seen
    /// while probing.
    pub async fn quote<C: ChainClient>(&self, chain: &C) -> BlockchainResult<FeeQuote> {
        match self.mode {
            FeeMode::Legacy => {
                let gas_price = chain.gas_price().await?;
                Ok(FeeQuote::Legacy { gas_price })
            }
            FeeMode::Dynamic => {
                let base_fee = chain.latest_base_fee().await?.ok_or_else(|| {
                    BlockchainError::FeeUnavailable("latest header has no base fee".to_string())
                })?;
                let tip = chain.max_priority_fee().await?;
                Ok(FeeQuote::dynamic(base_fee, tip))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::mock::MockChain;

    #[tokio::test]
    async fn test_probe_dynamic() {
        let chain = MockChain::new();
        let strategy = FeeStrategy::probe(&chain).await.unwrap();
        assert_eq!(strategy.mode(), FeeMode::Dynamic);
    }

    #[tokio::test]
    async fn test_probe_legacy_without_base_fee() {
        let chain = MockChain::legacy();
        assert_eq!(FeeStrategy::probe(&chain).await.unwrap().mode(), FeeMode::Legacy);

        // A zero base fee is treated as legacy too
        chain.set_base_fee(Some(0));
        assert_eq!(FeeStrategy::probe(&chain).await.unwrap().mode(), FeeMode::Legacy);
    }

    #[tokio::test]
    async fn test_probe_fails_without_chain() {
        let chain = MockChain::new();
        chain.set_unreachable(true);
        let err = FeeStrategy::probe(&chain).await.unwrap_err();
        assert!(matches!(err, BlockchainError::Connectivity(_)));
    }

    #[tokio::test]
    async fn test_dynamic_quote_uses_latest_header() {
        let chain = MockChain::new();
        let strategy = FeeStrategy::probe(&chain).await.unwrap();

        chain.set_base_fee(Some(1_000_000_000));
        chain.set_priority_fee(2_000_000_000);
        assert_eq!(
            strategy.quote(&chain).await.unwrap(),
            FeeQuote::Dynamic {
                max_priority_fee_per_gas: 2_000_000_000,
                max_fee_per_gas: 4_000_000_000,
            }
        );

        chain.set_base_fee(Some(5_000_000_000));
        let FeeQuote::Dynamic { max_fee_per_gas, .. } = strategy.quote(&chain).await.unwrap()
        else {
            panic!("expected dynamic quote");
        };
        assert_eq!(max_fee_per_gas, 12_000_000_000);
    }

    #[tokio::test]
    async fn test_mode_is_not_reprobed() {
        let chain = MockChain::legacy();
        let strategy = FeeStrategy::probe(&chain).await.unwrap();

        // Network upgrades mid-life; the strategy keeps quoting legacy
        chain.set_base_fee(Some(1_000_000_000));
        chain.set_gas_price(3_000_000_000);
        assert_eq!(
            strategy.quote(&chain).await.unwrap(),
            FeeQuote::Legacy { gas_price: 3_000_000_000 }
        );
    }

    #[tokio::test]
    async fn test_dynamic_quote_without_base_fee() {
        let chain = MockChain::legacy();
        let strategy = FeeStrategy::with_mode(FeeMode::Dynamic);
        let err = strategy.quote(&chain).await.unwrap_err();
        assert!(matches!(err, BlockchainError::FeeUnavailable(_)));
    }
}
