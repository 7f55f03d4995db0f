//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Define the `ChainClient` capability the broadcast engine consumes
//! - Connect to one or more JSON-RPC endpoints
//! - Bound every call with a timeout and fail over on transport errors
//! - Fail over a submission only when the node was never reached
//! - Surface node rejections verbatim instead of failing over

use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::{TransportError, TransportErrorKind, TransportResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::encoding::IERC20;
use crate::blockchain::types::{BlockchainConfig, BlockchainError, BlockchainResult, ChainId};

/// Chain access required by the broadcast engine.
///
/// Implemented by [`BlockchainClient`] for live nodes and by
/// [`MockChain`](crate::blockchain::mock::MockChain) for tests.
pub trait ChainClient: Send + Sync + 'static {
    /// Chain identifier reported by the node.
    fn chain_id(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// Base fee of the latest block header, `None` on pre-London chains.
    fn latest_base_fee(&self) -> impl Future<Output = BlockchainResult<Option<u128>>> + Send;

    /// Legacy gas price suggestion in wei.
    fn gas_price(&self) -> impl Future<Output = BlockchainResult<u128>> + Send;

    /// Priority fee (tip) suggestion in wei.
    fn max_priority_fee(&self) -> impl Future<Output = BlockchainResult<u128>> + Send;

    /// Nonce of `address` including pending transactions.
    fn pending_nonce(&self, address: Address)
        -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// `balanceOf(holder)` on the token contract.
    fn token_balance(
        &self,
        token: Address,
        holder: Address,
    ) -> impl Future<Output = BlockchainResult<U256>> + Send;

    /// Submit an EIP-2718 encoded signed transaction.
    fn send_raw_transaction(&self, raw: Bytes)
        -> impl Future<Output = BlockchainResult<TxHash>> + Send;
}

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// When a call may move on to the next provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failover {
    /// Reads: any transport error or timeout.
    Any,
    /// Writes: only a failed connect. A timed-out send may still land.
    ConnectOnly,
}

/// True when the request never reached the endpoint.
fn is_connect_error(err: &TransportError) -> bool {
    let TransportError::Transport(TransportErrorKind::Custom(inner)) = err else {
        return false;
    };
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(inner.as_ref());
    while let Some(e) = source {
        if let Some(e) = e.downcast_ref::<reqwest::Error>() {
            if e.is_connect() {
                return true;
            }
        }
        if let Some(e) = e.downcast_ref::<std::io::Error>() {
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = e.source();
    }
    false
}

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Configuration.
    config: BlockchainConfig,
    /// Per-call timeout.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Only URL parsing can fail here; reachability is checked by the first call.
    pub fn new(config: BlockchainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::InvalidInput(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            "Blockchain client initialized"
        );

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Resolve the chain ID: the configured one if present, otherwise the node's.
    ///
    /// A configured ID that disagrees with the node is logged and kept, so
    /// signatures stay bound to the network the operator asked for.
    pub async fn resolve_chain_id(&self) -> BlockchainResult<ChainId> {
        match self.config.chain_id {
            Some(expected) => {
                match self.chain_id().await {
                    Ok(actual) if actual != expected => {
                        let err = BlockchainError::ChainMismatch { expected, actual };
                        tracing::warn!(error = %err, "Chain verification failed");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Could not verify chain ID"),
                }
                Ok(ChainId(expected))
            }
            None => self.chain_id().await.map(ChainId),
        }
    }

    /// Run `call` against each provider in turn.
    ///
    /// An error response is returned immediately. Under [`Failover::Any`]
    /// transport errors and timeouts move on to the next provider; under
    /// [`Failover::ConnectOnly`] only connect failures do, and a timeout is
    /// returned as [`BlockchainError::Timeout`].
    async fn with_failover<T, F, Fut>(
        &self,
        op: &'static str,
        policy: Failover,
        call: F,
    ) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut + Send + Sync,
        Fut: Future<Output = TransportResult<T>> + Send,
        T: Send,
    {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    if let Some(resp) = e.as_error_resp() {
                        return Err(BlockchainError::rejection(resp.message.to_string()));
                    }
                    if policy == Failover::ConnectOnly && !is_connect_error(&e) {
                        tracing::error!(provider_idx = i, op, error = %e, "RPC error after request was sent");
                        return Err(BlockchainError::Connectivity(format!(
                            "Failed to {}: {}",
                            op, e
                        )));
                    }
                    tracing::warn!(provider_idx = i, op, error = %e, "RPC error, trying next provider");
                }
                Err(_) if policy == Failover::ConnectOnly => {
                    tracing::error!(provider_idx = i, op, "RPC timeout, not retrying");
                    return Err(BlockchainError::Timeout(self.timeout_duration));
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, op, "RPC timeout, trying next provider");
                }
            }
        }
        Err(BlockchainError::Connectivity(format!(
            "All RPC providers failed to {}",
            op
        )))
    }

    /// Get the configuration.
    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }
}

impl ChainClient for BlockchainClient {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.with_failover("get chain id", Failover::Any, |p| async move { p.get_chain_id().await })
            .await
    }

    async fn latest_base_fee(&self) -> BlockchainResult<Option<u128>> {
        let block = self
            .with_failover("get latest header", Failover::Any, |p| async move {
                p.get_block_by_number(BlockNumberOrTag::Latest)
                    .await
                    .map(|block| block.map(|b| b.header.base_fee_per_gas))
            })
            .await?;

        match block {
            Some(base_fee) => Ok(base_fee.map(u128::from)),
            None => Err(BlockchainError::Rejected("Latest block not found".to_string())),
        }
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.with_failover("get gas price", Failover::Any, |p| async move { p.get_gas_price().await })
            .await
    }

    async fn max_priority_fee(&self) -> BlockchainResult<u128> {
        self.with_failover("get priority fee", Failover::Any, |p| async move {
            p.get_max_priority_fee_per_gas().await
        })
        .await
    }

    async fn pending_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.with_failover("get pending nonce", Failover::Any, move |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn token_balance(&self, token: Address, holder: Address) -> BlockchainResult<U256> {
        let request = TransactionRequest::default()
            .with_to(token)
            .with_input(IERC20::balanceOfCall { account: holder }.abi_encode());

        let output: Bytes = self
            .with_failover("call balanceOf", Failover::Any, |p| {
                let request = request.clone();
                async move { p.call(request).await }
            })
            .await?;

        IERC20::balanceOfCall::abi_decode_returns(&output)
            .map_err(|e| BlockchainError::Rejected(format!("Failed to decode balance: {}", e)))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        self.with_failover("send transaction", Failover::ConnectOnly, |p| {
            let raw = raw.clone();
            async move {
                p.send_raw_transaction(&raw)
                    .await
                    .map(|pending| *pending.tx_hash())
            }
        })
        .await
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
