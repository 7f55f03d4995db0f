//! Timeout enforcement.
//!
//! On expiry the wrapped future is dropped. Anything it already did, such as
//! taking a nonce, is not undone.

use std::future::Future;
use std::time::Duration;

use crate::blockchain::{BlockchainError, BlockchainResult};

/// Run `fut` under `deadline`, mapping expiry to [`BlockchainError::Timeout`].
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> BlockchainResult<T>
where
    F: Future<Output = BlockchainResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(BlockchainError::Timeout(deadline)),
    }
}
