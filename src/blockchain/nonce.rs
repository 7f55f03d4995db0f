//! Per-account nonce sequencing.
//!
//! `next` and `resync` share one async mutex, and a resync holds it across
//! the pending-nonce fetch. Nonces already handed out but not yet submitted
//! are invisible to the node, so a resync can move the counter back below
//! them and a later `next` may repeat one. The node rejects that repeat as a
//! nonce conflict, which triggers another resync.

use alloy::primitives::Address;
use tokio::sync::Mutex;

use crate::blockchain::client::ChainClient;
use crate::blockchain::types::BlockchainResult;
use crate::observability::metrics;

/// Monotonic transaction counter for one account.
#[derive(Debug)]
pub struct NonceSequencer {
    address: Address,
    counter: Mutex<u64>,
}

impl NonceSequencer {
    /// Create a sequencer starting at zero. Call [`resync`](Self::resync)
    /// before issuing nonces against a live chain.
    pub fn new(address: Address) -> Self {
        Self::starting_at(address, 0)
    }

    pub fn starting_at(address: Address, nonce: u64) -> Self {
        Self {
            address,
            counter: Mutex::new(nonce),
        }
    }

    /// Return the current value and advance the counter.
    ///
    /// A value returned here is spent even if the transaction using it is
    /// never submitted.
    pub async fn next(&self) -> u64 {
        let mut counter = self.counter.lock().await;
        let nonce = *counter;
        *counter += 1;
        nonce
    }

    /// Overwrite the counter with the chain's pending nonce.
    pub async fn resync<C: ChainClient>(&self, chain: &C) -> BlockchainResult<u64> {
        let mut counter = self.counter.lock().await;
        let pending = chain.pending_nonce(self.address).await?;
        let previous = std::mem::replace(&mut *counter, pending);

        metrics::record_nonce_resync();
        tracing::info!(
            address = %self.address,
            previous,
            pending,
            "Nonce resynchronized"
        );
        Ok(pending)
    }

    /// Get current nonce without incrementing.
    pub async fn current(&self) -> u64 {
        *self.counter.lock().await
    }

    pub fn address(&self) -> Address {
        self.address
    }
}
