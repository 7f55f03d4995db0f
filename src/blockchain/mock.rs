use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::blockchain::client::ChainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

const GWEI: u128 = 1_000_000_000;

#[derive(Debug)]
struct MockState {
    chain_id: u64,
    base_fee: Option<u128>,
    gas_price: u128,
    priority_fee: u128,
    pending_nonce: u64,
    queued: BTreeSet<u64>,
    attempted_nonces: Vec<u64>,
    token_balances: HashMap<Address, U256>,
    token_balance_fails: bool,
    submitted: Vec<TxEnvelope>,
    scripted_rejections: VecDeque<String>,
    unreachable: bool,
    submit_delay: Option<Duration>,
    header_fetches: usize,
    nonce_fetches: usize,
}

/// In-memory chain for dev/test runs.
///
/// Accepts any decodable signed transaction whose nonce is not below the
/// pending nonce and not already held. Transactions ahead of the pending
/// nonce are queued; the pending nonce advances over contiguous runs.
#[derive(Debug, Clone)]
pub struct MockChain {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    /// A London-enabled chain with ID 31337, base fee 1 gwei, tip 2 gwei.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                chain_id: 31337,
                base_fee: Some(GWEI),
                gas_price: 875_000_000,
                priority_fee: 2 * GWEI,
                pending_nonce: 0,
                queued: BTreeSet::new(),
                attempted_nonces: Vec::new(),
                token_balances: HashMap::new(),
                token_balance_fails: false,
                submitted: Vec::new(),
                scripted_rejections: VecDeque::new(),
                unreachable: false,
                submit_delay: None,
                header_fetches: 0,
                nonce_fetches: 0,
            })),
        }
    }

    /// A chain whose headers carry no base fee.
    pub fn legacy() -> Self {
        let chain = Self::new();
        chain.set_base_fee(None);
        chain
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reachable(&self) -> BlockchainResult<std::sync::MutexGuard<'_, MockState>> {
        let state = self.lock();
        if state.unreachable {
            return Err(BlockchainError::Connectivity(
                "mock chain unreachable".to_string(),
            ));
        }
        Ok(state)
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.lock().chain_id = chain_id;
    }

    pub fn set_base_fee(&self, base_fee: Option<u128>) {
        self.lock().base_fee = base_fee;
    }

    pub fn set_gas_price(&self, gas_price: u128) {
        self.lock().gas_price = gas_price;
    }

    pub fn set_priority_fee(&self, priority_fee: u128) {
        self.lock().priority_fee = priority_fee;
    }

    pub fn set_pending_nonce(&self, nonce: u64) {
        let mut state = self.lock();
        state.pending_nonce = nonce;
        state.queued.retain(|n| *n >= nonce);
    }

    pub fn set_token_balance(&self, holder: Address, balance: U256) {
        self.lock().token_balances.insert(holder, balance);
    }

    /// Make every token balance lookup revert.
    pub fn fail_token_balance(&self, fail: bool) {
        self.lock().token_balance_fails = fail;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Delay every submission, to exercise deadlines.
    pub fn set_submit_delay(&self, delay: Option<Duration>) {
        self.lock().submit_delay = delay;
    }

    /// Reject the next submission with `message`.
    pub fn reject_next_submission(&self, message: impl Into<String>) {
        self.lock().scripted_rejections.push_back(message.into());
    }

    /// Accepted transactions, in submission order.
    pub fn submitted(&self) -> Vec<TxEnvelope> {
        self.lock().submitted.clone()
    }

    /// Nonce of every decodable submission, accepted or not, in arrival order.
    pub fn attempted_nonces(&self) -> Vec<u64> {
        self.lock().attempted_nonces.clone()
    }

    pub fn header_fetches(&self) -> usize {
        self.lock().header_fetches
    }

    pub fn nonce_fetches(&self) -> usize {
        self.lock().nonce_fetches
    }
}

impl ChainClient for MockChain {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        Ok(self.reachable()?.chain_id)
    }

    async fn latest_base_fee(&self) -> BlockchainResult<Option<u128>> {
        let mut state = self.reachable()?;
        state.header_fetches += 1;
        Ok(state.base_fee)
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        Ok(self.reachable()?.gas_price)
    }

    async fn max_priority_fee(&self) -> BlockchainResult<u128> {
        Ok(self.reachable()?.priority_fee)
    }

    async fn pending_nonce(&self, _address: Address) -> BlockchainResult<u64> {
        let mut state = self.reachable()?;
        state.nonce_fetches += 1;
        Ok(state.pending_nonce)
    }

    async fn token_balance(&self, _token: Address, holder: Address) -> BlockchainResult<U256> {
        let state = self.reachable()?;
        if state.token_balance_fails {
            return Err(BlockchainError::rejection("execution reverted"));
        }
        Ok(state.token_balances.get(&holder).copied().unwrap_or_default())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        let delay = self.reachable()?.submit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| BlockchainError::Rejected(format!("rlp: {}", e)))?;
        let nonce = envelope.nonce();

        let mut state = self.reachable()?;
        state.attempted_nonces.push(nonce);
        if let Some(message) = state.scripted_rejections.pop_front() {
            return Err(BlockchainError::rejection(message));
        }

        if nonce < state.pending_nonce {
            return Err(BlockchainError::rejection(format!(
                "nonce too low: next nonce {}, tx nonce {}",
                state.pending_nonce, nonce
            )));
        }
        if !state.queued.insert(nonce) {
            return Err(BlockchainError::rejection(
                "replacement transaction underpriced",
            ));
        }
        while state.queued.contains(&state.pending_nonce) {
            state.pending_nonce += 1;
        }

        let hash = *envelope.tx_hash();
        state.submitted.push(envelope);
        Ok(hash)
    }
}
