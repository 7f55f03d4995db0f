//! Transaction building, signing, and broadcasting.
//!
//! # Responsibilities
//! - Pick the gas limit for native and token payouts
//! - Assemble legacy or EIP-1559 transactions from the fee quote
//! - Sign with the faucet account and submit the raw encoding
//! - Resync the nonce when the node reports a nonce conflict
//!
//! A rejected transaction is not retried, and its nonce is not reused unless
//! a resync happens to hand it out again.

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, TxHash, TxKind, U256};
use std::sync::Arc;

use crate::blockchain::client::ChainClient;
use crate::blockchain::encoding::encode_transfer;
use crate::blockchain::fees::FeeStrategy;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainId, FeeMode, FeeQuote, TransferRequest,
};
use crate::blockchain::wallet::Account;
use crate::observability::metrics;

/// Gas for a plain value transfer.
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// Token transfer gas when the recipient already holds a balance.
pub const TOKEN_GAS_INITIALIZED_ACCOUNT: u64 = 35_000;

/// Token transfer gas when the recipient's balance slot is still empty.
pub const TOKEN_GAS_UNINITIALIZED_ACCOUNT: u64 = 52_000;

/// Fixed two-tier gas table for token transfers.
pub fn token_gas_limit(recipient_balance: U256) -> u64 {
    if recipient_balance.is_zero() {
        TOKEN_GAS_UNINITIALIZED_ACCOUNT
    } else {
        TOKEN_GAS_INITIALIZED_ACCOUNT
    }
}

/// What a payout transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Native,
    Token,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Token => "token",
        }
    }
}

/// Builds, signs and submits payout transactions.
pub struct TxBroadcaster<C> {
    chain: Arc<C>,
    account: Account,
    fees: FeeStrategy,
    token: Option<Address>,
}

impl<C: ChainClient> TxBroadcaster<C> {
    /// Probe the fee mode and seed the nonce from the chain.
    ///
    /// Either call failing means the chain is unusable, so construction fails.
    pub async fn new(
        chain: Arc<C>,
        account: Account,
        token: Option<Address>,
    ) -> BlockchainResult<Self> {
        let fees = FeeStrategy::probe(chain.as_ref()).await?;
        account.nonces().resync(chain.as_ref()).await?;

        tracing::info!(
            address = %account.address(),
            chain_id = account.chain_id().0,
            token = ?token,
            fee_mode = ?fees.mode(),
            "Transaction broadcaster ready"
        );

        Ok(Self {
            chain,
            account,
            fees,
            token,
        })
    }

    /// Faucet account address.
    pub fn address(&self) -> Address {
        self.account.address()
    }

    pub fn chain_id(&self) -> ChainId {
        self.account.chain_id()
    }

    pub fn fee_mode(&self) -> FeeMode {
        self.fees.mode()
    }

    /// Token contract, if payouts are token-denominated.
    pub fn token(&self) -> Option<Address> {
        self.token
    }

    pub fn kind(&self) -> TransferKind {
        if self.token.is_some() {
            TransferKind::Token
        } else {
            TransferKind::Native
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Send a payout in whichever denomination this broadcaster is set up for.
    pub async fn transfer(&self, request: TransferRequest) -> BlockchainResult<TxHash> {
        match self.kind() {
            TransferKind::Native => self.transfer_native(request.to, request.amount).await,
            TransferKind::Token => {
                let balance = request.recipient_balance.ok_or_else(|| {
                    BlockchainError::InvalidInput(
                        "token transfer needs the recipient balance".to_string(),
                    )
                })?;
                self.transfer_token(request.to, request.amount, balance).await
            }
        }
    }

    /// Send `amount` wei of the native currency to `to`.
    pub async fn transfer_native(&self, to: Address, amount: U256) -> BlockchainResult<TxHash> {
        ensure_positive(amount)?;
        self.submit(TransferKind::Native, to, amount, Bytes::new(), NATIVE_TRANSFER_GAS)
            .await
    }

    /// Call `transfer(to, amount)` on the token contract.
    pub async fn transfer_token(
        &self,
        to: Address,
        amount: U256,
        recipient_balance: U256,
    ) -> BlockchainResult<TxHash> {
        ensure_positive(amount)?;
        let token = self.token.ok_or_else(|| {
            BlockchainError::InvalidInput("no token contract configured".to_string())
        })?;

        let gas_limit = token_gas_limit(recipient_balance);
        let input = encode_transfer(to, amount);
        self.submit(TransferKind::Token, token, U256::ZERO, input, gas_limit)
            .await
    }

    /// Token balance of `holder`.
    pub async fn recipient_token_balance(&self, holder: Address) -> BlockchainResult<U256> {
        let token = self.token.ok_or_else(|| {
            BlockchainError::InvalidInput("no token contract configured".to_string())
        })?;
        self.chain.token_balance(token, holder).await
    }

    async fn submit(
        &self,
        kind: TransferKind,
        to: Address,
        value: U256,
        input: Bytes,
        gas_limit: u64,
    ) -> BlockchainResult<TxHash> {
        let quote = self.fees.quote(self.chain.as_ref()).await?;
        let nonce = self.account.nonces().next().await;

        let envelope = self.sign(nonce, quote, gas_limit, to, value, input)?;
        let tx_hash = *envelope.tx_hash();
        let raw = Bytes::from(envelope.encoded_2718());

        match self.chain.send_raw_transaction(raw).await {
            Ok(_) => {
                metrics::record_transaction(kind.as_str());
                tracing::debug!(tx_hash = %tx_hash, nonce, gas_limit, kind = kind.as_str(), "Transaction submitted");
                Ok(tx_hash)
            }
            Err(e) => {
                tracing::error!(tx_hash = %tx_hash, nonce, error = %e, "Failed to send transaction");
                if e.is_nonce_conflict() {
                    if let Err(resync_err) = self.account.nonces().resync(self.chain.as_ref()).await
                    {
                        tracing::error!(
                            address = %self.account.address(),
                            error = %resync_err,
                            "Failed to refresh account nonce"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Build and sign one transaction. Legacy quotes produce EIP-155 legacy
    /// transactions, dynamic quotes produce EIP-1559 ones.
    fn sign(
        &self,
        nonce: u64,
        quote: FeeQuote,
        gas_limit: u64,
        to: Address,
        value: U256,
        input: Bytes,
    ) -> BlockchainResult<TxEnvelope> {
        let chain_id = self.account.chain_id().0;
        let envelope = match quote {
            FeeQuote::Legacy { gas_price } => {
                let mut tx = TxLegacy {
                    chain_id: Some(chain_id),
                    nonce,
                    gas_price,
                    gas_limit,
                    to: TxKind::Call(to),
                    value,
                    input,
                };
                let signature = self.account.sign_transaction(&mut tx)?;
                tx.into_signed(signature).into()
            }
            FeeQuote::Dynamic {
                max_priority_fee_per_gas,
                max_fee_per_gas,
            } => {
                let mut tx = TxEip1559 {
                    chain_id,
                    nonce,
                    gas_limit,
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                    to: TxKind::Call(to),
                    value,
                    access_list: Default::default(),
                    input,
                };
                let signature = self.account.sign_transaction(&mut tx)?;
                tx.into_signed(signature).into()
            }
        };
        Ok(envelope)
    }
}

fn ensure_positive(amount: U256) -> BlockchainResult<()> {
    if amount.is_zero() {
        return Err(BlockchainError::InvalidInput(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::mock::MockChain;
    use alloy::consensus::transaction::SignerRecoverable;
    use alloy::consensus::Transaction;
    use alloy::primitives::address;
    use std::collections::HashSet;

    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const RECIPIENT: Address = address!("Ab5801a7D398351b8bE11C439e05C5B3259aeC9B");
    const TOKEN: Address = address!("bb5801a7D398351b8bE11C439e05C5B3259ae000");

    async fn broadcaster(chain: &MockChain, token: Option<Address>) -> TxBroadcaster<MockChain> {
        let account = Account::from_private_key(TEST_PRIVATE_KEY, ChainId(31337)).unwrap();
        TxBroadcaster::new(Arc::new(chain.clone()), account, token)
            .await
            .unwrap()
    }

    #[test]
    fn test_token_gas_table() {
        assert_eq!(token_gas_limit(U256::ZERO), TOKEN_GAS_UNINITIALIZED_ACCOUNT);
        assert_eq!(token_gas_limit(U256::from(1u64)), TOKEN_GAS_INITIALIZED_ACCOUNT);
        assert_eq!(token_gas_limit(U256::MAX), TOKEN_GAS_INITIALIZED_ACCOUNT);
    }

    #[tokio::test]
    async fn test_native_transfer_dynamic_fees() {
        let chain = MockChain::new();
        let faucet = broadcaster(&chain, None).await;
        assert_eq!(faucet.fee_mode(), FeeMode::Dynamic);

        let hash = faucet
            .transfer_native(RECIPIENT, U256::from(1000u64))
            .await
            .unwrap();

        let sent = chain.submitted();
        assert_eq!(sent.len(), 1);
        let tx = &sent[0];
        assert_eq!(*tx.tx_hash(), hash);
        assert!(tx.is_eip1559());
        assert_eq!(tx.to(), Some(RECIPIENT));
        assert_eq!(tx.value(), U256::from(1000u64));
        assert_eq!(tx.gas_limit(), NATIVE_TRANSFER_GAS);
        assert_eq!(tx.chain_id(), Some(31337));
        assert_eq!(tx.max_fee_per_gas(), 4_000_000_000);
        assert_eq!(tx.max_priority_fee_per_gas(), Some(2_000_000_000));
        assert_eq!(tx.gas_price(), None);
        assert_eq!(tx.recover_signer().unwrap(), faucet.address());
    }

    #[tokio::test]
    async fn test_native_transfer_legacy_fees() {
        let chain = MockChain::legacy();
        chain.set_gas_price(875_000_000);
        let faucet = broadcaster(&chain, None).await;

        faucet
            .transfer_native(RECIPIENT, U256::from(1000u64))
            .await
            .unwrap();

        let tx = &chain.submitted()[0];
        assert!(tx.is_legacy());
        assert_eq!(tx.gas_price(), Some(875_000_000));
        assert_eq!(tx.max_priority_fee_per_gas(), None);
        // EIP-155 replay protection
        assert_eq!(tx.chain_id(), Some(31337));
    }

    #[tokio::test]
    async fn test_token_transfer_gas_by_balance() {
        let chain = MockChain::new();
        let faucet = broadcaster(&chain, Some(TOKEN)).await;
        let amount = U256::from(1000u64);

        faucet.transfer_token(RECIPIENT, amount, U256::ZERO).await.unwrap();
        faucet
            .transfer_token(RECIPIENT, amount, U256::from(5u64))
            .await
            .unwrap();

        let sent = chain.submitted();
        assert_eq!(sent[0].gas_limit(), TOKEN_GAS_UNINITIALIZED_ACCOUNT);
        assert_eq!(sent[1].gas_limit(), TOKEN_GAS_INITIALIZED_ACCOUNT);
        for tx in &sent {
            assert_eq!(tx.to(), Some(TOKEN));
            assert_eq!(tx.value(), U256::ZERO);
            assert_eq!(tx.input(), &encode_transfer(RECIPIENT, amount));
        }
    }

    #[tokio::test]
    async fn test_transfer_dispatches_on_token() {
        let chain = MockChain::new();
        let faucet = broadcaster(&chain, Some(TOKEN)).await;
        assert_eq!(faucet.kind(), TransferKind::Token);

        let missing_balance = TransferRequest::native(RECIPIENT, U256::from(1u64));
        assert!(faucet.transfer(missing_balance).await.is_err());

        let request = TransferRequest::token(RECIPIENT, U256::from(1u64), U256::ZERO);
        faucet.transfer(request).await.unwrap();
        assert_eq!(chain.submitted()[0].to(), Some(TOKEN));
    }

    #[tokio::test]
    async fn test_token_transfer_requires_contract() {
        let chain = MockChain::new();
        let faucet = broadcaster(&chain, None).await;
        let err = faucet
            .transfer_token(RECIPIENT, U256::from(1u64), U256::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidInput(_)));
        assert!(chain.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_zero_amount_rejected_before_chain() {
        let chain = MockChain::new();
        let faucet = broadcaster(&chain, None).await;
        let fetches = chain.header_fetches();

        let err = faucet.transfer_native(RECIPIENT, U256::ZERO).await.unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidInput(_)));
        assert_eq!(chain.header_fetches(), fetches);
        assert_eq!(faucet.account().nonces().current().await, 0);
    }

    #[tokio::test]
    async fn test_construction_requires_chain() {
        let chain = MockChain::new();
        chain.set_unreachable(true);
        let account = Account::from_private_key(TEST_PRIVATE_KEY, ChainId(31337)).unwrap();
        let result = TxBroadcaster::new(Arc::new(chain), account, None).await;
        assert!(matches!(result, Err(BlockchainError::Connectivity(_))));
    }

    #[tokio::test]
    async fn test_nonce_seeded_from_chain() {
        let chain = MockChain::new();
        chain.set_pending_nonce(9);
        let faucet = broadcaster(&chain, None).await;

        faucet.transfer_native(RECIPIENT, U256::from(1u64)).await.unwrap();
        assert_eq!(chain.submitted()[0].nonce(), 9);
    }

    #[tokio::test]
    async fn test_nonce_conflict_triggers_resync() {
        let chain = MockChain::new();
        let faucet = broadcaster(&chain, None).await;

        // Something else used nonces 0..12 behind our back
        chain.set_pending_nonce(12);
        let err = faucet
            .transfer_native(RECIPIENT, U256::from(1u64))
            .await
            .unwrap_err();
        assert!(err.is_nonce_conflict());
        assert_eq!(faucet.account().nonces().current().await, 12);

        // The failed request is not retried; the next one uses the fresh nonce
        faucet.transfer_native(RECIPIENT, U256::from(1u64)).await.unwrap();
        let sent = chain.submitted();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].nonce(), 12);
    }

    #[tokio::test]
    async fn test_other_rejection_leaves_nonce_gap() {
        let chain = MockChain::new();
        let faucet = broadcaster(&chain, None).await;
        let fetches = chain.nonce_fetches();

        chain.reject_next_submission("insufficient funds for gas * price + value");
        let err = faucet
            .transfer_native(RECIPIENT, U256::from(1u64))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "insufficient funds for gas * price + value");
        assert_eq!(chain.nonce_fetches(), fetches);

        faucet.transfer_native(RECIPIENT, U256::from(1u64)).await.unwrap();
        assert_eq!(chain.submitted()[0].nonce(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_use_distinct_nonces() {
        let chain = MockChain::new();
        let faucet = Arc::new(broadcaster(&chain, None).await);

        let mut tasks = Vec::new();
        for i in 1..=20u64 {
            let faucet = faucet.clone();
            tasks.push(tokio::spawn(async move {
                faucet.transfer_native(RECIPIENT, U256::from(i)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let attempted = chain.attempted_nonces();
        assert_eq!(attempted.len(), 20);
        let distinct: HashSet<u64> = attempted.into_iter().collect();
        assert_eq!(distinct, (0..20).collect::<HashSet<u64>>());
        assert_eq!(chain.submitted().len(), 20);
        assert_eq!(faucet.account().nonces().current().await, 20);
    }
}
