//! Faucet account: signing key plus its nonce sequencer.
//!
//! # Security
//! - Private keys are loaded from the environment, never from config files
//! - Keys are never logged or serialized

use alloy::consensus::SignableTransaction;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Signature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::nonce::NonceSequencer;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "FAUCET_PRIVATE_KEY";

/// The funded account payouts are sent from.
#[derive(Debug)]
pub struct Account {
    /// The underlying signer (private key), bound to `chain_id`.
    signer: PrivateKeySigner,
    /// Nonce state for `signer.address()`; owned exclusively by this account.
    nonces: NonceSequencer,
    /// Chain ID for EIP-155 replay protection.
    chain_id: ChainId,
}

impl Account {
    /// Create an account from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID every signature is bound to
    pub fn from_private_key(private_key_hex: &str, chain_id: ChainId) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Signing(format!("Invalid private key format: {}", e)))?;
        let signer = signer.with_chain_id(Some(chain_id.0));

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id.0,
            "Faucet account loaded"
        );

        Ok(Self {
            nonces: NonceSequencer::new(signer.address()),
            signer,
            chain_id,
        })
    }

    /// Load the account from `FAUCET_PRIVATE_KEY`.
    pub fn from_env(chain_id: ChainId) -> BlockchainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Signing(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key, chain_id)
    }

    /// Get the account's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the chain ID this account signs for.
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn nonces(&self) -> &NonceSequencer {
        &self.nonces
    }

    /// Sign a transaction in place of its chain-ID-bound signing hash.
    pub fn sign_transaction(
        &self,
        tx: &mut dyn SignableTransaction<Signature>,
    ) -> BlockchainResult<Signature> {
        self.signer
            .sign_transaction_sync(tx)
            .map_err(|e| BlockchainError::Signing(format!("Signing failed: {}", e)))
    }
}
