//! Signing seam and the local private-key signer.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables or passed in
//! - Keys are never logged or serialized

use alloy::primitives::{Address, Signature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;

use crate::error::{WalletError, WalletResult};
use crate::fees::FeeEstimate;
use crate::tx::celo::{CeloTransaction, SignedTransaction};
use crate::tx::intent::TransactionIntent;

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "CELO_TXFLOW_PRIVATE_KEY";

/// Anything that can sign a populated transaction.
///
/// Implementations receive the full transaction rather than a hash so that
/// hardware devices can display and verify its fields.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Account the signer signs for.
    fn address(&self) -> Address;

    /// Produce a signature over `tx.signature_hash()`.
    async fn sign_transaction(&self, tx: &CeloTransaction) -> WalletResult<Signature>;
}

/// Populate `intent` with `fee`, `nonce` and `chain_id`, then delegate to
/// `signer`.
pub async fn sign_intent(
    signer: &dyn TransactionSigner,
    intent: &TransactionIntent,
    fee: &FeeEstimate,
    nonce: u64,
    chain_id: u64,
) -> WalletResult<SignedTransaction> {
    let tx = CeloTransaction::populate(intent, fee, nonce, chain_id);
    let signature = signer.sign_transaction(&tx).await?;
    tx.into_signed(signature)
}

/// Signs with an in-memory secp256k1 key.
#[derive(Debug, Clone)]
pub struct LocalSigner {
    signer: PrivateKeySigner,
}

impl LocalSigner {
    /// Create a signer from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    pub fn from_private_key(private_key_hex: &str) -> WalletResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| WalletError::Signing(format!("Invalid private key format: {}", e)))?;

        tracing::info!(address = %signer.address(), "Local signer initialized");

        Ok(Self { signer })
    }

    /// Load the key from `CELO_TXFLOW_PRIVATE_KEY`.
    pub fn from_env() -> WalletResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            WalletError::Signing(format!("Environment variable {} not set", PRIVATE_KEY_ENV_VAR))
        })?;

        Self::from_private_key(&private_key)
    }
}

#[async_trait]
impl TransactionSigner for LocalSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_transaction(&self, tx: &CeloTransaction) -> WalletResult<Signature> {
        self.signer
            .sign_hash(&tx.signature_hash())
            .await
            .map_err(|e| WalletError::Signing(format!("Signing failed: {}", e)))
    }
}
