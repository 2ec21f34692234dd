//! Transaction population, serialization and signing.
//!
//! # Data Flow
//! ```text
//! TransactionIntent + FeeEstimate + nonce + chain id
//!     → CeloTransaction::populate (standard + fee-currency/gateway fields)
//!     → TransactionSigner (local key or hardware device)
//!     → SignedTransaction (raw RLP bytes + hash)
//! ```

pub mod celo;
pub mod intent;
pub mod signer;

pub use celo::{eip155_v, CeloTransaction, SignedTransaction, MAX_CHAIN_ID};
pub use intent::TransactionIntent;
pub use signer::{sign_intent, LocalSigner, TransactionSigner, PRIVATE_KEY_ENV_VAR};
