//! Crate-wide error type.
//!
//! Variants follow the pipeline's failure taxonomy: connectivity, validation,
//! estimation, signing/broadcast and protocol decoding. Estimation shortfall
//! is deliberately absent; see [`crate::fees::FeeEstimateSet::authoritative`].

use alloy::rpc::json_rpc::RpcError;
use alloy::transports::TransportError;
use thiserror::Error;

use crate::ledger::DeviceError;

/// Errors that can occur anywhere in the transaction pipeline.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Neither the primary nor the secondary node could be brought up.
    #[error("All endpoints unreachable: {0}")]
    AllEndpointsUnreachable(String),

    /// The node never reported a fresh block with the right chain id;
    /// `last` is why the final round was rejected.
    #[error("Node at {url} failed to sync after {rounds} rounds: {last}")]
    SyncTimeout {
        url: String,
        rounds: u32,
        #[source]
        last: Box<WalletError>,
    },

    /// The node's latest block is older than the staleness tolerance.
    #[error("Node is behind: block {block} is {age_secs}s old")]
    NodeBehind { block: u64, age_secs: u64 },

    /// A component asked for the connection before `connect` succeeded.
    #[error("Connection not initialized")]
    NotInitialized,

    /// Node reports a different chain than configured.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The node returned a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    RpcResponse { code: i64, message: String },

    /// A liveness round did not answer in time.
    #[error("RPC timeout after {0} ms")]
    Timeout(u64),

    /// Malformed response, batch mismatch, undecodable payload.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Fee estimation was asked to price nothing.
    #[error("Cannot estimate fees for an empty intent list")]
    EmptyIntentList,

    /// No candidate fee token produced an estimate.
    #[error("No fee estimate could be computed for any fee token")]
    NoEstimateComputable,

    /// Plan shape is invalid (empty or mismatched lengths).
    #[error("Invalid plan: {intents} intents, {estimates} fee estimates")]
    InvalidPlan { intents: usize, estimates: usize },

    /// Derivation path could not be parsed.
    #[error("Invalid derivation path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Generic input validation failure.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Local key loading or signing failed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Hardware device failure, passed through as reported.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Transaction was included but reverted.
    #[error("Transaction {0} reverted")]
    Reverted(String),

    /// Transaction was not included before the wait deadline.
    #[error("Transaction {hash} not included after {timeout_secs} seconds")]
    InclusionTimeout { hash: String, timeout_secs: u64 },

    /// A plan stopped part way; `succeeded` transactions are final on chain.
    #[error("Plan aborted after {succeeded} of {total} transactions: {source}")]
    PlanAborted {
        succeeded: usize,
        total: usize,
        #[source]
        source: Box<WalletError>,
    },
}

impl WalletError {
    /// Message suitable for an end user. Exhausted failover collapses into a
    /// single generic line.
    pub fn user_message(&self) -> String {
        match self {
            WalletError::AllEndpointsUnreachable(_) | WalletError::NotInitialized => {
                "Network unavailable".to_string()
            }
            WalletError::PlanAborted {
                succeeded, total, ..
            } => format!(
                "{} of {} transactions succeeded; check your transaction history",
                succeeded, total
            ),
            other => other.to_string(),
        }
    }
}

impl From<TransportError> for WalletError {
    fn from(e: TransportError) -> Self {
        match e {
            RpcError::ErrorResp(payload) => WalletError::RpcResponse {
                code: payload.code,
                message: payload.message.to_string(),
            },
            RpcError::NullResp => WalletError::Protocol("Node returned a null result".into()),
            RpcError::SerError(e) => WalletError::Protocol(format!("Request encoding failed: {}", e)),
            RpcError::DeserError { err, .. } => {
                WalletError::Protocol(format!("Undecodable response: {}", err))
            }
            other => WalletError::Rpc(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::Protocol(format!("JSON decode failed: {}", e))
    }
}

impl From<alloy::rlp::Error> for WalletError {
    fn from(e: alloy::rlp::Error) -> Self {
        WalletError::Protocol(format!("RLP decode failed: {}", e))
    }
}

/// Result type for pipeline operations.
pub type WalletResult<T> = Result<T, WalletError>;
