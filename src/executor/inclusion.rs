//! Waiting for a broadcast transaction to land in a block.

use std::time::Duration;

use alloy::primitives::B256;
use alloy::rpc::types::TransactionReceipt;
use tokio::time::{interval, timeout};

use crate::error::{WalletError, WalletResult};
use crate::rpc::ChainClient;

/// Poll for the receipt of `hash` every `poll_interval` until it is mined or
/// `wait` elapses.
///
/// Failed polls are retried until the deadline.
pub async fn wait_for_inclusion(
    client: &ChainClient,
    hash: B256,
    poll_interval: Duration,
    wait: Duration,
) -> WalletResult<TransactionReceipt> {
    let result = timeout(wait, async {
        let mut ticker = interval(poll_interval);

        loop {
            ticker.tick().await;

            match client.transaction_receipt(hash).await {
                Ok(Some(receipt)) if receipt.block_number.is_some() => return receipt,
                Ok(_) => tracing::debug!(tx_hash = %hash, "Transaction pending"),
                Err(e) => tracing::warn!(tx_hash = %hash, error = %e, "Receipt poll failed"),
            }
        }
    })
    .await;

    result.map_err(|_| WalletError::InclusionTimeout {
        hash: hash.to_string(),
        timeout_secs: wait.as_secs(),
    })
}
