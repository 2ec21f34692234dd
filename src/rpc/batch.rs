//! Batched read calls.
//!
//! # Data Flow
//! ```text
//! [ReadCall; N]
//!     → chunks of at most max_chunk_size
//!     → one eth_call per call, ids strictly increasing (shared client counter)
//!     → one JSON-RPC batch array per chunk
//!     → responses routed back to their waiter by id, decoded per call schema
//!     → flat Vec<CallOutput> in input order
//! ```
//!
//! All-or-nothing: an error object, a missing response or an undecodable
//! result for any call fails the whole call and no partial results are
//! returned.

use alloy::primitives::Bytes;
use alloy::rpc::types::BlockNumberOrTag;

use crate::error::{WalletError, WalletResult};
use crate::observability::metrics;
use crate::rpc::calls::{CallOutput, ReadCall};
use crate::rpc::client::ChainClient;

/// Default chunk size for batches.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 100;

/// Aggregates independent reads into batch requests.
#[derive(Debug, Clone)]
pub struct BatchCallClient {
    client: ChainClient,
}

impl BatchCallClient {
    pub fn new(client: ChainClient) -> Self {
        Self { client }
    }

    /// Run `calls` as chunked batches and return one output per call.
    pub async fn batch_call(
        &self,
        calls: &[ReadCall],
        max_chunk_size: usize,
    ) -> WalletResult<Vec<CallOutput>> {
        if max_chunk_size == 0 {
            return Err(WalletError::Validation("max_chunk_size must be at least 1".into()));
        }

        let mut outputs = Vec::with_capacity(calls.len());
        for (chunk_idx, chunk) in calls.chunks(max_chunk_size).enumerate() {
            let decoded = self.run_chunk(chunk).await?;
            tracing::debug!(
                endpoint = %self.client.endpoint(),
                chunk = chunk_idx,
                size = chunk.len(),
                "Batch chunk decoded"
            );
            outputs.extend(decoded);
        }
        Ok(outputs)
    }

    async fn run_chunk(&self, chunk: &[ReadCall]) -> WalletResult<Vec<CallOutput>> {
        let mut batch = self.client.rpc().new_batch();
        let mut waiters = Vec::with_capacity(chunk.len());
        for call in chunk {
            let params = (call.to_call_request(), BlockNumberOrTag::Latest);
            waiters.push(batch.add_call::<_, Bytes>("eth_call", &params)?);
        }

        metrics::record_rpc_batch(chunk.len());
        batch.send().await?;

        // every waiter is awaited before any result is used
        let mut results = Vec::with_capacity(waiters.len());
        for waiter in waiters {
            results.push(waiter.await);
        }
        results
            .into_iter()
            .zip(chunk)
            .map(|(result, call)| {
                let data = result.map_err(WalletError::from)?;
                call.decode(&data)
            })
            .collect()
    }
}
