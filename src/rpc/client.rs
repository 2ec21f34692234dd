//! Typed node client on an alloy provider.
//!
//! # Responsibilities
//! - Open an HTTP provider with a whole-request timeout
//! - Query chain state (chain id, latest block, nonces, receipts)
//! - Estimate gas with the fee-currency extension, broadcast raw transactions
//! - Expose the underlying RPC client for id-tagged batches

use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U64};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::{BlockNumberOrTag, Header, TransactionReceipt};
use alloy::transports::http::Http;
use alloy::transports::TransportResult;
use url::Url;

use crate::error::{WalletError, WalletResult};
use crate::observability::metrics;
use crate::rpc::types::CallRequest;

/// Client for one node endpoint. Cheap to clone; clones share the request
/// id counter.
#[derive(Clone)]
pub struct ChainClient {
    url: Url,
    rpc: RpcClient,
    provider: RootProvider,
}

impl ChainClient {
    /// Create an HTTP client for `url`. No request is sent until first use.
    pub fn connect_http(url: Url, request_timeout: Duration) -> WalletResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| WalletError::Rpc(format!("Failed to build HTTP client: {}", e)))?;
        let rpc = RpcClient::new(Http::with_client(http, url.clone()), false);
        let provider = RootProvider::new(rpc.clone());
        Ok(Self { url, rpc, provider })
    }

    /// Endpoint URL, for logging.
    pub fn endpoint(&self) -> &Url {
        &self.url
    }

    /// The RPC client, for batch requests.
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Get the chain ID reported by the node.
    pub async fn chain_id(&self) -> WalletResult<u64> {
        track("eth_chainId", self.provider.get_chain_id().await)
    }

    /// Get the latest block header.
    pub async fn latest_block(&self) -> WalletResult<Header> {
        let block = track(
            "eth_getBlockByNumber",
            self.provider.get_block_by_number(BlockNumberOrTag::Latest).await,
        )?;
        block
            .map(|b| b.header)
            .ok_or_else(|| WalletError::Protocol("Node returned no latest block".to_string()))
    }

    /// Get the pending transaction count (nonce) for an address.
    pub async fn transaction_count(&self, address: Address) -> WalletResult<u64> {
        track(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address).pending().await,
        )
    }

    /// Estimate gas for a call, honoring its `feeCurrency`.
    pub async fn estimate_gas(&self, call: &CallRequest) -> WalletResult<u64> {
        let gas: U64 = track(
            "eth_estimateGas",
            self.provider
                .raw_request("eth_estimateGas".into(), (call.clone(),))
                .await,
        )?;
        Ok(gas.to())
    }

    /// Broadcast a signed raw transaction, returning the hash the node
    /// reports.
    pub async fn send_raw_transaction(&self, raw: &Bytes) -> WalletResult<B256> {
        let pending = track(
            "eth_sendRawTransaction",
            self.provider.send_raw_transaction(raw).await,
        )?;
        Ok(*pending.tx_hash())
    }

    /// Get a transaction receipt by hash; `None` while pending.
    pub async fn transaction_receipt(&self, hash: B256) -> WalletResult<Option<TransactionReceipt>> {
        track(
            "eth_getTransactionReceipt",
            self.provider.get_transaction_receipt(hash).await,
        )
    }
}

fn track<T>(method: &'static str, result: TransportResult<T>) -> WalletResult<T> {
    metrics::record_rpc_request(method, result.is_ok());
    result.map_err(WalletError::from)
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("endpoint", &self.url.as_str())
            .finish()
    }
}
