//! Shared utilities for integration testing: a scripted node served over
//! HTTP, and balance and signer doubles.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::primitives::{keccak256, Address, Bloom, Bytes, Signature, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use celo_txflow::collaborators::{BalanceSnapshot, BalanceSource};
use celo_txflow::config::{ExecutorConfig, FeeConfig, NodeConfig};
use celo_txflow::fees::FeeToken;
use celo_txflow::rpc::calls::{balanceOfCall, getGasPriceMinimumCall, medianRateCall};
use celo_txflow::tx::{CeloTransaction, LocalSigner, TransactionSigner};
use celo_txflow::{ConnectionManager, WalletResult};

pub const CHAIN_ID: u64 = 44787;

// Well-known test private key (Anvil's first account)
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const GAS_PRICE_MINIMUM: Address = Address::repeat_byte(0x99);
pub const SORTED_ORACLES: Address = Address::repeat_byte(0x98);

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

pub fn celo() -> FeeToken {
    FeeToken::native("CELO", Address::repeat_byte(0xce))
}

pub fn token_a() -> FeeToken {
    FeeToken::stable("TKA", Address::repeat_byte(0xaa), 18).with_sort_order(1)
}

pub fn token_b() -> FeeToken {
    FeeToken::stable("TKB", Address::repeat_byte(0xbb), 18).with_sort_order(2)
}

/// Scripted chain state behind a JSON-RPC interface.
#[derive(Default)]
pub struct NodeState {
    pub chain_id: u64,
    pub nonce: u64,
    pub block: u64,
    /// How far the latest block's timestamp lags the wall clock.
    pub block_age_secs: u64,
    /// Delay before every HTTP response.
    pub delay_ms: u64,
    /// Gas price minimum per fee currency (zero address = native).
    pub gas_price_minimum: HashMap<Address, U256>,
    pub exchange_rates: HashMap<Address, (U256, U256)>,
    pub balances: HashMap<(Address, Address), U256>,
    /// Owners whose `balanceOf` reverts.
    pub reverting_owners: HashSet<Address>,
    /// Answer every batch with its last response missing.
    pub drop_last_batch_response: bool,
    pub gas_estimate: u64,
    /// Fee currencies for which `eth_estimateGas` fails.
    pub failing_fee_currencies: HashSet<Address>,
    /// Index of the `eth_sendRawTransaction` call that is refused.
    pub refuse_broadcast_at: Option<usize>,
    /// Index of the broadcast whose receipt reports a revert.
    pub revert_at: Option<usize>,
    pub sent: Vec<Bytes>,
    pub receipts: HashMap<B256, (u64, u64)>,
    pub methods: Vec<String>,
    pub batch_sizes: Vec<usize>,
    pub batch_ids: Vec<Vec<u64>>,
}

pub struct MockNode {
    pub state: Mutex<NodeState>,
}

impl MockNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(NodeState {
                chain_id: CHAIN_ID,
                block: 1_000,
                gas_estimate: 21_000,
                ..Default::default()
            }),
        })
    }

    pub fn with_state(self: &Arc<Self>, f: impl FnOnce(&mut NodeState)) -> Arc<Self> {
        f(&mut self.state.lock().unwrap());
        self.clone()
    }

    pub fn set_balance(&self, token: &FeeToken, owner: Address, amount: u64) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert((token.address, owner), U256::from(amount));
    }

    /// Register `token` as a fee currency with the given minimum and a 1:1
    /// exchange rate.
    pub fn set_gas_price(&self, token: &FeeToken, minimum: u64) {
        let mut state = self.state.lock().unwrap();
        let key = token.fee_currency().unwrap_or(Address::ZERO);
        state.gas_price_minimum.insert(key, U256::from(minimum));
        if let Some(address) = token.fee_currency() {
            state
                .exchange_rates
                .insert(address, (U256::from(1), U256::from(1)));
        }
    }

    pub fn methods(&self) -> Vec<String> {
        self.state.lock().unwrap().methods.clone()
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| *m == method).count()
    }

    /// Answer one JSON-RPC request object.
    pub fn handle(&self, request: &Value) -> Value {
        let mut state = self.state.lock().unwrap();
        let method = request["method"].as_str().unwrap_or_default().to_string();
        state.methods.push(method.clone());
        let id = request["id"].clone();
        let params = &request["params"];

        let result = match method.as_str() {
            "eth_chainId" => json!(format!("{:#x}", state.chain_id)),
            "eth_getBlockByNumber" => block_json(state.block, now_secs() - state.block_age_secs),
            "eth_getTransactionCount" => json!(format!("{:#x}", state.nonce)),
            "eth_estimateGas" => {
                let fee_currency: Option<Address> = params[0]
                    .get("feeCurrency")
                    .and_then(|v| serde_json::from_value(v.clone()).ok());
                if fee_currency.is_some_and(|f| state.failing_fee_currencies.contains(&f)) {
                    return failure(id, -32000, "gas required exceeds allowance");
                }
                json!(format!("{:#x}", state.gas_estimate))
            }
            "eth_call" => {
                let to: Address = serde_json::from_value(params[0]["to"].clone()).unwrap();
                let input = if params[0]["input"].is_null() {
                    &params[0]["data"]
                } else {
                    &params[0]["input"]
                };
                let data: Bytes = serde_json::from_value(input.clone()).unwrap();
                match eth_call(&state, to, &data) {
                    Some(out) => json!(Bytes::from(out)),
                    None => return failure(id, -32000, "execution reverted"),
                }
            }
            "eth_sendRawTransaction" => {
                let raw: Bytes = serde_json::from_value(params[0].clone()).unwrap();
                let index = state.sent.len();
                if state.refuse_broadcast_at == Some(index) {
                    return failure(id, -32000, "nonce too low");
                }
                let hash = keccak256(&raw);
                state.block += 1;
                let status = if state.revert_at == Some(index) { 0 } else { 1 };
                let block = state.block;
                state.receipts.insert(hash, (block, status));
                state.sent.push(raw);
                json!(hash)
            }
            "eth_getTransactionReceipt" => {
                let hash: B256 = serde_json::from_value(params[0].clone()).unwrap();
                match state.receipts.get(&hash) {
                    Some((block, status)) => receipt_json(hash, *block, *status),
                    None => Value::Null,
                }
            }
            other => return failure(id, -32601, &format!("{} not supported", other)),
        };
        json!({"jsonrpc": "2.0", "id": id, "result": result})
    }

    /// Answer a batch array, in reverse order to exercise id matching.
    pub fn handle_batch(&self, requests: &[Value]) -> Vec<Value> {
        let drop_last = {
            let mut state = self.state.lock().unwrap();
            state.batch_sizes.push(requests.len());
            state
                .batch_ids
                .push(requests.iter().filter_map(|r| r["id"].as_u64()).collect());
            state.drop_last_batch_response
        };
        let mut responses: Vec<Value> = requests.iter().map(|r| self.handle(r)).collect();
        if drop_last {
            responses.pop();
        }
        responses.reverse();
        responses
    }
}

fn failure(id: Value, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

fn block_json(number: u64, timestamp: u64) -> Value {
    json!({
        "hash": keccak256(number.to_be_bytes()),
        "parentHash": B256::ZERO,
        "sha3Uncles": B256::ZERO,
        "miner": Address::ZERO,
        "stateRoot": B256::ZERO,
        "transactionsRoot": B256::ZERO,
        "receiptsRoot": B256::ZERO,
        "logsBloom": Bloom::ZERO,
        "difficulty": "0x0",
        "number": format!("{:#x}", number),
        "gasLimit": "0x1c9c380",
        "gasUsed": "0x0",
        "timestamp": format!("{:#x}", timestamp),
        "extraData": "0x",
        "mixHash": B256::ZERO,
        "nonce": "0x0000000000000000",
        "baseFeePerGas": "0x1",
        "uncles": [],
        "transactions": [],
    })
}

fn receipt_json(hash: B256, block: u64, status: u64) -> Value {
    json!({
        "type": "0x0",
        "transactionHash": hash,
        "transactionIndex": "0x0",
        "blockHash": keccak256(block.to_be_bytes()),
        "blockNumber": format!("{:#x}", block),
        "from": Address::ZERO,
        "to": Address::ZERO,
        "contractAddress": null,
        "gasUsed": "0x5208",
        "cumulativeGasUsed": "0x5208",
        "effectiveGasPrice": "0x1",
        "status": format!("{:#x}", status),
        "logs": [],
        "logsBloom": Bloom::ZERO,
    })
}

fn eth_call(state: &NodeState, to: Address, data: &[u8]) -> Option<Vec<u8>> {
    let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
    if selector == balanceOfCall::SELECTOR {
        let call = balanceOfCall::abi_decode(data).ok()?;
        if state.reverting_owners.contains(&call.owner) {
            return None;
        }
        let balance = state.balances.get(&(to, call.owner)).copied().unwrap_or_default();
        Some(balance.abi_encode())
    } else if selector == getGasPriceMinimumCall::SELECTOR {
        let call = getGasPriceMinimumCall::abi_decode(data).ok()?;
        state
            .gas_price_minimum
            .get(&call.tokenAddress)
            .map(|price| price.abi_encode())
    } else if selector == medianRateCall::SELECTOR {
        let call = medianRateCall::abi_decode(data).ok()?;
        let (numerator, denominator) = state
            .exchange_rates
            .get(&call.token)
            .copied()
            .unwrap_or_default();
        Some((numerator, denominator).abi_encode_params())
    } else {
        None
    }
}

async fn rpc_handler(State(node): State<Arc<MockNode>>, Json(body): Json<Value>) -> Json<Value> {
    let delay_ms = node.state.lock().unwrap().delay_ms;
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
    match body.as_array() {
        Some(requests) => Json(Value::Array(node.handle_batch(requests))),
        None => Json(node.handle(&body)),
    }
}

/// Serve `node` over HTTP on an ephemeral port.
pub async fn start_http_node(node: Arc<MockNode>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/", post(rpc_handler)).with_state(node);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn url_of(addr: SocketAddr) -> String {
    format!("http://{}/", addr)
}

pub fn node_config(primary_url: String) -> NodeConfig {
    NodeConfig {
        primary_url,
        chain_id: CHAIN_ID,
        sync_rounds: 3,
        sync_timeout_ms: 1_000,
        sync_backoff_ms: 1,
        request_timeout_secs: 2,
        ..Default::default()
    }
}

pub fn fee_config() -> FeeConfig {
    FeeConfig {
        gas_price_multiplier: 1,
        gas_inflation_factor: 1.0,
        non_native_fee_gas_overhead: 0,
        gas_price_minimum_contract: GAS_PRICE_MINIMUM,
        sorted_oracles_contract: SORTED_ORACLES,
        ..Default::default()
    }
}

pub fn executor_config() -> ExecutorConfig {
    ExecutorConfig {
        receipt_poll_interval_ms: 5,
        receipt_timeout_secs: 5,
    }
}

/// A connection manager already connected to `node`, served over HTTP.
pub async fn connected(node: &Arc<MockNode>) -> Arc<ConnectionManager> {
    let addr = start_http_node(node.clone()).await;
    let manager = ConnectionManager::new(node_config(url_of(addr)));
    manager.connect_from_config().await.unwrap();
    Arc::new(manager)
}

fn balance_map(entries: &[(FeeToken, u64)]) -> HashMap<Address, U256> {
    entries
        .iter()
        .map(|(t, b)| (t.address, U256::from(*b)))
        .collect()
}

/// Balance source with a cached snapshot and the balances a refresh would
/// fetch. Counts refreshes.
pub struct StaticBalances {
    pub account: Address,
    cached: Mutex<HashMap<Address, U256>>,
    fresh: HashMap<Address, U256>,
    pub stale: AtomicBool,
    pub refreshes: AtomicUsize,
}

impl StaticBalances {
    /// Fresh source whose refresh returns the same balances.
    pub fn new(account: Address, entries: &[(FeeToken, u64)]) -> Arc<Self> {
        Self::build(account, entries, entries, false)
    }

    /// Stale source holding `cached` until a refresh fetches `fresh`.
    pub fn stale(account: Address, cached: &[(FeeToken, u64)], fresh: &[(FeeToken, u64)]) -> Arc<Self> {
        Self::build(account, cached, fresh, true)
    }

    fn build(
        account: Address,
        cached: &[(FeeToken, u64)],
        fresh: &[(FeeToken, u64)],
        stale: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            account,
            cached: Mutex::new(balance_map(cached)),
            fresh: balance_map(fresh),
            stale: AtomicBool::new(stale),
            refreshes: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl BalanceSource for StaticBalances {
    fn account(&self) -> Address {
        self.account
    }

    async fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot::new(self.cached.lock().unwrap().clone())
    }

    async fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    async fn refresh(&self) -> WalletResult<BalanceSnapshot> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        *self.cached.lock().unwrap() = self.fresh.clone();
        self.stale.store(false, Ordering::SeqCst);
        Ok(BalanceSnapshot::new(self.fresh.clone()))
    }
}

/// Local signer that records every transaction it is asked to sign.
pub struct RecordingSigner {
    inner: LocalSigner,
    pub signed: Mutex<Vec<CeloTransaction>>,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self {
            inner: LocalSigner::from_private_key(TEST_PRIVATE_KEY).unwrap(),
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn nonces(&self) -> Vec<u64> {
        self.signed.lock().unwrap().iter().map(|tx| tx.nonce).collect()
    }
}

#[async_trait]
impl TransactionSigner for RecordingSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_transaction(&self, tx: &CeloTransaction) -> WalletResult<Signature> {
        self.signed.lock().unwrap().push(tx.clone());
        self.inner.sign_transaction(tx).await
    }
}
