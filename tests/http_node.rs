//! Connection and batching over real HTTP against an axum-served node.

use std::sync::Arc;

use alloy::primitives::{Address, U256};

use celo_txflow::collaborators::{BalanceSource, ChainBalances};
use celo_txflow::config::NodeConfig;
use celo_txflow::rpc::{BatchCallClient, ReadCall};
use celo_txflow::{ConnectionManager, WalletError};

mod common;
use common::{closed_addr, start_http_node, token_a, url_of, MockNode, CHAIN_ID};

fn config(primary: String, secondary: Option<String>) -> NodeConfig {
    NodeConfig {
        primary_url: primary,
        secondary_url: secondary,
        chain_id: CHAIN_ID,
        sync_rounds: 3,
        sync_timeout_ms: 500,
        sync_backoff_ms: 1,
        request_timeout_secs: 2,
        staleness_tolerance_secs: 120,
        ..Default::default()
    }
}

async fn manager_for(node: &Arc<MockNode>) -> (ConnectionManager, String) {
    let url = url_of(start_http_node(node.clone()).await);
    (ConnectionManager::new(config(url.clone(), None)), url)
}

/// Unwrap a `SyncTimeout` into its round count and final cause.
fn sync_failure(err: WalletError) -> (u32, WalletError) {
    match err {
        WalletError::SyncTimeout { rounds, last, .. } => (rounds, *last),
        other => panic!("expected SyncTimeout, got {other}"),
    }
}

#[tokio::test]
async fn test_connect_over_http() {
    let node = MockNode::new();
    let (manager, url) = manager_for(&node).await;

    let conn = manager.connect_from_config().await.unwrap();
    assert_eq!(conn.chain_id(), CHAIN_ID);
    assert_eq!(conn.synced_block(), 1_000);
    assert_eq!(conn.url().as_str(), url);
    assert_eq!(node.count("eth_chainId"), 1);
    assert!(manager.is_set());
}

#[tokio::test]
async fn test_stale_node_exhausts_rounds() {
    let node = MockNode::new().with_state(|s| s.block_age_secs = 3_600);
    let (manager, url) = manager_for(&node).await;

    let (rounds, last) = sync_failure(manager.connect_one(&url).await.unwrap_err());
    assert_eq!(rounds, 3);
    assert!(matches!(last, WalletError::NodeBehind { block: 1_000, age_secs } if age_secs >= 3_600));
    assert_eq!(node.count("eth_getBlockByNumber"), 3);
    assert!(!manager.is_set());
}

#[tokio::test]
async fn test_wrong_chain_reported_as_cause() {
    let node = MockNode::new().with_state(|s| s.chain_id = 42220);
    let (manager, url) = manager_for(&node).await;

    let err = manager.connect_one(&url).await.unwrap_err();
    assert!(err.to_string().contains("Chain ID mismatch: expected 44787, got 42220"));
    let (_, last) = sync_failure(err);
    assert!(matches!(
        last,
        WalletError::ChainMismatch {
            expected: CHAIN_ID,
            actual: 42220
        }
    ));

    // through failover the cause survives in the combined message
    let err = manager.connect_from_config().await.unwrap_err();
    assert!(matches!(err, WalletError::AllEndpointsUnreachable(ref m) if m.contains("Chain ID mismatch")));
}

#[tokio::test]
async fn test_slow_node_times_out_each_round() {
    let node = MockNode::new().with_state(|s| s.delay_ms = 300);
    let url = url_of(start_http_node(node.clone()).await);
    let manager = ConnectionManager::new(NodeConfig {
        sync_rounds: 2,
        sync_timeout_ms: 50,
        ..config(url.clone(), None)
    });

    let (rounds, last) = sync_failure(manager.connect_one(&url).await.unwrap_err());
    assert_eq!(rounds, 2);
    assert!(matches!(last, WalletError::Timeout(50)));
}

#[tokio::test]
async fn test_failover_from_dead_primary() {
    let node = MockNode::new();
    let live = url_of(start_http_node(node.clone()).await);
    let dead = url_of(closed_addr().await);

    let manager = ConnectionManager::new(config(dead, Some(live.clone())));
    let conn = manager.connect_from_config().await.unwrap();
    assert_eq!(conn.url().as_str(), live);
}

#[tokio::test]
async fn test_failover_from_stale_primary() {
    let stale = MockNode::new().with_state(|s| s.block_age_secs = 3_600);
    let fresh = MockNode::new();
    let stale_url = url_of(start_http_node(stale.clone()).await);
    let fresh_url = url_of(start_http_node(fresh.clone()).await);

    let manager = ConnectionManager::new(config(stale_url, Some(fresh_url.clone())));
    let conn = manager.connect_from_config().await.unwrap();
    assert_eq!(conn.url().as_str(), fresh_url);
    assert_eq!(stale.count("eth_getBlockByNumber"), 3);
}

#[tokio::test]
async fn test_all_endpoints_down() {
    let manager = ConnectionManager::new(config(
        url_of(closed_addr().await),
        Some(url_of(closed_addr().await)),
    ));
    let err = manager.connect_from_config().await.unwrap_err();
    assert!(matches!(err, WalletError::AllEndpointsUnreachable(_)));
    assert_eq!(err.user_message(), "Network unavailable");
    assert!(!manager.is_set());
}

#[tokio::test]
async fn test_reconnect_replaces_connection() {
    let first = MockNode::new();
    let second = MockNode::new().with_state(|s| s.block = 2_000);
    let (manager, _) = manager_for(&first).await;
    manager.connect_from_config().await.unwrap();

    let second_url = url_of(start_http_node(second.clone()).await);
    let conn = manager.connect_one(&second_url).await.unwrap();
    assert_eq!(conn.synced_block(), 2_000);
    assert_eq!(manager.get().unwrap().url().as_str(), second_url);

    // a failed reconnect leaves nothing behind
    let dead = url_of(closed_addr().await);
    assert!(manager.connect_one(&dead).await.is_err());
    assert!(matches!(manager.get(), Err(WalletError::NotInitialized)));
}

fn balance_calls(owners: &[Address]) -> Vec<ReadCall> {
    owners
        .iter()
        .map(|owner| ReadCall::BalanceOf {
            token: token_a().address,
            owner: *owner,
        })
        .collect()
}

#[tokio::test]
async fn test_batch_call_chunks_over_http() {
    let node = MockNode::new();
    let owners: Vec<Address> = (1..=5u8).map(Address::repeat_byte).collect();
    for (i, owner) in owners.iter().enumerate() {
        node.set_balance(&token_a(), *owner, 100 + i as u64);
    }
    let (manager, _) = manager_for(&node).await;
    manager.connect_from_config().await.unwrap();

    let outputs = BatchCallClient::new(manager.client().unwrap())
        .batch_call(&balance_calls(&owners), 2)
        .await
        .unwrap();

    // answers arrive reversed; results still follow call order
    let values: Vec<U256> = outputs.into_iter().map(|o| o.into_scalar().unwrap()).collect();
    assert_eq!(values, (100..105u64).map(U256::from).collect::<Vec<_>>());

    let state = node.state.lock().unwrap();
    assert_eq!(state.batch_sizes, vec![2, 2, 1]);
    let ids: Vec<u64> = state.batch_ids.iter().flatten().copied().collect();
    assert_eq!(ids.len(), 5);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_batch_item_error_fails_whole_call() {
    let owners: Vec<Address> = (1..=3u8).map(Address::repeat_byte).collect();
    let node = MockNode::new().with_state(|s| {
        s.reverting_owners.insert(Address::repeat_byte(2));
    });
    let (manager, _) = manager_for(&node).await;
    manager.connect_from_config().await.unwrap();

    let err = BatchCallClient::new(manager.client().unwrap())
        .batch_call(&balance_calls(&owners), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::RpcResponse { code: -32000, .. }));
}

#[tokio::test]
async fn test_batch_missing_response_fails() {
    let owners: Vec<Address> = (1..=3u8).map(Address::repeat_byte).collect();
    let node = MockNode::new().with_state(|s| s.drop_last_batch_response = true);
    let (manager, _) = manager_for(&node).await;
    manager.connect_from_config().await.unwrap();

    let result = BatchCallClient::new(manager.client().unwrap())
        .batch_call(&balance_calls(&owners), 10)
        .await;
    assert!(matches!(result, Err(WalletError::Rpc(_))));
}

#[tokio::test]
async fn test_chain_balances_refresh() {
    let node = MockNode::new();
    let owner = Address::repeat_byte(0x42);
    node.set_balance(&token_a(), owner, 777);
    let (manager, _) = manager_for(&node).await;
    manager.connect_from_config().await.unwrap();

    let source = ChainBalances::new(
        owner,
        vec![token_a().address, common::celo().address],
        Arc::new(manager),
        std::time::Duration::from_secs(30),
    );
    assert!(source.is_stale().await);

    let snapshot = source.refresh().await.unwrap();
    assert_eq!(snapshot.balance_of(token_a().address), U256::from(777));
    assert_eq!(snapshot.balance_of(common::celo().address), U256::ZERO);
    assert!(!source.is_stale().await);
}
