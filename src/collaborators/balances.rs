//! Token balance snapshots.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::connection::ConnectionManager;
use crate::error::WalletResult;
use crate::rpc::{BatchCallClient, ReadCall};

/// Balances of one account, keyed by token address.
#[derive(Debug, Clone, Default)]
pub struct BalanceSnapshot {
    balances: HashMap<Address, U256>,
    fetched_at: Option<Instant>,
}

impl BalanceSnapshot {
    /// Snapshot taken now.
    pub fn new(balances: HashMap<Address, U256>) -> Self {
        Self {
            balances,
            fetched_at: Some(Instant::now()),
        }
    }

    /// Balance of `token`; unknown tokens read as zero.
    pub fn balance_of(&self, token: Address) -> U256 {
        self.balances.get(&token).copied().unwrap_or(U256::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Whether the snapshot is older than `ttl` (or was never fetched).
    pub fn is_older_than(&self, ttl: Duration) -> bool {
        self.fetched_at.map_or(true, |at| at.elapsed() > ttl)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &U256)> {
        self.balances.iter()
    }
}

/// Source of the current account's token balances.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Account whose balances are reported.
    fn account(&self) -> Address;

    /// Last known balances, possibly stale.
    async fn snapshot(&self) -> BalanceSnapshot;

    async fn is_stale(&self) -> bool;

    /// Re-read balances and return the new snapshot.
    async fn refresh(&self) -> WalletResult<BalanceSnapshot>;
}

/// Balances read from the node with one batched `balanceOf` per token.
pub struct ChainBalances {
    account: Address,
    tokens: Vec<Address>,
    connections: Arc<ConnectionManager>,
    ttl: Duration,
    current: RwLock<BalanceSnapshot>,
}

impl ChainBalances {
    pub fn new(
        account: Address,
        tokens: Vec<Address>,
        connections: Arc<ConnectionManager>,
        ttl: Duration,
    ) -> Self {
        Self {
            account,
            tokens,
            connections,
            ttl,
            current: RwLock::new(BalanceSnapshot::default()),
        }
    }
}

#[async_trait]
impl BalanceSource for ChainBalances {
    fn account(&self) -> Address {
        self.account
    }

    async fn snapshot(&self) -> BalanceSnapshot {
        self.current.read().await.clone()
    }

    async fn is_stale(&self) -> bool {
        self.current.read().await.is_older_than(self.ttl)
    }

    async fn refresh(&self) -> WalletResult<BalanceSnapshot> {
        let calls: Vec<ReadCall> = self
            .tokens
            .iter()
            .map(|token| ReadCall::BalanceOf {
                token: *token,
                owner: self.account,
            })
            .collect();

        let batch = BatchCallClient::new(self.connections.client()?);
        let outputs = batch
            .batch_call(&calls, self.connections.config().batch_chunk_size)
            .await?;

        let balances = self
            .tokens
            .iter()
            .copied()
            .zip(outputs)
            .map(|(token, output)| Ok((token, output.into_scalar()?)))
            .collect::<WalletResult<HashMap<_, _>>>()?;

        let snapshot = BalanceSnapshot::new(balances);
        *self.current.write().await = snapshot.clone();
        tracing::debug!(account = %self.account, tokens = self.tokens.len(), "Balances refreshed");
        Ok(snapshot)
    }
}
