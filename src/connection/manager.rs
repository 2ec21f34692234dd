//! Node connection with primary/secondary failover and liveness checks.
//!
//! # Responsibilities
//! - Bring up exactly one live node connection
//! - Verify liveness: fresh latest block, matching chain id
//! - Fail over from primary to secondary once per `connect`
//! - Hand the live connection to every other component
//!
//! There is no reconnect loop. When a node dies, callers decide whether to
//! call `connect` again.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use url::Url;

use crate::config::NodeConfig;
use crate::error::{WalletError, WalletResult};
use crate::observability::metrics;
use crate::rpc::ChainClient;

/// A verified connection to one node.
#[derive(Debug)]
pub struct NodeConnection {
    url: Url,
    client: ChainClient,
    chain_id: u64,
    synced_block: u64,
    synced_block_timestamp: u64,
    synced_at: Instant,
}

impl NodeConnection {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn client(&self) -> &ChainClient {
        &self.client
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Block number accepted by the last successful sync check.
    pub fn synced_block(&self) -> u64 {
        self.synced_block
    }

    /// Timestamp of the block accepted by the last sync check.
    pub fn synced_block_timestamp(&self) -> u64 {
        self.synced_block_timestamp
    }

    /// Time since the sync check passed.
    pub fn since_sync(&self) -> Duration {
        self.synced_at.elapsed()
    }
}

/// Owner of the single live node connection.
pub struct ConnectionManager {
    config: NodeConfig,
    slot: ArcSwapOption<NodeConnection>,
    /// Serializes connect attempts so a slot is always cleared before it is
    /// replaced.
    connect_lock: Mutex<()>,
}

impl ConnectionManager {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            slot: ArcSwapOption::empty(),
            connect_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Connect using the configured primary and secondary URLs.
    pub async fn connect_from_config(&self) -> WalletResult<Arc<NodeConnection>> {
        let primary = self.config.primary_url.clone();
        let secondary = self.config.secondary_url.clone();
        self.connect(&primary, secondary.as_deref()).await
    }

    /// Try the primary, then the secondary.
    pub async fn connect(
        &self,
        primary_url: &str,
        secondary_url: Option<&str>,
    ) -> WalletResult<Arc<NodeConnection>> {
        let _guard = self.connect_lock.lock().await;

        let primary_err = match self.connect_one_locked(primary_url).await {
            Ok(conn) => return Ok(conn),
            Err(e) => e,
        };

        let Some(secondary_url) = secondary_url else {
            return Err(WalletError::AllEndpointsUnreachable(format!(
                "{}: {}",
                primary_url, primary_err
            )));
        };

        tracing::warn!(
            primary = %primary_url,
            secondary = %secondary_url,
            error = %primary_err,
            "Primary node unavailable, failing over"
        );
        metrics::record_failover();

        match self.connect_one_locked(secondary_url).await {
            Ok(conn) => Ok(conn),
            Err(secondary_err) => Err(WalletError::AllEndpointsUnreachable(format!(
                "{}: {}; {}: {}",
                primary_url, primary_err, secondary_url, secondary_err
            ))),
        }
    }

    /// Connect to a single endpoint.
    pub async fn connect_one(&self, url: &str) -> WalletResult<Arc<NodeConnection>> {
        let _guard = self.connect_lock.lock().await;
        self.connect_one_locked(url).await
    }

    async fn connect_one_locked(&self, url: &str) -> WalletResult<Arc<NodeConnection>> {
        self.clear();

        let parsed: Url = url
            .parse()
            .map_err(|e| WalletError::Validation(format!("Invalid node URL '{}': {}", url, e)))?;
        let client = ChainClient::connect_http(
            parsed.clone(),
            Duration::from_secs(self.config.request_timeout_secs),
        )?;
        let rounds = self.config.sync_rounds;

        let mut last = WalletError::NotInitialized;
        for round in 1..=rounds {
            match self.sync_round(&client).await {
                Ok((block, timestamp)) => {
                    metrics::record_sync_round(true);
                    let conn = Arc::new(NodeConnection {
                        url: parsed,
                        client,
                        chain_id: self.config.chain_id,
                        synced_block: block,
                        synced_block_timestamp: timestamp,
                        synced_at: Instant::now(),
                    });
                    self.slot.store(Some(conn.clone()));
                    metrics::record_connection_state(true);
                    tracing::info!(
                        url = %url,
                        chain_id = self.config.chain_id,
                        block = block,
                        round = round,
                        "Node connection established"
                    );
                    return Ok(conn);
                }
                Err(e) => {
                    metrics::record_sync_round(false);
                    tracing::warn!(url = %url, round, error = %e, "Sync check rejected");
                    last = e;
                }
            }

            if round < rounds {
                sleep(Duration::from_millis(self.config.sync_backoff_ms)).await;
            }
        }

        self.clear();
        Err(WalletError::SyncTimeout {
            url: url.to_string(),
            rounds,
            last: Box::new(last),
        })
    }

    /// One liveness round: the latest header and the chain id, fetched
    /// concurrently under the sync timeout. Returns the accepted block
    /// number and timestamp.
    async fn sync_round(&self, client: &ChainClient) -> WalletResult<(u64, u64)> {
        let round = async { tokio::join!(client.latest_block(), client.chain_id()) };
        let (header, chain_id) = timeout(Duration::from_millis(self.config.sync_timeout_ms), round)
            .await
            .map_err(|_| WalletError::Timeout(self.config.sync_timeout_ms))?;
        let (header, chain_id) = (header?, chain_id?);

        if chain_id != self.config.chain_id {
            return Err(WalletError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id,
            });
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let age_secs = now.saturating_sub(header.timestamp);
        if age_secs > self.config.staleness_tolerance_secs {
            return Err(WalletError::NodeBehind {
                block: header.number,
                age_secs,
            });
        }

        Ok((header.number, header.timestamp))
    }

    /// The live connection.
    pub fn get(&self) -> WalletResult<Arc<NodeConnection>> {
        self.slot.load_full().ok_or(WalletError::NotInitialized)
    }

    /// Client of the live connection.
    pub fn client(&self) -> WalletResult<ChainClient> {
        Ok(self.get()?.client().clone())
    }

    pub fn is_set(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Drop the live connection, if any.
    pub fn clear(&self) {
        if self.slot.swap(None).is_some() {
            metrics::record_connection_state(false);
            tracing::debug!("Node connection cleared");
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("primary_url", &self.config.primary_url)
            .field("secondary_url", &self.config.secondary_url)
            .field("chain_id", &self.config.chain_id)
            .field("connected", &self.is_set())
            .finish()
    }
}
