//! Multi-token fee estimation.
//!
//! # Flow
//! ```text
//! estimate_fee(intents, force_fresh, preferred, tx_token)
//!     → publish None (stale results never outlive a new request)
//!     → refresh balances if stale or forced
//!     → order candidates (preference.rs)
//!     → per candidate: gas price (cached) + gas per intent → total fee
//!     → first candidate whose balance covers the total wins
//!     → otherwise the first computable candidate, flagged non-authoritative
//!     → publish Some(result)
//! ```

use std::sync::Arc;

use alloy::primitives::Address;
use futures_util::future::try_join_all;
use tokio::sync::watch;

use crate::collaborators::BalanceSource;
use crate::config::{FeeConfig, WalletConfig};
use crate::connection::ConnectionManager;
use crate::error::{WalletError, WalletResult};
use crate::fees::gas_price::GasPriceCache;
use crate::fees::preference::fee_token_preference;
use crate::fees::types::{FeeEstimate, FeeEstimateSet, FeeToken};
use crate::observability::metrics;
use crate::rpc::{BatchCallClient, ChainClient};
use crate::tx::TransactionIntent;

/// Prices a list of intents in the best affordable fee token.
pub struct FeeEstimationEngine {
    connections: Arc<ConnectionManager>,
    balances: Arc<dyn BalanceSource>,
    tokens: Vec<FeeToken>,
    config: FeeConfig,
    gas_prices: GasPriceCache,
    published: watch::Sender<Option<FeeEstimateSet>>,
}

impl FeeEstimationEngine {
    pub fn new(
        connections: Arc<ConnectionManager>,
        balances: Arc<dyn BalanceSource>,
        tokens: Vec<FeeToken>,
        config: FeeConfig,
    ) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            gas_prices: GasPriceCache::new(&config),
            connections,
            balances,
            tokens,
            config,
            published,
        }
    }

    /// Engine over the configured fee tokens.
    pub fn from_config(
        config: &WalletConfig,
        connections: Arc<ConnectionManager>,
        balances: Arc<dyn BalanceSource>,
    ) -> Self {
        let tokens = config.tokens.iter().map(FeeToken::from).collect();
        Self::new(connections, balances, tokens, config.fees.clone())
    }

    /// Watch the published estimate. `None` while a computation is running
    /// or after one failed.
    pub fn subscribe(&self) -> watch::Receiver<Option<FeeEstimateSet>> {
        self.published.subscribe()
    }

    /// Most recently published estimate.
    pub fn current(&self) -> Option<FeeEstimateSet> {
        self.published.borrow().clone()
    }

    pub fn tokens(&self) -> &[FeeToken] {
        &self.tokens
    }

    /// Estimate fees for `intents`, choosing one fee token for all of them.
    pub async fn estimate_fee(
        &self,
        intents: &[TransactionIntent],
        force_fresh: bool,
        preferred: Option<Address>,
        tx_token: Option<Address>,
    ) -> WalletResult<FeeEstimateSet> {
        self.published.send_replace(None);
        if intents.is_empty() {
            return Err(WalletError::EmptyIntentList);
        }

        let snapshot = if force_fresh || self.balances.is_stale().await {
            self.balances.refresh().await?
        } else {
            self.balances.snapshot().await
        };
        let candidates = fee_token_preference(&self.tokens, &snapshot, preferred, tx_token);

        let client = self.connections.client()?;
        let batch = BatchCallClient::new(client.clone());
        if force_fresh {
            self.gas_prices.invalidate_all();
        }
        if let Err(e) = self
            .gas_prices
            .prefetch(&batch, &candidates, self.connections.config().batch_chunk_size)
            .await
        {
            tracing::warn!(error = %e, "Gas price prefetch failed, fetching per token");
        }

        let account = self.balances.account();
        let mut fallback: Option<FeeEstimateSet> = None;
        for (position, token) in candidates.iter().enumerate() {
            let balance = snapshot.balance_of(token.address);
            if position > 0 && balance.is_zero() {
                tracing::debug!(token = %token.symbol, "Skipping fee token without balance");
                continue;
            }

            let set = match self.estimate_in(&client, &batch, token, intents, account).await {
                Ok(set) => set,
                Err(e) => {
                    tracing::warn!(token = %token.symbol, error = %e, "Fee token unusable, trying next");
                    continue;
                }
            };

            if balance >= set.total_fee {
                tracing::info!(
                    token = %token.symbol,
                    total_fee = %set.total_fee,
                    intents = intents.len(),
                    "Fee estimate committed"
                );
                return Ok(self.publish(set));
            }
            tracing::debug!(
                token = %token.symbol,
                total_fee = %set.total_fee,
                balance = %balance,
                "Balance does not cover fee"
            );
            if fallback.is_none() {
                fallback = Some(set);
            }
        }

        match fallback {
            Some(mut set) => {
                set.authoritative = false;
                tracing::warn!(
                    token = %set.fee_token.symbol,
                    total_fee = %set.total_fee,
                    "No fee token covers the fee, returning best effort estimate"
                );
                Ok(self.publish(set))
            }
            None => Err(WalletError::NoEstimateComputable),
        }
    }

    async fn estimate_in(
        &self,
        client: &ChainClient,
        batch: &BatchCallClient,
        token: &FeeToken,
        intents: &[TransactionIntent],
        account: Address,
    ) -> WalletResult<FeeEstimateSet> {
        let gas_price = self.gas_prices.gas_price(batch, token).await?;
        let gas_limits = try_join_all(
            intents
                .iter()
                .map(|intent| self.gas_limit(client, token, intent, account)),
        )
        .await?;

        let estimates = gas_limits
            .into_iter()
            .map(|gas_limit| FeeEstimate::new(gas_limit, gas_price, token.clone()))
            .collect();
        Ok(FeeEstimateSet::new(token.clone(), estimates))
    }

    async fn gas_limit(
        &self,
        client: &ChainClient,
        token: &FeeToken,
        intent: &TransactionIntent,
        account: Address,
    ) -> WalletResult<u64> {
        if let Some(fixed) = intent.gas_limit {
            return Ok(fixed);
        }
        let estimated = client
            .estimate_gas(&intent.to_call_request(account, token.fee_currency()))
            .await?;
        Ok(inflate_gas(
            estimated,
            self.config.gas_inflation_factor,
            if token.is_native { 0 } else { self.config.non_native_fee_gas_overhead },
        ))
    }

    fn publish(&self, set: FeeEstimateSet) -> FeeEstimateSet {
        metrics::record_fee_estimate(&set.fee_token.symbol, set.authoritative);
        self.published.send_replace(Some(set.clone()));
        set
    }
}

/// `estimated * factor`, rounded up, plus `overhead`.
pub fn inflate_gas(estimated: u64, factor: f64, overhead: u64) -> u64 {
    let inflated = (estimated as f64 * factor).ceil();
    let inflated = if inflated >= u64::MAX as f64 { u64::MAX } else { inflated as u64 };
    inflated.saturating_add(overhead)
}

impl std::fmt::Debug for FeeEstimationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeeEstimationEngine")
            .field("tokens", &self.tokens.len())
            .field("published", &self.current().is_some())
            .finish()
    }
}
