//! Per-token gas price cache.
//!
//! Prices come from `GasPriceMinimum.getGasPriceMinimum(token)` scaled by the
//! configured multiplier, and are kept for `gas_price_ttl_secs`. The ceiling
//! is in native units, so non-native prices are converted with the oracle's
//! `medianRate(token)` before the check.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, U256};
use dashmap::DashMap;

use crate::config::FeeConfig;
use crate::error::{WalletError, WalletResult};
use crate::fees::types::FeeToken;
use crate::rpc::{BatchCallClient, CallOutput, ReadCall};

const WEI_PER_GWEI: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy)]
struct CachedGasPrice {
    price: U256,
    fetched_at: Instant,
}

/// Thread-safe gas price cache keyed by fee token address.
#[derive(Debug, Clone)]
pub struct GasPriceCache {
    entries: Arc<DashMap<Address, CachedGasPrice>>,
    contract: Address,
    oracle: Address,
    multiplier: u64,
    max_gas_price: U256,
    ttl: Duration,
}

impl GasPriceCache {
    pub fn new(config: &FeeConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            contract: config.gas_price_minimum_contract,
            oracle: config.sorted_oracles_contract,
            multiplier: config.gas_price_multiplier,
            max_gas_price: U256::from(config.max_gas_price_gwei).saturating_mul(U256::from(WEI_PER_GWEI)),
            ttl: Duration::from_secs(config.gas_price_ttl_secs),
        }
    }

    /// Fresh cached price for `token`, if any.
    pub fn cached(&self, token: &FeeToken) -> Option<U256> {
        self.entries
            .get(&token.address)
            .filter(|entry| entry.fetched_at.elapsed() <= self.ttl)
            .map(|entry| entry.price)
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Fetch every token without a fresh price in one batch.
    ///
    /// Entries that fail validation are left out; [`GasPriceCache::gas_price`]
    /// reports the failure per token.
    pub async fn prefetch(&self, batch: &BatchCallClient, tokens: &[FeeToken], chunk_size: usize) -> WalletResult<()> {
        let missing: Vec<&FeeToken> = tokens.iter().filter(|t| self.cached(t).is_none()).collect();
        if missing.is_empty() {
            return Ok(());
        }

        let calls: Vec<ReadCall> = missing.iter().flat_map(|t| self.read_calls(t)).collect();
        let mut outputs = batch.batch_call(&calls, chunk_size).await?.into_iter();
        for token in missing {
            let taken: Vec<CallOutput> = outputs.by_ref().take(self.read_calls(token).len()).collect();
            match self.price_from(token, taken) {
                Ok(price) => self.store(token, price),
                Err(e) => tracing::debug!(token = %token.symbol, error = %e, "Prefetched gas price rejected"),
            }
        }
        Ok(())
    }

    /// Gas price for `token`, from cache when fresh.
    pub async fn gas_price(&self, batch: &BatchCallClient, token: &FeeToken) -> WalletResult<U256> {
        if let Some(price) = self.cached(token) {
            return Ok(price);
        }

        let calls = self.read_calls(token);
        let outputs = batch.batch_call(&calls, calls.len()).await?;
        let price = self.price_from(token, outputs)?;
        self.store(token, price);
        Ok(price)
    }

    /// Gas price minimum, plus the oracle rate for non-native tokens.
    fn read_calls(&self, token: &FeeToken) -> Vec<ReadCall> {
        let minimum = ReadCall::GasPriceMinimum {
            contract: self.contract,
            fee_currency: token.fee_currency().unwrap_or(Address::ZERO),
        };
        match token.fee_currency() {
            None => vec![minimum],
            Some(address) => vec![
                minimum,
                ReadCall::ExchangeRate {
                    oracle: self.oracle,
                    token: address,
                },
            ],
        }
    }

    fn price_from(&self, token: &FeeToken, outputs: Vec<CallOutput>) -> WalletResult<U256> {
        let mut outputs = outputs.into_iter();
        let minimum = outputs
            .next()
            .ok_or_else(|| WalletError::Protocol("Empty gas price response".into()))?
            .into_scalar()?;
        let price = minimum.saturating_mul(U256::from(self.multiplier));
        if price.is_zero() {
            return Err(WalletError::Validation(format!(
                "Gas price for {} is zero",
                token.symbol
            )));
        }

        let native_price = match outputs.next() {
            None => price,
            Some(rate) => {
                let rate = rate.as_tuple().unwrap_or_default();
                let (numerator, denominator) = match rate {
                    [n, d] if !n.is_zero() => (*n, *d),
                    _ => {
                        return Err(WalletError::Validation(format!(
                            "No exchange rate reported for {}",
                            token.symbol
                        )))
                    }
                };
                // numerator / denominator is token units per native unit
                price.saturating_mul(denominator) / numerator
            }
        };
        if native_price > self.max_gas_price {
            return Err(WalletError::Validation(format!(
                "Gas price {} for {} exceeds maximum {} in native units",
                price, token.symbol, self.max_gas_price
            )));
        }
        Ok(price)
    }

    fn store(&self, token: &FeeToken, price: U256) {
        self.entries.insert(
            token.address,
            CachedGasPrice {
                price,
                fetched_at: Instant::now(),
            },
        );
        tracing::debug!(token = %token.symbol, price = %price, "Gas price cached");
    }
}
