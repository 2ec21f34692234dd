//! Fee estimation types.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::config::FeeTokenConfig;

/// Decimals every balance is normalized to before comparison.
pub const NORMALIZED_DECIMALS: u8 = 18;

/// An asset that can pay transaction fees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeToken {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    pub is_native: bool,
    pub sort_order: u32,
}

impl FeeToken {
    /// The chain's native asset (18 decimals).
    pub fn native(symbol: impl Into<String>, address: Address) -> Self {
        Self {
            symbol: symbol.into(),
            address,
            decimals: 18,
            is_native: true,
            sort_order: 0,
        }
    }

    /// A non-native token registered as a fee currency.
    pub fn stable(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            address,
            decimals,
            is_native: false,
            sort_order: 0,
        }
    }

    pub fn with_sort_order(mut self, sort_order: u32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// `feeCurrency` transaction field; `None` pays natively.
    pub fn fee_currency(&self) -> Option<Address> {
        (!self.is_native).then_some(self.address)
    }

    /// `amount` rescaled to [`NORMALIZED_DECIMALS`].
    pub fn normalize(&self, amount: U256) -> U256 {
        match self.decimals.cmp(&NORMALIZED_DECIMALS) {
            std::cmp::Ordering::Equal => amount,
            std::cmp::Ordering::Less => {
                let scale = U256::from(10u64).pow(U256::from(NORMALIZED_DECIMALS - self.decimals));
                amount.saturating_mul(scale)
            }
            std::cmp::Ordering::Greater => {
                let scale = U256::from(10u64).pow(U256::from(self.decimals - NORMALIZED_DECIMALS));
                amount / scale
            }
        }
    }
}

impl From<&FeeTokenConfig> for FeeToken {
    fn from(config: &FeeTokenConfig) -> Self {
        Self {
            symbol: config.symbol.clone(),
            address: config.address,
            decimals: config.decimals,
            is_native: config.is_native,
            sort_order: config.sort_order,
        }
    }
}

/// Priced gas for one intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub gas_limit: u64,
    /// Per-gas price in `fee_token` units.
    pub gas_price: U256,
    /// `gas_limit * gas_price`.
    pub fee: U256,
    pub fee_token: FeeToken,
}

impl FeeEstimate {
    pub fn new(gas_limit: u64, gas_price: U256, fee_token: FeeToken) -> Self {
        Self {
            gas_limit,
            gas_price,
            fee: U256::from(gas_limit).saturating_mul(gas_price),
            fee_token,
        }
    }

    /// `feeCurrency` for the populated transaction.
    pub fn fee_currency(&self) -> Option<Address> {
        self.fee_token.fee_currency()
    }
}

/// Result published by the fee engine: one fee token for the whole plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimateSet {
    pub fee_token: FeeToken,
    /// One estimate per intent, in intent order.
    pub estimates: Vec<FeeEstimate>,
    pub total_fee: U256,
    /// False when no candidate's balance covered `total_fee` and the first
    /// computable candidate was returned anyway.
    pub authoritative: bool,
}

impl FeeEstimateSet {
    pub fn new(fee_token: FeeToken, estimates: Vec<FeeEstimate>) -> Self {
        let total_fee = estimates
            .iter()
            .fold(U256::ZERO, |acc, e| acc.saturating_add(e.fee));
        Self {
            fee_token,
            estimates,
            total_fee,
            authoritative: true,
        }
    }
}
