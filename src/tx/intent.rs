//! Unsigned descriptions of on-chain actions.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::rpc::calls::erc20_transfer_data;
use crate::rpc::types::CallRequest;

/// A desired on-chain action, before nonce, fee and signature are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIntent {
    /// Short description recorded in history ("Send cUSD", "Vote").
    pub label: String,
    /// Target; `None` creates a contract.
    pub to: Option<Address>,
    /// Native value attached.
    pub value: U256,
    /// Call data.
    pub data: Bytes,
    /// Fixed gas limit; skips `eth_estimateGas` when set.
    pub gas_limit: Option<u64>,
}

impl TransactionIntent {
    /// Plain native-asset transfer.
    pub fn native_transfer(to: Address, amount: U256) -> Self {
        Self {
            label: "Send".to_string(),
            to: Some(to),
            value: amount,
            data: Bytes::new(),
            gas_limit: None,
        }
    }

    /// ERC-20 `transfer` on `token`.
    pub fn token_transfer(token: Address, to: Address, amount: U256) -> Self {
        Self {
            label: "Send".to_string(),
            to: Some(token),
            value: U256::ZERO,
            data: erc20_transfer_data(to, amount),
            gas_limit: None,
        }
    }

    /// Arbitrary contract call with pre-encoded data.
    pub fn contract_call(to: Address, data: Bytes) -> Self {
        Self {
            label: "Contract call".to_string(),
            to: Some(to),
            value: U256::ZERO,
            data,
            gas_limit: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Call object used for gas estimation.
    pub fn to_call_request(&self, from: Address, fee_currency: Option<Address>) -> CallRequest {
        CallRequest::from_sender(from, self.to, self.value, &self.data).with_fee_currency(fee_currency)
    }
}
