//! The one request shape alloy's Ethereum types do not cover.

use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use serde::Serialize;

/// Call object for `eth_call` and `eth_estimateGas`, carrying the
/// chain-specific `feeCurrency` field next to the standard request.
///
/// Nodes that do not know the field ignore it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(flatten)]
    pub inner: TransactionRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_currency: Option<Address>,
}

impl CallRequest {
    /// Read-only call of `data` on `to`.
    pub fn read(to: Address, data: Bytes) -> Self {
        Self {
            inner: TransactionRequest {
                to: Some(TxKind::Call(to)),
                input: TransactionInput::both(data),
                ..Default::default()
            },
            fee_currency: None,
        }
    }

    /// Call as sent by `from`; empty values and data are left out.
    pub fn from_sender(from: Address, to: Option<Address>, value: U256, data: &Bytes) -> Self {
        let mut inner = TransactionRequest {
            from: Some(from),
            to: to.map(TxKind::Call),
            ..Default::default()
        };
        if !value.is_zero() {
            inner.value = Some(value);
        }
        if !data.is_empty() {
            inner.input = TransactionInput::both(data.clone());
        }
        Self {
            inner,
            fee_currency: None,
        }
    }

    pub fn with_fee_currency(mut self, fee_currency: Option<Address>) -> Self {
        self.fee_currency = fee_currency;
        self
    }
}
