//! Chain-specific legacy transaction encoding.
//!
//! # Layout
//! ```text
//! unsigned (signing payload, EIP-155 style):
//!   rlp([nonce, gasPrice, gas, feeCurrency, gatewayFeeRecipient, gatewayFee,
//!        to, value, data, chainId, 0, 0])
//! signed:
//!   rlp([nonce, gasPrice, gas, feeCurrency, gatewayFeeRecipient, gatewayFee,
//!        to, value, data, v, r, s])        v = chainId * 2 + 35 + yParity
//! ```
//! Absent addresses encode as the empty string.

use alloy::primitives::{keccak256, Address, Bytes, Signature, B256, U256};
use alloy::rlp::{Encodable, Header};
use serde::{Deserialize, Serialize};

use crate::error::{WalletError, WalletResult};
use crate::fees::FeeEstimate;
use crate::tx::intent::TransactionIntent;

/// Largest chain id whose replay-protected `v` fits in a `u64`.
pub const MAX_CHAIN_ID: u64 = (u64::MAX - 36) / 2;

/// `chain_id * 2 + 35 + y_parity`, rejecting chain ids past [`MAX_CHAIN_ID`].
pub fn eip155_v(chain_id: u64, y_parity: bool) -> WalletResult<u64> {
    chain_id
        .checked_mul(2)
        .and_then(|v| v.checked_add(35 + y_parity as u64))
        .ok_or_else(|| WalletError::Validation(format!("Chain id {} is out of range", chain_id)))
}

/// A fully populated, unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeloTransaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    /// Token paying the fee; `None` pays in the native asset.
    pub fee_currency: Option<Address>,
    pub gateway_fee_recipient: Option<Address>,
    pub gateway_fee: U256,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub chain_id: u64,
}

impl CeloTransaction {
    /// Fill standard and chain-specific fields from an intent and its fee.
    pub fn populate(intent: &TransactionIntent, fee: &FeeEstimate, nonce: u64, chain_id: u64) -> Self {
        Self {
            nonce,
            gas_price: fee.gas_price,
            gas_limit: fee.gas_limit,
            fee_currency: fee.fee_currency(),
            gateway_fee_recipient: None,
            gateway_fee: U256::ZERO,
            to: intent.to,
            value: intent.value,
            data: intent.data.clone(),
            chain_id,
        }
    }

    fn common_fields(&self) -> [&dyn Encodable; 9] {
        [
            &self.nonce,
            &self.gas_price,
            &self.gas_limit,
            opt_address(&self.fee_currency),
            opt_address(&self.gateway_fee_recipient),
            &self.gateway_fee,
            opt_address(&self.to),
            &self.value,
            &self.data,
        ]
    }

    /// RLP bytes that are hashed for signing and sent to hardware devices.
    pub fn signing_payload(&self) -> Vec<u8> {
        let zero = 0u64;
        let mut fields: Vec<&dyn Encodable> = self.common_fields().to_vec();
        fields.push(&self.chain_id);
        fields.push(&zero);
        fields.push(&zero);
        rlp_list(&fields)
    }

    /// Hash the signer signs.
    pub fn signature_hash(&self) -> B256 {
        keccak256(self.signing_payload())
    }

    /// Replay-protected recovery value for a given parity.
    pub fn eip155_v(&self, y_parity: bool) -> WalletResult<u64> {
        eip155_v(self.chain_id, y_parity)
    }

    /// Attach a signature and produce the broadcastable encoding.
    pub fn into_signed(self, signature: Signature) -> WalletResult<SignedTransaction> {
        let v = self.eip155_v(signature.v())?;
        let r = signature.r();
        let s = signature.s();
        let mut fields: Vec<&dyn Encodable> = self.common_fields().to_vec();
        fields.push(&v);
        fields.push(&r);
        fields.push(&s);
        let raw = Bytes::from(rlp_list(&fields));
        let hash = keccak256(&raw);
        Ok(SignedTransaction {
            tx: self,
            signature,
            raw,
            hash,
        })
    }
}

/// A signed transaction. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: CeloTransaction,
    signature: Signature,
    raw: Bytes,
    hash: B256,
}

impl SignedTransaction {
    pub fn tx(&self) -> &CeloTransaction {
        &self.tx
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Bytes for `eth_sendRawTransaction`.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn hash(&self) -> B256 {
        self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.tx.nonce
    }

    /// Recover the address that produced the signature.
    pub fn recover_signer(&self) -> WalletResult<Address> {
        self.signature
            .recover_address_from_prehash(&self.tx.signature_hash())
            .map_err(|e| WalletError::Signing(format!("Unrecoverable signature: {}", e)))
    }
}

fn opt_address(addr: &Option<Address>) -> &dyn Encodable {
    const EMPTY: &[u8] = &[];
    match addr {
        Some(a) => a,
        None => &EMPTY,
    }
}

fn rlp_list(fields: &[&dyn Encodable]) -> Vec<u8> {
    let payload_length: usize = fields.iter().map(|f| f.length()).sum();
    let header = Header {
        list: true,
        payload_length,
    };
    let mut out = Vec::with_capacity(header.length() + payload_length);
    header.encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    out
}
