//! Signing on a hardware device.
//!
//! # Protocol
//! ```text
//! for each frame (see frames.rs):
//!     E0 04 {00 first | 80 continuation} 00 [len] [frame]
//!     await response before sending the next frame (half-duplex)
//! final response: v(1) r(32) s(32)
//! ```
//! The device reports only the low byte of `v`, which wraps for large chain
//! ids; parity is recovered from it and `v` recomputed in full.
//!
//! One request at a time per device: the session mutex is held across all
//! frames of a request.

use std::sync::Arc;

use alloy::primitives::{Address, Signature, U256};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::LedgerConfig;
use crate::error::{WalletError, WalletResult};
use crate::ledger::frames::{embedded_chain_id, split_frames};
use crate::ledger::path::{encode_path, parse_derivation_path};
use crate::ledger::transport::{
    self, DeviceError, DeviceTransport, INS_GET_ADDRESS, INS_SIGN, P1_FIRST, P1_MORE,
};
use crate::observability::metrics;
use crate::tx::{eip155_v, CeloTransaction, TransactionSigner};

/// Signature as returned by the device, with the full recovery value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSignature {
    /// `chain_id * 2 + 35 + parity`, or `27 + parity` without a chain id.
    pub v: u64,
    pub signature: Signature,
}

/// Recover y-parity from the device's one-byte `v`.
pub fn device_parity(device_v: u8, chain_id: Option<u64>) -> Result<bool, DeviceError> {
    if let Some(id) = chain_id {
        let low_byte = ((id as u128 * 2 + 35) % 256) as u8;
        match device_v.wrapping_sub(low_byte) {
            0 => return Ok(false),
            1 => return Ok(true),
            _ => {}
        }
    }
    match device_v {
        0 | 27 => Ok(false),
        1 | 28 => Ok(true),
        other => Err(DeviceError::Malformed(format!(
            "recovery byte {} does not match chain id {:?}",
            other, chain_id
        ))),
    }
}

/// Signer backed by a hardware device.
pub struct LedgerSigner {
    transport: Arc<dyn DeviceTransport>,
    session: Mutex<()>,
    derivation_path: String,
    address: Address,
}

impl LedgerSigner {
    /// Open a signer, asking the device for the address at `derivation_path`.
    pub async fn connect(
        transport: Arc<dyn DeviceTransport>,
        derivation_path: &str,
    ) -> WalletResult<Self> {
        parse_derivation_path(derivation_path)?;
        let mut signer = Self {
            transport,
            session: Mutex::new(()),
            derivation_path: derivation_path.to_string(),
            address: Address::ZERO,
        };
        signer.address = signer.get_address(derivation_path).await?;
        tracing::info!(
            address = %signer.address,
            path = %signer.derivation_path,
            "Hardware signer connected"
        );
        Ok(signer)
    }

    /// Open a signer on the configured derivation path.
    pub async fn from_config(
        transport: Arc<dyn DeviceTransport>,
        config: &LedgerConfig,
    ) -> WalletResult<Self> {
        Self::connect(transport, &config.derivation_path).await
    }

    pub fn derivation_path(&self) -> &str {
        &self.derivation_path
    }

    /// Ask the device for the address at `derivation_path`.
    pub async fn get_address(&self, derivation_path: &str) -> WalletResult<Address> {
        let segments = parse_derivation_path(derivation_path)?;
        let _session = self.session.lock().await;
        let response = transport::send(
            self.transport.as_ref(),
            INS_GET_ADDRESS,
            P1_FIRST,
            0x00,
            &encode_path(&segments),
        )
        .await?;
        Ok(parse_address_response(&response)?)
    }

    /// Sign the unsigned RLP payload `raw_tx` with the key at
    /// `derivation_path`.
    pub async fn sign(&self, derivation_path: &str, raw_tx: &[u8]) -> WalletResult<LedgerSignature> {
        let segments = parse_derivation_path(derivation_path)?;
        let frames = split_frames(&segments, raw_tx)?;
        let chain_id = embedded_chain_id(raw_tx)?;

        let _session = self.session.lock().await;
        let mut response = Vec::new();
        for (i, frame) in frames.iter().enumerate() {
            let p1 = if i == 0 { P1_FIRST } else { P1_MORE };
            response = transport::send(self.transport.as_ref(), INS_SIGN, p1, 0x00, frame).await?;
            tracing::trace!(frame = i, total = frames.len(), "Frame acknowledged by device");
        }

        if response.len() < 65 {
            return Err(DeviceError::Malformed(format!(
                "signature response of {} bytes",
                response.len()
            ))
            .into());
        }
        let parity = device_parity(response[0], chain_id)?;
        let r = U256::from_be_slice(&response[1..33]);
        let s = U256::from_be_slice(&response[33..65]);
        let v = match chain_id {
            Some(id) => eip155_v(id, parity)?,
            None => 27 + parity as u64,
        };

        Ok(LedgerSignature {
            v,
            signature: Signature::new(r, s, parity),
        })
    }
}

fn parse_address_response(response: &[u8]) -> Result<Address, DeviceError> {
    let malformed = || DeviceError::Malformed("address response truncated".into());
    let pk_len = *response.first().ok_or_else(malformed)? as usize;
    let addr_len = *response.get(1 + pk_len).ok_or_else(malformed)? as usize;
    let start = 2 + pk_len;
    let ascii = response.get(start..start + addr_len).ok_or_else(malformed)?;
    let text = std::str::from_utf8(ascii)
        .map_err(|_| DeviceError::Malformed("address is not ASCII".into()))?;
    let hex = text.strip_prefix("0x").unwrap_or(text);
    format!("0x{}", hex)
        .parse()
        .map_err(|e| DeviceError::Malformed(format!("bad address '{}': {}", text, e)))
}

#[async_trait]
impl TransactionSigner for LedgerSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_transaction(&self, tx: &CeloTransaction) -> WalletResult<Signature> {
        let signed = self.sign(&self.derivation_path, &tx.signing_payload()).await;
        match signed {
            Ok(sig) => {
                metrics::record_transaction("device_signed");
                debug_assert!(tx.eip155_v(sig.signature.v()).is_ok_and(|v| v == sig.v));
                Ok(sig.signature)
            }
            Err(e) => {
                if matches!(e, WalletError::Device(DeviceError::Rejected)) {
                    tracing::info!(nonce = tx.nonce, "Signing rejected on device");
                }
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for LedgerSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerSigner")
            .field("address", &self.address)
            .field("derivation_path", &self.derivation_path)
            .finish()
    }
}
