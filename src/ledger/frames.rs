//! Splitting a raw transaction into device frames.
//!
//! # Layout
//! ```text
//! frame 0:  [segment count][path u32 BE * count][body bytes ...]   ≤ 150 bytes
//! frame k:  [body bytes ...]                                       ≤ 150 bytes
//! ```
//! The device parses the RLP stream incrementally and must see the chain-id
//! item start inside a frame, so no frame may end exactly where the
//! trailing `[chainId, 0, 0]` items begin.

use alloy::rlp::Header;

use crate::error::{WalletError, WalletResult};
use crate::ledger::path::encode_path;
use crate::tx::MAX_CHAIN_ID;

/// Maximum data bytes per APDU frame.
pub const FRAME_BUDGET: usize = 150;

/// Byte offset where the trailing `[chainId, r, s]` placeholder items begin,
/// or `None` for transactions without replay protection (six items or
/// fewer).
pub fn chain_id_marker_offset(raw: &[u8]) -> WalletResult<Option<usize>> {
    let item_offsets = list_item_offsets(raw)?;
    if item_offsets.len() <= 6 {
        return Ok(None);
    }
    Ok(Some(item_offsets[item_offsets.len() - 3]))
}

/// Chain id carried in the placeholder items, if any.
pub fn embedded_chain_id(raw: &[u8]) -> WalletResult<Option<u64>> {
    let Some(offset) = chain_id_marker_offset(raw)? else {
        return Ok(None);
    };
    let mut buf = &raw[offset..];
    let chain_id = <u64 as alloy::rlp::Decodable>::decode(&mut buf)?;
    if chain_id > MAX_CHAIN_ID {
        return Err(WalletError::Validation(format!(
            "Chain id {} is out of range",
            chain_id
        )));
    }
    Ok(Some(chain_id))
}

/// Start offsets of each item of the top-level RLP list in `raw`.
fn list_item_offsets(raw: &[u8]) -> WalletResult<Vec<usize>> {
    let mut buf = raw;
    let header = Header::decode(&mut buf)?;
    if !header.list {
        return Err(WalletError::Protocol("Transaction is not an RLP list".into()));
    }
    let body_start = raw.len() - buf.len();
    if body_start + header.payload_length != raw.len() {
        return Err(WalletError::Protocol(format!(
            "RLP list declares {} payload bytes, {} present",
            header.payload_length,
            raw.len() - body_start
        )));
    }

    let mut offsets = Vec::new();
    let mut pos = body_start;
    while pos < raw.len() {
        offsets.push(pos);
        let mut item = &raw[pos..];
        let item_header = Header::decode(&mut item)?;
        let header_len = raw.len() - pos - item.len();
        let next = pos + header_len + item_header.payload_length;
        if next > raw.len() {
            return Err(WalletError::Protocol("RLP item overruns transaction".into()));
        }
        pos = next;
    }
    Ok(offsets)
}

/// Split `raw` into frames for a device request signed with `path`.
pub fn split_frames(path: &[u32], raw: &[u8]) -> WalletResult<Vec<Vec<u8>>> {
    if raw.is_empty() {
        return Err(WalletError::Validation("Cannot sign an empty transaction".into()));
    }
    let encoded_path = encode_path(path);
    if encoded_path.len() >= FRAME_BUDGET {
        return Err(WalletError::Validation("Derivation path does not fit a frame".into()));
    }
    let marker = chain_id_marker_offset(raw)?;

    let mut frames = Vec::new();
    let mut offset = 0;
    while offset < raw.len() {
        let max_chunk = if offset == 0 {
            FRAME_BUDGET - encoded_path.len()
        } else {
            FRAME_BUDGET
        };
        let mut chunk = max_chunk.min(raw.len() - offset);
        if marker == Some(offset + chunk) && chunk > 1 {
            chunk -= 1;
        }

        let mut frame = Vec::with_capacity(FRAME_BUDGET);
        if offset == 0 {
            frame.extend_from_slice(&encoded_path);
        }
        frame.extend_from_slice(&raw[offset..offset + chunk]);
        frames.push(frame);
        offset += chunk;
    }
    Ok(frames)
}
