//! BIP-32 derivation path parsing.

use crate::error::{WalletError, WalletResult};

/// Bit set on hardened path segments.
pub const HARDENED: u32 = 0x8000_0000;

/// Maximum segments a device accepts.
pub const MAX_PATH_SEGMENTS: usize = 10;

/// Split `"m/44'/52752'/0'/0/3"` into numeric segments.
///
/// The leading `m/` is optional. A trailing `'` (or `h`) hardens a segment.
pub fn parse_derivation_path(path: &str) -> WalletResult<Vec<u32>> {
    let invalid = |reason: String| WalletError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    let trimmed = path.trim();
    let body = trimmed
        .strip_prefix("m/")
        .or_else(|| trimmed.strip_prefix("M/"))
        .unwrap_or(trimmed);
    if body.is_empty() {
        return Err(invalid("no segments".to_string()));
    }

    let segments = body
        .split('/')
        .map(|segment| {
            let (digits, hardened) = match segment
                .strip_suffix('\'')
                .or_else(|| segment.strip_suffix('h'))
            {
                Some(d) => (d, true),
                None => (segment, false),
            };
            let index: u32 = digits
                .parse()
                .map_err(|_| invalid(format!("segment '{}' is not a number", segment)))?;
            if index >= HARDENED {
                return Err(invalid(format!("segment '{}' is out of range", segment)));
            }
            Ok(if hardened { index | HARDENED } else { index })
        })
        .collect::<WalletResult<Vec<u32>>>()?;

    if segments.len() > MAX_PATH_SEGMENTS {
        return Err(invalid(format!(
            "{} segments, at most {} allowed",
            segments.len(),
            MAX_PATH_SEGMENTS
        )));
    }
    Ok(segments)
}

/// Device encoding: segment count followed by each segment big-endian.
pub fn encode_path(segments: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 4 * segments.len());
    out.push(segments.len() as u8);
    for segment in segments {
        out.extend_from_slice(&segment.to_be_bytes());
    }
    out
}
