//! Hardware-device signing.
//!
//! # Data Flow
//! ```text
//! CeloTransaction::signing_payload()
//!     → split_frames (path prefix, 150-byte frames, chain-id boundary rule)
//!     → DeviceTransport::exchange, one frame at a time under a session lock
//!     → (v, r, s) with v recomputed from the device's low byte
//! ```

pub mod frames;
pub mod path;
pub mod signer;
pub mod transport;

pub use frames::{chain_id_marker_offset, embedded_chain_id, split_frames, FRAME_BUDGET};
pub use path::{encode_path, parse_derivation_path};
pub use signer::{device_parity, LedgerSignature, LedgerSigner};
pub use transport::{DeviceError, DeviceTransport};
