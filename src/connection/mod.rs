//! Node connection subsystem.
//!
//! # Data Flow
//! ```text
//! connect(primary, secondary?)
//!     → clear current slot
//!     → connect_one(primary): up to N rounds of
//!           join(latest block, chain id) under a short timeout
//!           accept if fresh + right chain, else fixed backoff
//!     → on failure: connect_one(secondary)
//!     → slot holds exactly one NodeConnection
//!
//! Every other component:
//!     → ConnectionManager::get() / client()
//! ```
//!
//! # Design Decisions
//! - One process-wide connection held in an arc-swap slot; reads never block
//! - Connects are serialized and always clear before they replace
//! - No reconnect loop; a dead endpoint is surfaced, not retried forever

pub mod manager;

pub use manager::{ConnectionManager, NodeConnection};
