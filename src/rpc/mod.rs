//! Node wire layer.
//!
//! # Data Flow
//! ```text
//! ChainClient (alloy RootProvider over HTTP, typed queries)
//!     → node
//!
//! BatchCallClient
//!     → ReadCall encoding (calls.rs)
//!     → RpcClient batch, one waiter per call
//!     → CallOutput decoding
//! ```

pub mod batch;
pub mod calls;
pub mod client;
pub mod types;

pub use batch::{BatchCallClient, DEFAULT_MAX_CHUNK_SIZE};
pub use calls::{CallOutput, ReadCall};
pub use client::ChainClient;
pub use types::CallRequest;
