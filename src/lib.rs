//! Transaction pipeline for fee-currency EVM chains.
//!
//! Turns user intents into signed, broadcast transactions: node connection
//! with failover, batched contract reads, multi-token fee estimation,
//! sequential plan execution, and hardware-device signing.

pub mod collaborators;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod fees;
pub mod ledger;
pub mod observability;
pub mod rpc;
pub mod tx;

pub use config::schema::WalletConfig;
pub use connection::ConnectionManager;
pub use error::{WalletError, WalletResult};
pub use executor::{PlanEvent, PlanExecutor};
pub use fees::FeeEstimationEngine;
