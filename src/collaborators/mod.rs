//! Narrow interfaces to the rest of the wallet.
//!
//! The pipeline reads balances and appends history through these traits;
//! the app shell owns persistence and presentation.

pub mod balances;
pub mod history;

pub use balances::{BalanceSnapshot, BalanceSource, ChainBalances};
pub use history::{HistoryRecord, HistoryStore, InMemoryHistory};
