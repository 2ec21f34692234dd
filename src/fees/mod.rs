//! Fee estimation across fee-currency tokens.
//!
//! # Components
//! - types.rs: fee tokens, per-intent estimates, published sets
//! - preference.rs: deterministic candidate ordering
//! - gas_price.rs: cached per-token gas prices
//! - engine.rs: the estimation loop and its watch channel

pub mod engine;
pub mod gas_price;
pub mod preference;
pub mod types;

pub use engine::{inflate_gas, FeeEstimationEngine};
pub use gas_price::GasPriceCache;
pub use preference::fee_token_preference;
pub use types::{FeeEstimate, FeeEstimateSet, FeeToken};
