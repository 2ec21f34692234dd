//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pipeline.
//! All types derive Serde traits for deserialization from config files.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WalletConfig {
    /// Node endpoints and liveness checks.
    pub node: NodeConfig,

    /// Fee estimation tuning.
    pub fees: FeeConfig,

    /// Assets that may pay transaction fees.
    pub tokens: Vec<FeeTokenConfig>,

    /// Broadcast and inclusion settings.
    pub executor: ExecutorConfig,

    /// Hardware wallet settings.
    pub ledger: LedgerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Primary JSON-RPC endpoint URL.
    pub primary_url: String,

    /// Secondary endpoint tried when the primary cannot be brought up.
    pub secondary_url: Option<String>,

    /// Expected chain ID (42220 mainnet, 44787 Alfajores).
    pub chain_id: u64,

    /// Maximum age of the latest block before the node counts as stale.
    pub staleness_tolerance_secs: u64,

    /// Liveness rounds attempted per endpoint.
    pub sync_rounds: u32,

    /// Per-round timeout for the header + chain id fetch, in milliseconds.
    pub sync_timeout_ms: u64,

    /// Fixed sleep between liveness rounds, in milliseconds.
    pub sync_backoff_ms: u64,

    /// Whole-request timeout applied by the HTTP client, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum calls per JSON-RPC batch.
    pub batch_chunk_size: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            primary_url: "https://forno.celo.org".to_string(),
            secondary_url: None,
            chain_id: 42220,
            staleness_tolerance_secs: 120,
            sync_rounds: 3,
            sync_timeout_ms: 1000,
            sync_backoff_ms: 1000,
            request_timeout_secs: 30,
            batch_chunk_size: 100,
        }
    }
}

/// Fee estimation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Multiplier applied to the on-chain gas price minimum.
    pub gas_price_multiplier: u64,

    /// How long a fetched gas price stays valid, in seconds.
    pub gas_price_ttl_secs: u64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Multiplier applied to `eth_estimateGas` results (1.5 = 50% buffer).
    pub gas_inflation_factor: f64,

    /// Extra gas charged when the fee is paid in a non-native token.
    pub non_native_fee_gas_overhead: u64,

    /// Balance snapshot age after which a refresh is triggered, in seconds.
    pub balance_ttl_secs: u64,

    /// GasPriceMinimum contract queried per fee token.
    pub gas_price_minimum_contract: Address,

    /// SortedOracles contract used for token exchange rates.
    pub sorted_oracles_contract: Address,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            gas_price_multiplier: 5,
            gas_price_ttl_secs: 60,
            max_gas_price_gwei: 500,
            gas_inflation_factor: 1.5,
            non_native_fee_gas_overhead: 50_000,
            balance_ttl_secs: 30,
            gas_price_minimum_contract: address!("DfCa3A8d7699D8bAfe656823AD60C17cb8270ECC"),
            sorted_oracles_contract: address!("efB84935239dAcdecF7c5bA76d8dE40b077B7b33"),
        }
    }
}

/// An asset that can pay fees.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FeeTokenConfig {
    /// Display symbol (e.g., "CELO", "cUSD").
    pub symbol: String,

    /// ERC-20 contract address.
    pub address: Address,

    /// Token decimals (default: 18).
    #[serde(default = "default_decimals")]
    pub decimals: u8,

    /// Whether this is the chain's native asset.
    #[serde(default)]
    pub is_native: bool,

    /// Declared sort order; lower sorts first on ties.
    #[serde(default)]
    pub sort_order: u32,
}

fn default_decimals() -> u8 {
    18
}

/// Executor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Receipt polling interval in milliseconds.
    pub receipt_poll_interval_ms: u64,

    /// Maximum time to wait for inclusion, in seconds.
    pub receipt_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            receipt_poll_interval_ms: 1000,
            receipt_timeout_secs: 120,
        }
    }
}

/// Hardware wallet configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Derivation path used for signing.
    pub derivation_path: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            derivation_path: "m/44'/52752'/0'/0/0".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
