//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, chunk sizes, multipliers)
//! - Check endpoint URLs and the derivation path parse
//! - Check the fee token table is usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WalletConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use crate::config::schema::WalletConfig;
use crate::ledger::path::parse_derivation_path;
use crate::tx::MAX_CHAIN_ID;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &WalletConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let node = &config.node;

    if let Err(e) = url::Url::parse(&node.primary_url) {
        errors.push(ValidationError::new("node.primary_url", format!("invalid URL: {}", e)));
    }
    if let Some(secondary) = &node.secondary_url {
        if let Err(e) = url::Url::parse(secondary) {
            errors.push(ValidationError::new("node.secondary_url", format!("invalid URL: {}", e)));
        }
    }
    if node.chain_id == 0 {
        errors.push(ValidationError::new("node.chain_id", "must be non-zero"));
    } else if node.chain_id > MAX_CHAIN_ID {
        errors.push(ValidationError::new(
            "node.chain_id",
            format!("must be at most {}", MAX_CHAIN_ID),
        ));
    }
    if node.sync_rounds == 0 {
        errors.push(ValidationError::new("node.sync_rounds", "must be at least 1"));
    }
    if node.sync_timeout_ms == 0 {
        errors.push(ValidationError::new("node.sync_timeout_ms", "must be non-zero"));
    }
    if node.request_timeout_secs == 0 {
        errors.push(ValidationError::new("node.request_timeout_secs", "must be non-zero"));
    }
    if node.batch_chunk_size == 0 {
        errors.push(ValidationError::new("node.batch_chunk_size", "must be at least 1"));
    }

    let fees = &config.fees;
    if fees.gas_price_multiplier == 0 {
        errors.push(ValidationError::new("fees.gas_price_multiplier", "must be at least 1"));
    }
    if !(fees.gas_inflation_factor >= 1.0 && fees.gas_inflation_factor.is_finite()) {
        errors.push(ValidationError::new("fees.gas_inflation_factor", "must be a finite value >= 1.0"));
    }
    if fees.max_gas_price_gwei == 0 {
        errors.push(ValidationError::new("fees.max_gas_price_gwei", "must be non-zero"));
    }
    if fees.gas_price_minimum_contract.is_zero() {
        errors.push(ValidationError::new("fees.gas_price_minimum_contract", "must be set"));
    }

    if config.tokens.is_empty() {
        errors.push(ValidationError::new("tokens", "at least one fee token is required"));
    }
    let mut symbols = HashSet::new();
    let mut addresses = HashSet::new();
    for token in &config.tokens {
        if !symbols.insert(token.symbol.as_str()) {
            errors.push(ValidationError::new("tokens", format!("duplicate symbol {}", token.symbol)));
        }
        if !addresses.insert(token.address) {
            errors.push(ValidationError::new("tokens", format!("duplicate address {}", token.address)));
        }
        if token.decimals > 36 {
            errors.push(ValidationError::new(
                "tokens",
                format!("{} declares {} decimals", token.symbol, token.decimals),
            ));
        }
    }
    if config.tokens.iter().filter(|t| t.is_native).count() > 1 {
        errors.push(ValidationError::new("tokens", "more than one native token"));
    }

    if config.executor.receipt_poll_interval_ms == 0 {
        errors.push(ValidationError::new("executor.receipt_poll_interval_ms", "must be non-zero"));
    }
    if config.executor.receipt_timeout_secs == 0 {
        errors.push(ValidationError::new("executor.receipt_timeout_secs", "must be non-zero"));
    }

    if let Err(e) = parse_derivation_path(&config.ledger.derivation_path) {
        errors.push(ValidationError::new("ledger.derivation_path", e.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::FeeTokenConfig;
    use alloy::primitives::Address;

    fn valid_config() -> WalletConfig {
        let mut config = WalletConfig::default();
        config.tokens.push(FeeTokenConfig {
            symbol: "CELO".into(),
            address: Address::repeat_byte(0x01),
            decimals: 18,
            is_native: true,
            sort_order: 0,
        });
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = valid_config();
        config.node.primary_url = "::nope::".into();
        config.node.batch_chunk_size = 0;
        config.fees.gas_inflation_factor = 0.5;
        config.ledger.derivation_path = "m/44'/x".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "node.primary_url",
                "node.batch_chunk_size",
                "fees.gas_inflation_factor",
                "ledger.derivation_path",
            ]
        );
    }

    #[test]
    fn test_chain_id_bounds() {
        let mut config = valid_config();
        config.node.chain_id = u64::MAX;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "node.chain_id");

        config.node.chain_id = MAX_CHAIN_ID;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_token_table_checks() {
        let mut config = valid_config();
        config.tokens.push(config.tokens[0].clone());

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("duplicate symbol")));
        assert!(errors.iter().any(|e| e.message.contains("duplicate address")));
        assert!(errors.iter().any(|e| e.message.contains("more than one native")));
    }

    #[test]
    fn test_empty_token_table_rejected() {
        let errors = validate_config(&WalletConfig::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "tokens");
    }
}
