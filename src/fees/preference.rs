//! Deterministic fee token ordering.

use std::cmp::Reverse;

use alloy::primitives::Address;

use crate::collaborators::BalanceSnapshot;
use crate::fees::types::FeeToken;

/// Order in which fee tokens are tried.
///
/// 1. `preferred`, if it has a positive balance.
/// 2. `tx_token` (the asset being sent), if positive and not already placed.
/// 3. Everything else by normalized balance descending, then native first,
///    then declared sort order, then symbol.
pub fn fee_token_preference(
    tokens: &[FeeToken],
    balances: &BalanceSnapshot,
    preferred: Option<Address>,
    tx_token: Option<Address>,
) -> Vec<FeeToken> {
    let mut ordered: Vec<FeeToken> = Vec::with_capacity(tokens.len());

    for wanted in [preferred, tx_token].into_iter().flatten() {
        if ordered.iter().any(|t| t.address == wanted) {
            continue;
        }
        if let Some(token) = tokens.iter().find(|t| t.address == wanted) {
            if !balances.balance_of(token.address).is_zero() {
                ordered.push(token.clone());
            }
        }
    }

    let mut rest: Vec<&FeeToken> = tokens
        .iter()
        .filter(|t| !ordered.iter().any(|o| o.address == t.address))
        .collect();
    rest.sort_by_key(|t| {
        (
            Reverse(t.normalize(balances.balance_of(t.address))),
            !t.is_native,
            t.sort_order,
            t.symbol.clone(),
        )
    });
    ordered.extend(rest.into_iter().cloned());
    ordered
}
