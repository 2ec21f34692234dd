//! Validated transaction plans.

use crate::error::{WalletError, WalletResult};
use crate::fees::{FeeEstimate, FeeEstimateSet};
use crate::tx::TransactionIntent;

/// Intents paired one-to-one with their fee estimates.
#[derive(Debug, Clone)]
pub struct TransactionPlan {
    intents: Vec<TransactionIntent>,
    estimates: Vec<FeeEstimate>,
}

impl TransactionPlan {
    /// Pair `intents` with `estimates`. Both must be non-empty and of equal
    /// length.
    pub fn new(intents: Vec<TransactionIntent>, estimates: Vec<FeeEstimate>) -> WalletResult<Self> {
        if intents.is_empty() || intents.len() != estimates.len() {
            return Err(WalletError::InvalidPlan {
                intents: intents.len(),
                estimates: estimates.len(),
            });
        }
        Ok(Self { intents, estimates })
    }

    /// Plan from the fee engine's published result.
    pub fn from_estimate_set(intents: Vec<TransactionIntent>, set: &FeeEstimateSet) -> WalletResult<Self> {
        Self::new(intents, set.estimates.clone())
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Always false for a constructed plan.
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TransactionIntent, &FeeEstimate)> {
        self.intents.iter().zip(self.estimates.iter())
    }

    pub fn intent(&self, index: usize) -> Option<&TransactionIntent> {
        self.intents.get(index)
    }

    pub fn estimate(&self, index: usize) -> Option<&FeeEstimate> {
        self.estimates.get(index)
    }
}
