//! Transaction history records.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::WalletResult;

/// One confirmed transaction, as shown in the wallet's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    /// Plan the transaction belonged to.
    pub plan_id: Uuid,
    /// Label of the whole plan, e.g. "Payroll".
    pub plan_label: String,
    /// Label of this transaction within the plan.
    pub label: String,
    pub hash: B256,
    pub block_number: u64,
    pub nonce: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    /// Fee budgeted at signing time, in `fee_token` units.
    pub fee: U256,
    pub fee_token: String,
    pub gas_used: u64,
    /// Unix seconds at confirmation.
    pub timestamp: u64,
}

/// Append-only sink for history records.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: HistoryRecord) -> WalletResult<()>;
}

/// History kept in memory, in append order.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: Mutex<Vec<HistoryRecord>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append(&self, record: HistoryRecord) -> WalletResult<()> {
        tracing::debug!(id = %record.id, hash = %record.hash, "History record appended");
        self.records.lock().await.push(record);
        Ok(())
    }
}
