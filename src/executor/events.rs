//! Progress updates emitted while a plan runs.

use alloy::primitives::B256;
use serde::Serialize;
use uuid::Uuid;

/// A state transition of a running plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlanEvent {
    /// Plan accepted; nothing signed yet.
    Started {
        plan_id: Uuid,
        label: String,
        total: usize,
    },
    /// `signed` of `total` transactions carry a signature.
    SignatureProgress { signed: usize, total: usize },
    /// Transaction `index` was accepted by the node.
    Broadcast { index: usize, hash: B256 },
    /// Transaction `index` was included successfully.
    Confirmed { index: usize, hash: B256, block: u64 },
    Completed { plan_id: Uuid, hashes: Vec<B256> },
    /// Plan stopped; the first `succeeded` transactions are final.
    Failed {
        plan_id: Uuid,
        succeeded: usize,
        total: usize,
        message: String,
    },
}
