//! Sequential sign-then-broadcast execution of a plan.
//!
//! # Flow
//! ```text
//! TransactionPlan (validated before any I/O)
//!     → nonce fetched once ("pending")
//!     → sign item i with nonce base + i            SignatureProgress(i+1, n)
//!     → broadcast item i, wait for inclusion       Broadcast / Confirmed
//!     → append history record
//! ```
//! Any failure stops the plan. Transactions already broadcast are final;
//! there is no rollback.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::primitives::B256;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;
use uuid::Uuid;

use crate::collaborators::{HistoryRecord, HistoryStore};
use crate::config::ExecutorConfig;
use crate::connection::ConnectionManager;
use crate::error::{WalletError, WalletResult};
use crate::executor::events::PlanEvent;
use crate::executor::inclusion::wait_for_inclusion;
use crate::executor::plan::TransactionPlan;
use crate::fees::FeeEstimate;
use crate::observability::metrics;
use crate::tx::{sign_intent, SignedTransaction, TransactionIntent, TransactionSigner};

/// Result of a plan that ran to completion.
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub plan_id: Uuid,
    /// One record per transaction, in plan order.
    pub records: Vec<HistoryRecord>,
}

impl PlanReport {
    pub fn hashes(&self) -> Vec<B256> {
        self.records.iter().map(|r| r.hash).collect()
    }
}

/// Runs transaction plans against the live node connection.
pub struct PlanExecutor {
    connections: Arc<ConnectionManager>,
    config: ExecutorConfig,
}

impl PlanExecutor {
    pub fn new(connections: Arc<ConnectionManager>, config: ExecutorConfig) -> Self {
        Self { connections, config }
    }

    /// Validate, then sign and broadcast every intent in order.
    ///
    /// Plan shape errors are returned as `InvalidPlan` before anything is
    /// signed or sent. Later failures are wrapped in `PlanAborted` with the
    /// number of transactions that completed.
    pub async fn execute(
        &self,
        intents: Vec<TransactionIntent>,
        fee_estimates: Vec<FeeEstimate>,
        signer: &dyn TransactionSigner,
        history: &dyn HistoryStore,
        events: &UnboundedSender<PlanEvent>,
        label: &str,
    ) -> WalletResult<PlanReport> {
        let plan = TransactionPlan::new(intents, fee_estimates)?;
        self.execute_plan(&plan, signer, history, events, label).await
    }

    /// Run an already validated plan.
    pub async fn execute_plan(
        &self,
        plan: &TransactionPlan,
        signer: &dyn TransactionSigner,
        history: &dyn HistoryStore,
        events: &UnboundedSender<PlanEvent>,
        label: &str,
    ) -> WalletResult<PlanReport> {
        let plan_id = Uuid::new_v4();
        let total = plan.len();
        let span = tracing::info_span!(
            "plan",
            plan_id = %plan_id,
            label,
            total,
            from = %signer.address()
        );

        async move {
            emit(
                events,
                PlanEvent::Started {
                    plan_id,
                    label: label.to_string(),
                    total,
                },
            );
            tracing::info!("Plan started");

            let mut succeeded = 0;
            match self
                .run(plan_id, label, plan, signer, history, events, &mut succeeded)
                .await
            {
                Ok(records) => {
                    let report = PlanReport { plan_id, records };
                    emit(
                        events,
                        PlanEvent::Completed {
                            plan_id,
                            hashes: report.hashes(),
                        },
                    );
                    tracing::info!("Plan completed");
                    Ok(report)
                }
                Err(e) => {
                    metrics::record_transaction("failed");
                    tracing::error!(succeeded, error = %e, "Plan aborted");
                    let err = WalletError::PlanAborted {
                        succeeded,
                        total,
                        source: Box::new(e),
                    };
                    emit(
                        events,
                        PlanEvent::Failed {
                            plan_id,
                            succeeded,
                            total,
                            message: err.user_message(),
                        },
                    );
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        plan_id: Uuid,
        label: &str,
        plan: &TransactionPlan,
        signer: &dyn TransactionSigner,
        history: &dyn HistoryStore,
        events: &UnboundedSender<PlanEvent>,
        succeeded: &mut usize,
    ) -> WalletResult<Vec<HistoryRecord>> {
        let connection = self.connections.get()?;
        let client = connection.client().clone();
        let from = signer.address();
        let total = plan.len();

        let base_nonce = client.transaction_count(from).await?;
        tracing::debug!(base_nonce, "Nonce fetched");

        let mut signed: Vec<SignedTransaction> = Vec::with_capacity(total);
        for (index, (intent, fee)) in plan.iter().enumerate() {
            let nonce = base_nonce + index as u64;
            let tx = sign_intent(signer, intent, fee, nonce, connection.chain_id()).await?;
            metrics::record_transaction("signed");
            tracing::debug!(index, nonce, hash = %tx.hash(), "Transaction signed");
            signed.push(tx);
            emit(
                events,
                PlanEvent::SignatureProgress {
                    signed: index + 1,
                    total,
                },
            );
        }

        let poll_interval = Duration::from_millis(self.config.receipt_poll_interval_ms);
        let wait = Duration::from_secs(self.config.receipt_timeout_secs);
        let mut records = Vec::with_capacity(total);
        for (index, (tx, (intent, fee))) in signed.iter().zip(plan.iter()).enumerate() {
            let hash = client.send_raw_transaction(tx.raw()).await?;
            if hash != tx.hash() {
                tracing::warn!(index, local = %tx.hash(), node = %hash, "Node reported a different hash");
            }
            metrics::record_transaction("broadcast");
            emit(events, PlanEvent::Broadcast { index, hash });

            let receipt = wait_for_inclusion(&client, hash, poll_interval, wait).await?;
            if !receipt.status() {
                return Err(WalletError::Reverted(hash.to_string()));
            }
            let block = receipt.block_number.unwrap_or_default();
            metrics::record_transaction("confirmed");
            *succeeded += 1;
            tracing::info!(index, hash = %hash, block, "Transaction confirmed");
            emit(events, PlanEvent::Confirmed { index, hash, block });

            let record = HistoryRecord {
                id: Uuid::new_v4(),
                plan_id,
                plan_label: label.to_string(),
                label: intent.label.clone(),
                hash,
                block_number: block,
                nonce: tx.nonce(),
                from,
                to: intent.to,
                value: intent.value,
                fee: fee.fee,
                fee_token: fee.fee_token.symbol.clone(),
                gas_used: receipt.gas_used,
                timestamp: SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs(),
            };
            history.append(record.clone()).await?;
            records.push(record);
        }
        Ok(records)
    }
}

/// Progress delivery is best effort; a dropped receiver does not stop a plan.
fn emit(events: &UnboundedSender<PlanEvent>, event: PlanEvent) {
    if events.send(event).is_err() {
        tracing::trace!("Progress receiver dropped");
    }
}

impl std::fmt::Debug for PlanExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanExecutor")
            .field("config", &self.config)
            .finish()
    }
}
