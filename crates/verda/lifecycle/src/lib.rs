//! Verda Lifecycle - monthly summary state machine
//!
//! Enforces the monotonic Open → Closed → Transferred lifecycle. Guards and
//! mutations run through the store's compare-and-set, so two concurrent
//! callers can never both close or both transfer the same tenant-month.

#![deny(unsafe_code)]

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use verda_ledger::{BridgeError, LedgerBridge};
use verda_storage::{MonthStore, StorageError};
use verda_types::{MonthlySummary, OfficialLedgerRecord, StatusKind, SummaryStatus, TenantMonth};

/// Result of a successful (or idempotently repeated) transfer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub summary: MonthlySummary,
    pub record: OfficialLedgerRecord,
}

/// Drives monthly summaries through their lifecycle.
pub struct LifecycleController {
    months: Arc<dyn MonthStore>,
    bridge: LedgerBridge,
}

impl LifecycleController {
    pub fn new(months: Arc<dyn MonthStore>, bridge: LedgerBridge) -> Self {
        Self { months, bridge }
    }

    /// Close an open month, freezing its aggregation.
    ///
    /// Guard: the summary is open and holds at least one entry. The entry
    /// store is append-only, so a positive count observed here cannot drop
    /// back to zero before the compare-and-set lands.
    pub async fn close(
        &self,
        key: &TenantMonth,
        closed_by: &str,
    ) -> Result<MonthlySummary, LifecycleError> {
        let summary = self.fetch(key).await?;

        match summary.status.kind() {
            StatusKind::Open => {}
            sealed => {
                return Err(LifecycleError::Precondition(format!(
                    "cannot close {}: month is already {}",
                    key, sealed
                )));
            }
        }
        if summary.totals.entry_count == 0 {
            return Err(LifecycleError::Precondition(format!(
                "cannot close {}: month has no entries",
                key
            )));
        }

        let closed = self
            .months
            .transition_summary(
                key,
                StatusKind::Open,
                SummaryStatus::Closed {
                    closed_at: Utc::now(),
                    closed_by: closed_by.to_string(),
                },
            )
            .await
            .map_err(raced_to_precondition)?;

        info!(key = %key, closed_by = %closed_by, entries = closed.totals.entry_count, "Monthly summary closed");
        Ok(closed)
    }

    /// Transfer a closed month into the official ledger.
    ///
    /// Idempotent: calling transfer again after a success returns the
    /// existing official record unchanged, so callers may retry freely after
    /// a network failure. A bridge failure leaves the summary closed.
    pub async fn transfer(&self, key: &TenantMonth) -> Result<TransferOutcome, LifecycleError> {
        let summary = self.fetch(key).await?;

        match summary.status.kind() {
            StatusKind::Open => Err(LifecycleError::Precondition(format!(
                "cannot transfer {}: month has not been closed",
                key
            ))),
            StatusKind::Transferred => self.already_transferred(key, summary).await,
            StatusKind::Closed => {
                let record = self.bridge.write(&summary).await?;

                let transition = self
                    .months
                    .transition_summary(
                        key,
                        StatusKind::Closed,
                        SummaryStatus::Transferred {
                            transferred_at: Utc::now(),
                        },
                    )
                    .await;

                match transition {
                    Ok(transferred) => {
                        info!(key = %key, "Monthly summary transferred to the official ledger");
                        Ok(TransferOutcome {
                            summary: transferred,
                            record,
                        })
                    }
                    // A concurrent transfer won the compare-and-set between
                    // our guard read and this write; its record is the one
                    // already stored and matches ours.
                    Err(StorageError::InvariantViolation(_)) => {
                        warn!(key = %key, "Transfer raced a concurrent caller; returning the stored record");
                        let summary = self.fetch(key).await?;
                        self.already_transferred(key, summary).await
                    }
                    Err(other) => Err(LifecycleError::Storage(other)),
                }
            }
        }
    }

    async fn already_transferred(
        &self,
        key: &TenantMonth,
        summary: MonthlySummary,
    ) -> Result<TransferOutcome, LifecycleError> {
        let record = self.bridge.existing(key).await?.ok_or_else(|| {
            LifecycleError::Storage(StorageError::NotFound(format!(
                "official record missing for transferred month {}",
                key
            )))
        })?;
        Ok(TransferOutcome { summary, record })
    }

    async fn fetch(&self, key: &TenantMonth) -> Result<MonthlySummary, LifecycleError> {
        self.months
            .get_summary(key)
            .await?
            .ok_or_else(|| {
                LifecycleError::Precondition(format!("no summary recorded for {}", key))
            })
    }
}

/// A compare-and-set miss means another caller changed the status first;
/// surface it as the same guard violation a sequential caller would see.
fn raced_to_precondition(err: StorageError) -> LifecycleError {
    match err {
        StorageError::InvariantViolation(msg) => LifecycleError::Precondition(msg),
        other => LifecycleError::Storage(other),
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
