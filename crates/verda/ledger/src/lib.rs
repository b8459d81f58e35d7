//! Verda Ledger - official ledger bridge
//!
//! Publishes a closed monthly summary into the certification-facing dataset.
//! Recycling, compost and reuse land as diverted; landfill as not diverted;
//! the diversion percentage is computed here and nowhere else downstream.

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use verda_storage::{OfficialLedgerStore, StorageError};
use verda_types::{
    MonthlySummary, OfficialLedgerRecord, SummaryStatus, TenantMonth, WasteCategory,
};

/// Bridge from closed monthly summaries to official ledger records.
pub struct LedgerBridge {
    store: Arc<dyn OfficialLedgerStore>,
}

impl LedgerBridge {
    pub fn new(store: Arc<dyn OfficialLedgerStore>) -> Self {
        Self { store }
    }

    /// Map a closed summary into the official ledger. An upsert keyed by the
    /// tenant-month: retrying with the same frozen summary rewrites the same
    /// record rather than creating a duplicate.
    pub async fn write(&self, summary: &MonthlySummary) -> Result<OfficialLedgerRecord, BridgeError> {
        let record = project(summary)?;
        let stored = self.store.upsert_record(record).await?;
        info!(
            key = %stored.key(),
            deviation = stored.deviation_percentage,
            "Official ledger record written"
        );
        Ok(stored)
    }

    /// The record already published for a tenant-month, if any.
    pub async fn existing(
        &self,
        key: &TenantMonth,
    ) -> Result<Option<OfficialLedgerRecord>, BridgeError> {
        Ok(self.store.get_record(key).await?)
    }
}

/// Denormalize a closed summary into its certification record.
fn project(summary: &MonthlySummary) -> Result<OfficialLedgerRecord, BridgeError> {
    let (closed_at, closed_by) = match &summary.status {
        SummaryStatus::Closed {
            closed_at,
            closed_by,
        } => (*closed_at, closed_by.clone()),
        other => {
            return Err(BridgeError::NotClosed(format!(
                "summary for {} is {}, only a closed month can be published",
                summary.key(),
                other.kind()
            )));
        }
    };

    let totals = &summary.totals;
    let mut diverted_breakdowns = BTreeMap::new();
    for category in WasteCategory::ALL {
        if !category.is_diverted() {
            continue;
        }
        if let Some(breakdown) = totals.breakdowns.get(&category) {
            diverted_breakdowns.insert(category, breakdown.clone());
        }
    }
    let landfill_breakdown = totals
        .breakdowns
        .get(&WasteCategory::Landfill)
        .cloned()
        .unwrap_or_default();

    let key = summary.key();
    Ok(OfficialLedgerRecord {
        record_id: OfficialLedgerRecord::derive_id(&key),
        tenant_id: summary.tenant_id.clone(),
        year: summary.year,
        month: summary.month,
        total_recycling: totals.total_recycling,
        total_compost: totals.total_compost,
        total_reuse: totals.total_reuse,
        total_landfill: totals.total_landfill,
        total_diverted: totals.total_diverted(),
        total_generated: totals.total_generated(),
        deviation_percentage: totals.deviation_percentage(),
        diverted_breakdowns,
        landfill_breakdown,
        entry_count: totals.entry_count,
        source_summary_id: summary.id.clone(),
        closed_at,
        closed_by,
    })
}

/// Bridge errors. A failed store write leaves the summary closed so the
/// caller can retry the transfer.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("summary not closed: {0}")]
    NotClosed(String),

    #[error("official ledger write failed: {0}")]
    Store(#[from] StorageError),
}
