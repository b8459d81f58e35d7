//! Verda Service - the waste-diversion accounting facade
//!
//! The single entry point reporting and UI layers talk to: record daily
//! observations, read a tenant-month overview, close a month, transfer it to
//! the official ledger. Everything takes an explicit tenant-month; nothing in
//! the core derives a period from the wall clock.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use verda_directory::{DirectoryError, TenantDirectory};
use verda_ledger::{BridgeError, LedgerBridge};
use verda_lifecycle::{LifecycleController, LifecycleError};
use verda_storage::memory::InMemoryVerdaStorage;
use verda_storage::{MonthStore, OfficialLedgerStore, StorageError};
use verda_types::{
    DailyWasteEntry, EntryDraft, EntryId, MonthlySummary, TenantId, TenantMonth,
};

pub use verda_lifecycle::TransferOutcome;

/// Accounting periods before this year are treated as data-entry mistakes.
const MIN_ACCOUNTING_YEAR: i32 = 2000;
/// And so is anything implausibly far in the future.
const MAX_ACCOUNTING_YEAR: i32 = 2100;

/// Everything a reporting layer needs to render one tenant-month.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonthOverview {
    pub summary: MonthlySummary,
    pub entries: Vec<DailyWasteEntry>,
    pub can_close: bool,
}

/// The Verda service
pub struct VerdaService {
    directory: Arc<dyn TenantDirectory>,
    months: Arc<dyn MonthStore>,
    lifecycle: LifecycleController,
}

impl VerdaService {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        months: Arc<dyn MonthStore>,
        ledger: Arc<dyn OfficialLedgerStore>,
    ) -> Self {
        let lifecycle = LifecycleController::new(months.clone(), LedgerBridge::new(ledger));
        Self {
            directory,
            months,
            lifecycle,
        }
    }

    /// Service backed by the in-memory storage adapter.
    pub fn in_memory(directory: Arc<dyn TenantDirectory>) -> Self {
        let storage = Arc::new(InMemoryVerdaStorage::new());
        Self::new(directory, storage.clone(), storage)
    }

    /// Validate and persist one daily disposal observation. The tenant-month
    /// is derived from the entry's own date; appending re-aggregates that
    /// month atomically. A sealed month rejects the entry rather than
    /// redirecting it, so the caller resubmits against the correct period.
    pub async fn record_entry(
        &self,
        tenant_id: &TenantId,
        draft: EntryDraft,
    ) -> Result<DailyWasteEntry, VerdaError> {
        self.directory.verify_tenant(tenant_id)?;
        self.validate(&draft)?;

        let entry = DailyWasteEntry {
            id: EntryId::generate(),
            tenant_id: tenant_id.clone(),
            date: draft.date,
            category: draft.category,
            material: draft.material,
            kg: draft.kg,
            location: draft.location,
            notes: draft.notes,
            created_at: chrono::Utc::now(),
        };

        let summary = self
            .months
            .append_entry(entry.clone())
            .await
            .map_err(|err| match err {
                StorageError::InvariantViolation(msg) => VerdaError::ImmutableLedger(msg),
                other => VerdaError::Storage(other),
            })?;

        debug!(
            key = %entry.key(),
            category = %entry.category,
            kg = entry.kg,
            entries = summary.totals.entry_count,
            "Daily entry recorded"
        );
        Ok(entry)
    }

    /// One tenant-month as the reporting layer sees it. A first read of an
    /// unseen tenant-month creates its open, empty summary.
    pub async fn get_summary(
        &self,
        tenant_id: &TenantId,
        year: i32,
        month: u32,
    ) -> Result<MonthOverview, VerdaError> {
        self.directory.verify_tenant(tenant_id)?;
        let key = self.month_key(tenant_id, year, month)?;

        let summary = self.months.ensure_month(&key).await?;
        let entries = self.months.list_entries(&key).await?;
        let can_close = summary.is_open() && summary.totals.entry_count > 0;

        Ok(MonthOverview {
            summary,
            entries,
            can_close,
        })
    }

    /// Close a month (requires at least one entry).
    pub async fn close_month(
        &self,
        tenant_id: &TenantId,
        year: i32,
        month: u32,
        closed_by: &str,
    ) -> Result<MonthlySummary, VerdaError> {
        self.directory.verify_tenant(tenant_id)?;
        let key = self.month_key(tenant_id, year, month)?;
        Ok(self.lifecycle.close(&key, closed_by).await?)
    }

    /// Transfer a closed month into the official ledger. Safe to retry: a
    /// repeat call returns the already-published record.
    pub async fn transfer_month(
        &self,
        tenant_id: &TenantId,
        year: i32,
        month: u32,
    ) -> Result<TransferOutcome, VerdaError> {
        self.directory.verify_tenant(tenant_id)?;
        let key = self.month_key(tenant_id, year, month)?;
        Ok(self.lifecycle.transfer(&key).await?)
    }

    /// Known months for a tenant, newest first.
    pub async fn list_months(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<MonthlySummary>, VerdaError> {
        self.directory.verify_tenant(tenant_id)?;
        Ok(self.months.list_months(tenant_id).await?)
    }

    fn month_key(
        &self,
        tenant_id: &TenantId,
        year: i32,
        month: u32,
    ) -> Result<TenantMonth, VerdaError> {
        if !(1..=12).contains(&month) || !(MIN_ACCOUNTING_YEAR..=MAX_ACCOUNTING_YEAR).contains(&year)
        {
            return Err(VerdaError::Validation(format!(
                "implausible accounting period {:04}-{:02}",
                year, month
            )));
        }
        Ok(TenantMonth::new(tenant_id.clone(), year, month))
    }

    fn validate(&self, draft: &EntryDraft) -> Result<(), VerdaError> {
        if !draft.kg.is_finite() || draft.kg < 0.0 {
            return Err(VerdaError::Validation(format!(
                "weight must be a non-negative number of kilograms, got {}",
                draft.kg
            )));
        }

        let year = chrono::Datelike::year(&draft.date);
        if !(MIN_ACCOUNTING_YEAR..=MAX_ACCOUNTING_YEAR).contains(&year) {
            return Err(VerdaError::Validation(format!(
                "implausible observation date {}",
                draft.date
            )));
        }

        if !self
            .directory
            .material_allowed(draft.category, &draft.material)?
        {
            return Err(VerdaError::Validation(format!(
                "material \"{}\" is not in the allowed set for {}",
                draft.material, draft.category
            )));
        }

        Ok(())
    }
}

/// Service errors, the taxonomy consumers branch on.
#[derive(Debug, Error)]
pub enum VerdaError {
    /// Malformed entry or period; nothing was persisted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Lifecycle guard violation; no state changed.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Entry submitted against a sealed month; resubmit against an open one.
    #[error("month is immutable: {0}")]
    ImmutableLedger(String),

    /// Official ledger write failed; the month stays closed for retry.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<DirectoryError> for VerdaError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::UnknownTenant(_) => VerdaError::Validation(err.to_string()),
            DirectoryError::LockError => {
                VerdaError::Storage(StorageError::Backend(err.to_string()))
            }
        }
    }
}

impl From<LifecycleError> for VerdaError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Precondition(msg) => VerdaError::Precondition(msg),
            LifecycleError::Bridge(bridge) => VerdaError::Bridge(bridge),
            LifecycleError::Storage(storage) => VerdaError::Storage(storage),
        }
    }
}
