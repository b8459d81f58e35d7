use crate::StorageResult;
use async_trait::async_trait;
use verda_types::{
    DailyWasteEntry, MonthlySummary, OfficialLedgerRecord, StatusKind, SummaryStatus, TenantId,
    TenantMonth,
};

/// Storage interface for one tenant-month: its daily entries plus the single
/// lifecycle-tracked summary.
#[async_trait]
pub trait MonthStore: Send + Sync {
    /// Get the summary for a tenant-month, creating an empty open one the
    /// first time the key is seen. Never creates a second summary for the
    /// same key.
    async fn ensure_month(&self, key: &TenantMonth) -> StorageResult<MonthlySummary>;

    /// Get the summary if the tenant-month has been seen.
    async fn get_summary(&self, key: &TenantMonth) -> StorageResult<Option<MonthlySummary>>;

    /// Append one entry and recompute the summary totals from the full entry
    /// set, all inside the per-key atomic unit. Rejects the append with an
    /// invariant violation when the summary is no longer open.
    async fn append_entry(&self, entry: DailyWasteEntry) -> StorageResult<MonthlySummary>;

    /// Entries for a tenant-month, ordered by (date, created_at).
    async fn list_entries(&self, key: &TenantMonth) -> StorageResult<Vec<DailyWasteEntry>>;

    /// Compare-and-set lifecycle transition: applies `to` only when the
    /// stored status still matches `expected_from`, otherwise fails with an
    /// invariant violation and changes nothing.
    async fn transition_summary(
        &self,
        key: &TenantMonth,
        expected_from: StatusKind,
        to: SummaryStatus,
    ) -> StorageResult<MonthlySummary>;

    /// Known months for a tenant, newest period first.
    async fn list_months(&self, tenant_id: &TenantId) -> StorageResult<Vec<MonthlySummary>>;
}

/// Storage interface for the certification-facing official ledger.
#[async_trait]
pub trait OfficialLedgerStore: Send + Sync {
    /// Upsert keyed by tenant-month: a retried write with identical input
    /// yields an identical record, never a duplicate row.
    async fn upsert_record(
        &self,
        record: OfficialLedgerRecord,
    ) -> StorageResult<OfficialLedgerRecord>;

    async fn get_record(&self, key: &TenantMonth) -> StorageResult<Option<OfficialLedgerRecord>>;

    /// Records for a tenant, newest period first.
    async fn list_records(&self, tenant_id: &TenantId)
        -> StorageResult<Vec<OfficialLedgerRecord>>;
}

/// Unified storage bundle consumed by the service facade.
pub trait VerdaStorage: MonthStore + OfficialLedgerStore + Send + Sync {}

impl<T> VerdaStorage for T where T: MonthStore + OfficialLedgerStore + Send + Sync {}
