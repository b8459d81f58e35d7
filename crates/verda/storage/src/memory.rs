//! In-memory reference implementation for the Verda storage traits.
//!
//! Deterministic and test-friendly. One write lock per store covers each
//! guard-check-and-mutate, which gives the per-key atomicity the lifecycle
//! controller depends on; distinct tenant-months simply share that lock here.

use crate::traits::{MonthStore, OfficialLedgerStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use verda_types::{
    DailyWasteEntry, MonthlySummary, OfficialLedgerRecord, StatusKind, SummaryStatus, TenantId,
    TenantMonth,
};

/// One tenant-month under storage: the raw entries and their summary.
struct MonthRecord {
    summary: MonthlySummary,
    entries: Vec<DailyWasteEntry>,
}

/// In-memory Verda storage adapter.
#[derive(Default)]
pub struct InMemoryVerdaStorage {
    months: RwLock<HashMap<TenantMonth, MonthRecord>>,
    ledger: RwLock<HashMap<TenantMonth, OfficialLedgerRecord>>,
}

impl InMemoryVerdaStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MonthStore for InMemoryVerdaStorage {
    async fn ensure_month(&self, key: &TenantMonth) -> StorageResult<MonthlySummary> {
        let mut guard = self
            .months
            .write()
            .map_err(|_| StorageError::Backend("month lock poisoned".to_string()))?;
        let record = guard.entry(key.clone()).or_insert_with(|| MonthRecord {
            summary: MonthlySummary::open(key),
            entries: Vec::new(),
        });
        Ok(record.summary.clone())
    }

    async fn get_summary(&self, key: &TenantMonth) -> StorageResult<Option<MonthlySummary>> {
        let guard = self
            .months
            .read()
            .map_err(|_| StorageError::Backend("month lock poisoned".to_string()))?;
        Ok(guard.get(key).map(|r| r.summary.clone()))
    }

    async fn append_entry(&self, entry: DailyWasteEntry) -> StorageResult<MonthlySummary> {
        let key = entry.key();
        let mut guard = self
            .months
            .write()
            .map_err(|_| StorageError::Backend("month lock poisoned".to_string()))?;
        let record = guard.entry(key.clone()).or_insert_with(|| MonthRecord {
            summary: MonthlySummary::open(&key),
            entries: Vec::new(),
        });

        match record.summary.status.kind() {
            StatusKind::Open => {}
            sealed => {
                return Err(StorageError::InvariantViolation(format!(
                    "month {} is {} and accepts no further entries",
                    key, sealed
                )));
            }
        }

        if record.entries.iter().any(|e| e.id == entry.id) {
            return Err(StorageError::Conflict(format!(
                "entry {} already recorded for {}",
                entry.id.0, key
            )));
        }

        record.entries.push(entry);
        record.summary.totals = verda_aggregation::aggregate(&record.entries);
        Ok(record.summary.clone())
    }

    async fn list_entries(&self, key: &TenantMonth) -> StorageResult<Vec<DailyWasteEntry>> {
        let guard = self
            .months
            .read()
            .map_err(|_| StorageError::Backend("month lock poisoned".to_string()))?;
        let mut entries = guard
            .get(key)
            .map(|r| r.entries.clone())
            .unwrap_or_default();
        entries.sort_by(|a, b| (a.date, a.created_at).cmp(&(b.date, b.created_at)));
        Ok(entries)
    }

    async fn transition_summary(
        &self,
        key: &TenantMonth,
        expected_from: StatusKind,
        to: SummaryStatus,
    ) -> StorageResult<MonthlySummary> {
        let mut guard = self
            .months
            .write()
            .map_err(|_| StorageError::Backend("month lock poisoned".to_string()))?;
        let record = guard
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound(format!("no summary recorded for {}", key)))?;

        let found = record.summary.status.kind();
        if found != expected_from {
            return Err(StorageError::InvariantViolation(format!(
                "invalid lifecycle transition for {}: expected {}, found {}",
                key, expected_from, found
            )));
        }

        record.summary.status = to;
        Ok(record.summary.clone())
    }

    async fn list_months(&self, tenant_id: &TenantId) -> StorageResult<Vec<MonthlySummary>> {
        let guard = self
            .months
            .read()
            .map_err(|_| StorageError::Backend("month lock poisoned".to_string()))?;
        let mut summaries = guard
            .values()
            .filter(|r| &r.summary.tenant_id == tenant_id)
            .map(|r| r.summary.clone())
            .collect::<Vec<_>>();
        summaries.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        Ok(summaries)
    }
}

#[async_trait]
impl OfficialLedgerStore for InMemoryVerdaStorage {
    async fn upsert_record(
        &self,
        record: OfficialLedgerRecord,
    ) -> StorageResult<OfficialLedgerRecord> {
        let mut guard = self
            .ledger
            .write()
            .map_err(|_| StorageError::Backend("ledger lock poisoned".to_string()))?;
        guard.insert(record.key(), record.clone());
        Ok(record)
    }

    async fn get_record(&self, key: &TenantMonth) -> StorageResult<Option<OfficialLedgerRecord>> {
        let guard = self
            .ledger
            .read()
            .map_err(|_| StorageError::Backend("ledger lock poisoned".to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn list_records(
        &self,
        tenant_id: &TenantId,
    ) -> StorageResult<Vec<OfficialLedgerRecord>> {
        let guard = self
            .ledger
            .read()
            .map_err(|_| StorageError::Backend("ledger lock poisoned".to_string()))?;
        let mut records = guard
            .values()
            .filter(|r| &r.tenant_id == tenant_id)
            .cloned()
            .collect::<Vec<_>>();
        records.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};
    use verda_types::{EntryId, WasteCategory};

    fn key() -> TenantMonth {
        TenantMonth::new(TenantId::new("acme"), 2024, 5)
    }

    fn entry(day: u32, kg: f64) -> DailyWasteEntry {
        DailyWasteEntry {
            id: EntryId::generate(),
            tenant_id: TenantId::new("acme"),
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            category: WasteCategory::Recycling,
            material: "PET".to_string(),
            kg,
            location: "patio norte".to_string(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn ensure_month_creates_exactly_one_summary() {
        let storage = InMemoryVerdaStorage::new();
        let first = storage.ensure_month(&key()).await.unwrap();
        let second = storage.ensure_month(&key()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.is_open());
        assert_eq!(first.totals.entry_count, 0);
    }

    #[tokio::test]
    async fn append_recomputes_totals_from_the_full_set() {
        let storage = InMemoryVerdaStorage::new();
        storage.append_entry(entry(3, 4.0)).await.unwrap();
        let summary = storage.append_entry(entry(5, 6.0)).await.unwrap();

        assert_eq!(summary.totals.total_recycling, 10.0);
        assert_eq!(summary.totals.entry_count, 2);
    }

    #[tokio::test]
    async fn append_rejects_a_sealed_month() {
        let storage = InMemoryVerdaStorage::new();
        storage.append_entry(entry(3, 4.0)).await.unwrap();
        storage
            .transition_summary(
                &key(),
                StatusKind::Open,
                SummaryStatus::Closed {
                    closed_at: Utc::now(),
                    closed_by: "supervisor".to_string(),
                },
            )
            .await
            .unwrap();

        let result = storage.append_entry(entry(7, 1.0)).await;
        assert!(matches!(result, Err(StorageError::InvariantViolation(_))));

        // The frozen snapshot is untouched.
        let summary = storage.get_summary(&key()).await.unwrap().unwrap();
        assert_eq!(summary.totals.entry_count, 1);
    }

    #[tokio::test]
    async fn transition_checks_expected_state() {
        let storage = InMemoryVerdaStorage::new();
        storage.ensure_month(&key()).await.unwrap();

        let result = storage
            .transition_summary(
                &key(),
                StatusKind::Closed,
                SummaryStatus::Transferred {
                    transferred_at: Utc::now(),
                },
            )
            .await;
        assert!(matches!(result, Err(StorageError::InvariantViolation(_))));

        let summary = storage.get_summary(&key()).await.unwrap().unwrap();
        assert!(summary.is_open());
    }

    #[tokio::test]
    async fn entries_come_back_ordered_by_date_then_acceptance() {
        let storage = InMemoryVerdaStorage::new();
        let now = Utc::now();

        let mut late = entry(10, 1.0);
        late.created_at = now + Duration::seconds(5);
        let mut early_same_day = entry(10, 2.0);
        early_same_day.created_at = now;
        let earlier_day = entry(2, 3.0);

        storage.append_entry(late.clone()).await.unwrap();
        storage.append_entry(earlier_day.clone()).await.unwrap();
        storage.append_entry(early_same_day.clone()).await.unwrap();

        let listed = storage.list_entries(&key()).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec![earlier_day.id, early_same_day.id, late.id]);
    }

    #[tokio::test]
    async fn duplicate_entry_ids_conflict() {
        let storage = InMemoryVerdaStorage::new();
        let e = entry(3, 4.0);
        storage.append_entry(e.clone()).await.unwrap();

        let result = storage.append_entry(e).await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));
    }
}
