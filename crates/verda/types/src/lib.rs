//! Verda Types - waste-diversion accounting vocabulary
//!
//! Shared domain types for the monthly accounting pipeline: daily disposal
//! entries, tenant-month keys, lifecycle-tracked monthly summaries, and the
//! certification-facing official ledger record.

#![deny(unsafe_code)]

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);
impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}
impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub String);
impl EntryId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SummaryId(pub String);
impl SummaryId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Natural key for one accounting period of one client organization.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantMonth {
    pub tenant_id: TenantId,
    pub year: i32,
    pub month: u32,
}

impl TenantMonth {
    pub fn new(tenant_id: TenantId, year: i32, month: u32) -> Self {
        Self {
            tenant_id,
            year,
            month,
        }
    }

    /// The tenant-month an observation date belongs to. Every operation
    /// threads this key explicitly; nothing derives a period from the clock.
    pub fn of_date(tenant_id: TenantId, date: NaiveDate) -> Self {
        Self {
            tenant_id,
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for TenantMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{:04}-{:02}", self.tenant_id, self.year, self.month)
    }
}

/// Disposal stream an observation is routed into.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum WasteCategory {
    Recycling,
    Compost,
    Reuse,
    Landfill,
}

impl WasteCategory {
    pub const ALL: [WasteCategory; 4] = [
        WasteCategory::Recycling,
        WasteCategory::Compost,
        WasteCategory::Reuse,
        WasteCategory::Landfill,
    ];

    /// Whether material in this stream counts toward the diversion rate.
    pub fn is_diverted(&self) -> bool {
        !matches!(self, WasteCategory::Landfill)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WasteCategory::Recycling => "recycling",
            WasteCategory::Compost => "compost",
            WasteCategory::Reuse => "reuse",
            WasteCategory::Landfill => "landfill",
        }
    }
}

impl std::fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded disposal observation. Immutable once accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyWasteEntry {
    pub id: EntryId,
    pub tenant_id: TenantId,
    pub date: NaiveDate,
    pub category: WasteCategory,
    pub material: String,
    pub kg: f64,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DailyWasteEntry {
    pub fn key(&self) -> TenantMonth {
        TenantMonth::of_date(self.tenant_id.clone(), self.date)
    }
}

/// Caller-supplied payload for a new observation; the store assigns the id
/// and acceptance timestamp.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntryDraft {
    pub date: NaiveDate,
    pub category: WasteCategory,
    pub material: String,
    pub kg: f64,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Summed kilograms per material, order-irrelevant.
pub type MaterialBreakdown = BTreeMap<String, f64>;

/// Categorized totals for one tenant-month, always recomputed from the full
/// entry set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationTotals {
    pub total_recycling: f64,
    pub total_compost: f64,
    pub total_reuse: f64,
    pub total_landfill: f64,
    pub total_waste: f64,
    pub breakdowns: BTreeMap<WasteCategory, MaterialBreakdown>,
    pub entry_count: usize,
}

impl AggregationTotals {
    /// Kilograms kept out of landfill.
    pub fn total_diverted(&self) -> f64 {
        self.total_recycling + self.total_compost + self.total_reuse
    }

    pub fn total_generated(&self) -> f64 {
        self.total_diverted() + self.total_landfill
    }

    /// Diversion rate in percent, 0 for a month with no generated waste.
    pub fn deviation_percentage(&self) -> f64 {
        let generated = self.total_generated();
        if generated == 0.0 {
            0.0
        } else {
            self.total_diverted() / generated * 100.0
        }
    }
}

/// Lifecycle of a monthly summary. The timestamps live inside the variant
/// that owns them, so a transferred-while-open combination cannot exist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SummaryStatus {
    Open,
    Closed {
        closed_at: DateTime<Utc>,
        closed_by: String,
    },
    Transferred {
        transferred_at: DateTime<Utc>,
    },
}

impl SummaryStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            SummaryStatus::Open => StatusKind::Open,
            SummaryStatus::Closed { .. } => StatusKind::Closed,
            SummaryStatus::Transferred { .. } => StatusKind::Transferred,
        }
    }
}

/// Status discriminant used for compare-and-set transition guards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Open,
    Closed,
    Transferred,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatusKind::Open => "open",
            StatusKind::Closed => "closed",
            StatusKind::Transferred => "transferred",
        };
        f.write_str(s)
    }
}

/// Lifecycle-tracked rollup of one tenant-month. Exactly one exists per
/// tenant-month key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub id: SummaryId,
    pub tenant_id: TenantId,
    pub year: i32,
    pub month: u32,
    pub status: SummaryStatus,
    pub totals: AggregationTotals,
}

impl MonthlySummary {
    /// Fresh, empty summary for a newly seen tenant-month.
    pub fn open(key: &TenantMonth) -> Self {
        Self {
            id: SummaryId::generate(),
            tenant_id: key.tenant_id.clone(),
            year: key.year,
            month: key.month,
            status: SummaryStatus::Open,
            totals: AggregationTotals::default(),
        }
    }

    pub fn key(&self) -> TenantMonth {
        TenantMonth::new(self.tenant_id.clone(), self.year, self.month)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, SummaryStatus::Open)
    }
}

/// Denormalized certification record, written only at transfer time. The id
/// is derived from the tenant-month so a retried write lands on the same row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OfficialLedgerRecord {
    pub record_id: String,
    pub tenant_id: TenantId,
    pub year: i32,
    pub month: u32,
    pub total_recycling: f64,
    pub total_compost: f64,
    pub total_reuse: f64,
    pub total_landfill: f64,
    pub total_diverted: f64,
    pub total_generated: f64,
    pub deviation_percentage: f64,
    pub diverted_breakdowns: BTreeMap<WasteCategory, MaterialBreakdown>,
    pub landfill_breakdown: MaterialBreakdown,
    pub entry_count: usize,
    pub source_summary_id: SummaryId,
    pub closed_at: DateTime<Utc>,
    pub closed_by: String,
}

impl OfficialLedgerRecord {
    pub fn derive_id(key: &TenantMonth) -> String {
        format!("ledger-{}-{:04}-{:02}", key.tenant_id, key.year, key.month)
    }

    pub fn key(&self) -> TenantMonth {
        TenantMonth::new(self.tenant_id.clone(), self.year, self.month)
    }
}
