//! Verda Aggregation - categorized monthly totals
//!
//! Turns a tenant-month's entry set into totals and material breakdowns.
//! Always a full recomputation over the current entries, never an incremental
//! update, so corrections or voided entries upstream cannot leave drift.

#![deny(unsafe_code)]

use verda_types::{AggregationTotals, DailyWasteEntry, WasteCategory};

/// Recompute the totals for one tenant-month from its full entry set.
///
/// Pure and deterministic: same entries in, same totals out, regardless of
/// entry order.
pub fn aggregate(entries: &[DailyWasteEntry]) -> AggregationTotals {
    let mut totals = AggregationTotals::default();

    for entry in entries {
        match entry.category {
            WasteCategory::Recycling => totals.total_recycling += entry.kg,
            WasteCategory::Compost => totals.total_compost += entry.kg,
            WasteCategory::Reuse => totals.total_reuse += entry.kg,
            WasteCategory::Landfill => totals.total_landfill += entry.kg,
        }

        *totals
            .breakdowns
            .entry(entry.category)
            .or_default()
            .entry(entry.material.clone())
            .or_insert(0.0) += entry.kg;
    }

    totals.total_waste =
        totals.total_recycling + totals.total_compost + totals.total_reuse + totals.total_landfill;
    totals.entry_count = entries.len();
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use proptest::prelude::*;
    use verda_types::{EntryId, TenantId};

    fn entry(category: WasteCategory, material: &str, kg: f64) -> DailyWasteEntry {
        DailyWasteEntry {
            id: EntryId::generate(),
            tenant_id: TenantId::new("acme"),
            date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
            category,
            material: material.to_string(),
            kg,
            location: "patio norte".to_string(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_entry_set_yields_zero_totals() {
        let totals = aggregate(&[]);
        assert_eq!(totals, AggregationTotals::default());
    }

    #[test]
    fn categorizes_and_sums_per_stream() {
        let entries = vec![
            entry(WasteCategory::Recycling, "PET", 10.0),
            entry(WasteCategory::Landfill, "Orgánico", 5.0),
        ];
        let totals = aggregate(&entries);

        assert_eq!(totals.total_recycling, 10.0);
        assert_eq!(totals.total_landfill, 5.0);
        assert_eq!(totals.total_waste, 15.0);
        assert_eq!(totals.entry_count, 2);
        assert!((totals.deviation_percentage() - 66.666_666).abs() < 1e-3);
    }

    #[test]
    fn breakdown_accumulates_repeated_materials() {
        let entries = vec![
            entry(WasteCategory::Recycling, "PET", 4.0),
            entry(WasteCategory::Recycling, "PET", 6.0),
            entry(WasteCategory::Recycling, "Cartón", 2.5),
        ];
        let totals = aggregate(&entries);

        let recycling = &totals.breakdowns[&WasteCategory::Recycling];
        assert_eq!(recycling["PET"], 10.0);
        assert_eq!(recycling["Cartón"], 2.5);
        assert_eq!(totals.total_recycling, 12.5);
    }

    fn arb_category() -> impl Strategy<Value = WasteCategory> {
        prop_oneof![
            Just(WasteCategory::Recycling),
            Just(WasteCategory::Compost),
            Just(WasteCategory::Reuse),
            Just(WasteCategory::Landfill),
        ]
    }

    fn arb_entries() -> impl Strategy<Value = Vec<DailyWasteEntry>> {
        prop::collection::vec(
            (arb_category(), "[A-Za-z]{2,10}", 0.0f64..5_000.0).prop_map(
                |(category, material, kg)| entry(category, &material, kg),
            ),
            0..40,
        )
    }

    proptest! {
        #[test]
        fn total_waste_is_the_sum_of_all_streams(entries in arb_entries()) {
            let totals = aggregate(&entries);
            let sum = totals.total_recycling
                + totals.total_compost
                + totals.total_reuse
                + totals.total_landfill;
            prop_assert_eq!(totals.total_waste, sum);
            prop_assert_eq!(totals.entry_count, entries.len());
        }

        #[test]
        fn deviation_stays_within_percent_bounds(entries in arb_entries()) {
            let pct = aggregate(&entries).deviation_percentage();
            prop_assert!((0.0..=100.0).contains(&pct));
        }

        #[test]
        fn breakdowns_reconcile_with_category_totals(entries in arb_entries()) {
            let totals = aggregate(&entries);
            for category in WasteCategory::ALL {
                let from_breakdown: f64 = totals
                    .breakdowns
                    .get(&category)
                    .map(|m| m.values().sum())
                    .unwrap_or(0.0);
                let direct = match category {
                    WasteCategory::Recycling => totals.total_recycling,
                    WasteCategory::Compost => totals.total_compost,
                    WasteCategory::Reuse => totals.total_reuse,
                    WasteCategory::Landfill => totals.total_landfill,
                };
                prop_assert!((from_breakdown - direct).abs() < 1e-6);
            }
        }

        #[test]
        fn aggregation_is_order_independent(entries in arb_entries()) {
            let forward = aggregate(&entries);
            let mut reversed = entries.clone();
            reversed.reverse();
            let backward = aggregate(&reversed);
            prop_assert_eq!(forward.entry_count, backward.entry_count);
            prop_assert!((forward.total_waste - backward.total_waste).abs() < 1e-6);
        }
    }
}
