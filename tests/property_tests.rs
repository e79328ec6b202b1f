//! Property tests for the shaping stages
//!
//! Verifies with proptest that:
//! - AND/OR composition matches set intersection/union
//! - Multi-key sorting refines single-key sorting
//! - Group counts add up at every level
//! - Paging is a pure function of its input
//! - Offset dates survive coercion and canonical formatting

use chrono::{DateTime, FixedOffset, NaiveDate};
use gridquery::query::{
    coerce, normalize_date_string, FieldKind, FilterClause, Joiner, Operator, QueryPipeline,
    QueryRequest, SortKey, TypeInfo, Value,
};
use gridquery::testing::assert_group_counts_consistent;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;

const NAMES: &[&str] = &["alpha", "Beta", "gamma", "DELTA"];

fn row_strategy() -> impl Strategy<Value = (i64, usize, Option<i64>)> {
    (0i64..6, 0usize..NAMES.len(), proptest::option::of(-3i64..3))
}

fn rows_strategy() -> impl Strategy<Value = Vec<serde_json::Value>> {
    prop::collection::vec(row_strategy(), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(id, (rank, name, score))| {
                json!({"Id": id, "Rank": rank, "Name": NAMES[name], "Score": score})
            })
            .collect()
    })
}

fn ids(rows: &[serde_json::Value]) -> Vec<i64> {
    rows.iter().filter_map(|r| r["Id"].as_i64()).collect()
}

fn filtered(rows: &[serde_json::Value], request: &QueryRequest) -> BTreeSet<i64> {
    let result = QueryPipeline::default().execute(rows, request);
    ids(result.records().unwrap_or_default()).into_iter().collect()
}

proptest! {
    #[test]
    fn prop_and_is_intersection_or_is_union(
        rows in rows_strategy(),
        rank in 0i64..6,
        name in 0usize..NAMES.len(),
    ) {
        let a = FilterClause::simple("Rank", Operator::GreaterThanOrEqual, rank);
        let b = FilterClause::simple("Name", Operator::Equals, NAMES[name].to_uppercase());

        let only_a = filtered(&rows, &QueryRequest::new().filter(a.clone()));
        let only_b = filtered(&rows, &QueryRequest::new().filter(b.clone()));
        let both = QueryRequest::new().filter(a.clone()).filter(b.clone());
        let either = QueryRequest::new().filter(a).filter(b).with_joiner(Joiner::Or);

        let intersection: BTreeSet<i64> = only_a.intersection(&only_b).copied().collect();
        let union: BTreeSet<i64> = only_a.union(&only_b).copied().collect();
        prop_assert_eq!(filtered(&rows, &both), intersection);
        prop_assert_eq!(filtered(&rows, &either), union);
    }

    #[test]
    fn prop_multi_key_sort_refines_single_key(rows in rows_strategy()) {
        let pipeline = QueryPipeline::default();
        let multi = QueryRequest::new()
            .sort_by(SortKey::ascending("Rank"))
            .sort_by(SortKey::descending("Score"));
        let sorted = pipeline.execute(&rows, &multi);
        let sorted = sorted.records().unwrap_or_default().to_vec();

        let single = QueryRequest::new().sort_by(SortKey::ascending("Rank"));
        let resorted = pipeline.execute(&sorted, &single);
        prop_assert_eq!(ids(resorted.records().unwrap_or_default()), ids(&sorted));
    }

    #[test]
    fn prop_group_counts_add_up(rows in rows_strategy(), lazy in any::<bool>()) {
        let request = QueryRequest::new()
            .group_by("Name")
            .group_by("Score")
            .lazy(lazy, false);
        let result = QueryPipeline::default().execute(&rows, &request);
        match result.groups() {
            Some(groups) => {
                let total: usize = groups.iter().map(|g| g.count).sum();
                prop_assert_eq!(total, rows.len());
                for group in groups {
                    let below: usize = group.subgroups.iter().map(|s| s.count).sum();
                    prop_assert_eq!(below, group.count);
                }
                if !lazy {
                    assert_group_counts_consistent(groups, rows.len());
                }
            }
            None => prop_assert!(rows.is_empty()),
        }
    }

    #[test]
    fn prop_paging_is_idempotent(rows in rows_strategy(), skip in 0usize..50, take in 1usize..50) {
        let pipeline = QueryPipeline::default();
        let request = QueryRequest::new().skip(skip).take(take);
        let first = pipeline.execute(&rows, &request);
        let second = pipeline.execute(&rows, &request);
        prop_assert_eq!(&first, &second);

        let expected: Vec<serde_json::Value> = rows.iter().skip(skip).take(take).cloned().collect();
        prop_assert_eq!(first.records().unwrap_or_default(), expected.as_slice());
    }

    #[test]
    fn prop_offset_dates_round_trip(
        days in 0i64..20_000,
        seconds in 0u32..86_400,
        millis in 0u32..1000,
        offset_minutes in -720i32..=840,
    ) {
        let base = NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid epoch");
        let local = base
            + chrono::Duration::days(days)
            + chrono::Duration::seconds(i64::from(seconds))
            + chrono::Duration::milliseconds(i64::from(millis));
        let offset = FixedOffset::east_opt(offset_minutes * 60).expect("offset in range");
        let instant: DateTime<FixedOffset> = local
            .and_local_timezone(offset)
            .single()
            .expect("fixed offsets are unambiguous");
        let literal = instant.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string();

        let coerced = coerce(&Value::from(literal.as_str()), &TypeInfo::of(FieldKind::DateTimeOffset))
            .expect("offset literal coerces");
        let expected = instant.naive_utc().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        prop_assert_eq!(coerced.as_instant(), Some(instant.naive_utc()));
        prop_assert_eq!(coerced.to_canonical_date(), Some(expected.clone()));
        prop_assert_eq!(normalize_date_string(&literal).ok(), Some(expected));
    }
}
