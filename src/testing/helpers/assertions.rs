//! Custom test assertions for shaped results
#![allow(clippy::uninlined_format_args)]

use crate::query::{GroupResult, PathResolver, Record, Value};
use std::cmp::Ordering;

/// Assert that a result is Ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {{
        match $result {
            Ok(val) => val,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    }};
}

/// Assert that a result is Err and return the error
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {{
        match $result {
            Ok(val) => panic!("Expected Err, got Ok: {:?}", val),
            Err(e) => e,
        }
    }};
}

/// Assert that a result failed with a specific error code
#[macro_export]
macro_rules! assert_error_code {
    ($result:expr, $code:expr) => {{
        let err = $crate::assert_err!($result);
        assert_eq!(
            err.code(),
            $code,
            "Error '{}' has code {} instead of {}",
            err,
            err.code(),
            $code
        );
        err
    }};
}

/// Values at `field` for every record, in order
pub fn field_values<R: Record>(records: &[R], field: &str) -> Vec<Value> {
    records
        .iter()
        .map(|record| PathResolver::get(record, field))
        .collect()
}

/// Assert that records carry exactly these `OrderID`s, in this order
pub fn assert_order_ids<R: Record>(records: &[R], expected: &[i64]) {
    let ids: Vec<Option<i64>> = field_values(records, "OrderID")
        .iter()
        .map(Value::as_i64)
        .collect();
    let expected: Vec<Option<i64>> = expected.iter().copied().map(Some).collect();
    assert_eq!(ids, expected, "Unexpected OrderID sequence");
}

/// Assert that `field` never decreases (or never increases) across records
pub fn assert_sorted_by<R: Record>(records: &[R], field: &str, descending: bool) {
    let values = field_values(records, field);
    for pair in values.windows(2) {
        let order = pair[0].sort_cmp(&pair[1]);
        let broken = if descending {
            order == Ordering::Less
        } else {
            order == Ordering::Greater
        };
        assert!(
            !broken,
            "Records are not sorted by {}: {} before {}",
            field,
            pair[0],
            pair[1]
        );
    }
}

/// Assert the display keys of a group level, in order
pub fn assert_group_keys<R>(groups: &[GroupResult<R>], expected: &[&str]) {
    let keys: Vec<String> = groups.iter().map(|g| g.key.to_string()).collect();
    assert_eq!(keys, expected, "Unexpected group keys");
}

/// Assert that every group's count matches its items and the counts add up
pub fn assert_group_counts_consistent<R>(groups: &[GroupResult<R>], total: usize) {
    let mut sum = 0;
    for group in groups {
        if group.is_leaf() {
            assert_eq!(
                group.count,
                group.items.len(),
                "Group {} reports {} items but holds {}",
                group.key,
                group.count,
                group.items.len()
            );
        } else {
            assert_group_counts_consistent(&group.subgroups, group.count);
        }
        sum += group.count;
    }
    assert_eq!(sum, total, "Group counts add up to {} instead of {}", sum, total);
}

/// Assert that a float is approximately equal to another
pub fn assert_approx_eq(a: f64, b: f64, epsilon: f64) {
    let diff = (a - b).abs();
    assert!(
        diff <= epsilon,
        "Values {} and {} differ by {} (max allowed: {})",
        a,
        b,
        diff,
        epsilon
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, QueryError};
    use crate::testing::fixtures::orders;

    #[test]
    fn test_assert_order_ids() {
        let orders = orders();
        assert_order_ids(&orders[..3], &[1001, 1002, 1003]);
        assert_sorted_by(&orders, "OrderID", false);
    }

    #[test]
    #[should_panic(expected = "Records are not sorted by OrderID")]
    fn test_assert_sorted_by_panics() {
        assert_sorted_by(&orders(), "OrderID", true);
    }

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.00001, 0.0001);
    }

    #[test]
    fn test_result_macros() {
        let ok: Result<i32, QueryError> = Ok(42);
        assert_eq!(assert_ok!(ok), 42);

        let err: Result<i32, QueryError> = Err(QueryError::argument_null("request"));
        assert_error_code!(err, ErrorCode::ARGUMENT_NULL);
    }
}
