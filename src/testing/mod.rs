//! Testing utilities and fixtures
//!
//! Sample order records in every representation, builders for one-off
//! records, and assertions over shaped results. Public so integration tests
//! and benchmarks can share them.

pub mod fixtures;
pub mod helpers;

pub use fixtures::{orders, orders_dynamic, orders_json, Order, OrderBuilder};
pub use helpers::assertions::{
    assert_approx_eq, assert_group_counts_consistent, assert_group_keys, assert_order_ids,
    assert_sorted_by, field_values,
};
