//! Multi-key sorting
//!
//! Keys apply in list order, first key primary. Each key reads its field
//! through [`PathResolver`], so a null intermediate on a dotted path reads as
//! a null key, and nulls order first ascending.

use super::path::{FieldPath, PathResolver};
use super::record::Record;
use super::value::Value;
use crate::error::{common, QueryError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Custom ordering between two key values
pub type Comparer = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(common::unknown_direction(s, None)),
        }
    }
}

#[derive(Clone)]
pub struct SortKey {
    pub field: FieldPath,
    pub direction: SortDirection,
    pub comparer: Option<Comparer>,
}

impl SortKey {
    pub fn ascending(field: &str) -> Self {
        Self {
            field: FieldPath::parse(field),
            direction: SortDirection::Ascending,
            comparer: None,
        }
    }

    pub fn descending(field: &str) -> Self {
        Self {
            direction: SortDirection::Descending,
            ..Self::ascending(field)
        }
    }

    pub fn with_comparer<F>(mut self, comparer: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.comparer = Some(Arc::new(comparer));
        self
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = match &self.comparer {
            Some(comparer) => comparer(a, b),
            None => a.sort_cmp(b),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl fmt::Debug for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortKey")
            .field("field", &self.field)
            .field("direction", &self.direction)
            .field("comparer", &self.comparer.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl PartialEq for SortKey {
    /// Custom comparers compare by identity
    fn eq(&self, other: &Self) -> bool {
        let same_comparer = match (&self.comparer, &other.comparer) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.field == other.field && self.direction == other.direction && same_comparer
    }
}

/// Ordered list of sort keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sorter {
    pub keys: Vec<SortKey>,
}

impl Sorter {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    /// Parse a sort specification such as `"CustomerID, OrderID desc"`
    pub fn parse(spec: &str) -> Result<Self> {
        let mut keys = Vec::new();
        for key_spec in spec.split(',') {
            let parts: Vec<&str> = key_spec.split_whitespace().collect();
            let Some((field, rest)) = parts.split_first() else {
                continue;
            };
            let direction = match rest {
                [] => SortDirection::Ascending,
                [direction] => direction
                    .parse()
                    .map_err(|_| common::unknown_direction(direction, Some(*field)))?,
                _ => {
                    return Err(common::malformed_clause(
                        &format!("unexpected tokens in sort key '{}'", key_spec.trim()),
                        Some(*field),
                    ))
                }
            };
            keys.push(SortKey {
                field: FieldPath::parse(field),
                direction,
                comparer: None,
            });
        }
        Ok(Self { keys })
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Stable sort by every key, first key primary
    pub fn sort<R: Record>(&self, records: Vec<R>) -> Vec<R> {
        if records.is_empty() || self.keys.is_empty() {
            return records;
        }

        // read every key once per record, not once per comparison
        let mut decorated: Vec<(Vec<Value>, R)> = records
            .into_iter()
            .map(|record| {
                let keys = self
                    .keys
                    .iter()
                    .map(|key| PathResolver::resolve(&record, &key.field).into_value())
                    .collect();
                (keys, record)
            })
            .collect();

        decorated.sort_by(|(a, _), (b, _)| self.compare_keys(a, b));
        debug!(records = decorated.len(), keys = self.keys.len(), "sorted records");
        decorated.into_iter().map(|(_, record)| record).collect()
    }

    fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        self.keys
            .iter()
            .zip(a.iter().zip(b))
            .map(|(key, (a, b))| key.compare(a, b))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}
