//! Query composition engine
//!
//! Compiles untyped, string-keyed query descriptors into typed operations
//! over records whose shape is only known at runtime, and runs them in a
//! fixed stage order:
//!
//! filter → search → sort → distinct → count → aggregates → page → group
//!
//! With `group_paging` set, grouping happens before paging and the page is
//! a page of groups.

pub mod aggregate;
pub mod coercion;
pub mod distinct;
pub mod filter;
pub mod grouping;
pub mod path;
pub mod record;
pub mod request;
pub mod search;
pub mod sorter;
pub mod type_resolver;
pub mod value;
pub mod wire;

pub use aggregate::{AggregateEngine, AggregateKind, AggregateSpec};
pub use coercion::{coerce, coerce_for_comparison, normalize_date_string, CoercionError};
pub use filter::{FilterClause, Joiner, Operator, Predicate, PredicateBuilder, SimpleClause};
pub use grouping::{DataSet, GroupOptions, GroupResult, GroupSet, GroupingEngine};
pub use path::{FieldPath, PathResolver, Resolved};
pub use record::{AccessError, Dynamic, DynamicObject, FieldValue, Member, Record, Representation};
pub use request::QueryRequest;
pub use search::SearchClause;
pub use sorter::{SortDirection, SortKey, Sorter};
pub use type_resolver::TypeResolver;
pub use value::{EnumDescriptor, EnumMember, EnumValue, FieldKind, TypeInfo, Value};
pub use wire::WireRequest;

use crate::config::ShapingConfig;
use crate::error::{QueryError, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use tracing::debug;

/// Pipeline output
///
/// Serializes to `{result, count?, aggregates?}`; grouped results also carry
/// the set's `level` and `childLevels`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<R> {
    pub result: DataSet<R>,
    /// Matching rows before paging (groups, when paging groups)
    pub count: Option<usize>,
    pub aggregates: Option<BTreeMap<String, Value>>,
}

impl<R: Serialize> Serialize for QueryResult<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("result", &self.result)?;
        if let Some(count) = self.count {
            map.serialize_entry("count", &count)?;
        }
        if let Some(aggregates) = &self.aggregates {
            map.serialize_entry("aggregates", aggregates)?;
        }
        if let DataSet::Grouped(set) = &self.result {
            map.serialize_entry("level", &set.level)?;
            map.serialize_entry("childLevels", &set.child_levels)?;
        }
        map.end()
    }
}

impl<R> QueryResult<R> {
    pub fn records(&self) -> Option<&[R]> {
        self.result.records()
    }

    pub fn groups(&self) -> Option<&[GroupResult<R>]> {
        self.result.groups()
    }
}

/// Runs query requests against record sets
#[derive(Debug, Clone, Default)]
pub struct QueryPipeline {
    config: ShapingConfig,
}

impl QueryPipeline {
    pub fn new(config: ShapingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShapingConfig {
        &self.config
    }

    /// Run every populated stage of `request` over `source`.
    ///
    /// The source is never modified; surviving records are cloned.
    pub fn execute<R: Record + Clone>(&self, source: &[R], request: &QueryRequest) -> QueryResult<R> {
        let types = TypeResolver::with_sample_limit(self.config.type_sample_limit);
        let predicates = PredicateBuilder::new(&types, &self.config);

        let mut records: Vec<R> = if request.filters.is_empty() {
            source.to_vec()
        } else {
            let predicate = predicates.build_all(source, &request.filters, request.joiner);
            source.iter().filter(|r| predicate.evaluate(*r)).cloned().collect()
        };
        debug!("Filtered {} records down to {}", source.len(), records.len());

        if !request.search.is_empty() {
            let predicate = predicates.build_searches(&records, &request.search);
            records.retain(|r| predicate.evaluate(r));
            debug!("Search kept {} records", records.len());
        }

        if !request.sort.is_empty() {
            records = request.sorter().sort(records);
        }

        if let Some(field) = &request.distinct {
            records = distinct::distinct(records, field);
        }

        let mut count = request.requires_counts.then_some(records.len());

        let aggregates = (!request.aggregates.is_empty()).then(|| {
            AggregateEngine::new(&types, &self.config).aggregate_all(&records, &request.aggregates)
        });

        let grouping = GroupingEngine::new(&types, &self.config);
        let result = if request.group.is_empty() {
            DataSet::Records(paginate(records, request.skip, request.take))
        } else if request.group_paging {
            match grouping.group_by(records, &request.group, &request.group_options()) {
                DataSet::Grouped(mut set) => {
                    if request.requires_counts {
                        count = Some(set.groups.len());
                    }
                    set.groups = paginate(set.groups, request.skip, request.take);
                    debug!("Paged to {} groups", set.groups.len());
                    DataSet::Grouped(set)
                }
                flat => flat,
            }
        } else {
            let page = paginate(records, request.skip, request.take);
            grouping.group_by(page, &request.group, &request.group_options())
        };

        QueryResult {
            result,
            count,
            aggregates,
        }
    }

    /// [`execute`](Self::execute) for callers that may hold no source or no
    /// request
    pub fn try_execute<R: Record + Clone>(
        &self,
        source: Option<&[R]>,
        request: Option<&QueryRequest>,
    ) -> Result<QueryResult<R>> {
        let source = source.ok_or_else(|| QueryError::argument_null("dataSource"))?;
        let request = request.ok_or_else(|| QueryError::argument_null("request"))?;
        Ok(self.execute(source, request))
    }

    /// Run a wire request over a JSON array.
    ///
    /// Flat results are projected onto the request's `select` fields when
    /// any are given.
    pub fn execute_json(
        &self,
        data: &serde_json::Value,
        request: &serde_json::Value,
    ) -> Result<QueryResult<serde_json::Value>> {
        let source = match data {
            serde_json::Value::Array(rows) => rows.as_slice(),
            serde_json::Value::Null => return Err(QueryError::argument_null("dataSource")),
            _ => {
                return Err(QueryError::argument_null("dataSource")
                    .with_context("the data source must be a JSON array"))
            }
        };
        if request.is_null() {
            return Err(QueryError::argument_null("request"));
        }

        let request = QueryRequest::from_json(request, &self.config)?;
        let mut output = self.execute(source, &request);

        if !request.select.is_empty() {
            if let DataSet::Records(rows) = &output.result {
                let projected = distinct::select(rows, &request.select);
                output.result = DataSet::Records(projected.iter().map(Value::to_json).collect());
            }
        }
        Ok(output)
    }
}

fn paginate<T>(items: Vec<T>, skip: usize, take: Option<usize>) -> Vec<T> {
    let rest = items.into_iter().skip(skip);
    match take {
        Some(take) => rest.take(take).collect(),
        None => rest.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    fn rows() -> serde_json::Value {
        json!([
            {"OrderID": 1, "CustomerID": "ALFKI", "Freight": 10.0, "Country": "Germany"},
            {"OrderID": 2, "CustomerID": "ANTON", "Freight": 20.0, "Country": "Mexico"},
            {"OrderID": 3, "CustomerID": "ALFKI", "Freight": 30.0, "Country": "Germany"},
            {"OrderID": 4, "CustomerID": "BLONP", "Freight": 40.0, "Country": "France"},
            {"OrderID": 5, "CustomerID": "ANTON", "Freight": 50.0, "Country": "Mexico"}
        ])
    }

    fn ids(result: &QueryResult<serde_json::Value>) -> Vec<i64> {
        result
            .records()
            .unwrap()
            .iter()
            .filter_map(|r| r["OrderID"].as_i64())
            .collect()
    }

    #[test]
    fn test_stage_order() {
        let pipeline = QueryPipeline::default();
        let result = pipeline
            .execute_json(
                &rows(),
                &json!({
                    "where": [{"field": "Freight", "operator": "greaterthan", "value": 15}],
                    "sorted": [{"name": "OrderID", "direction": "descending"}],
                    "skip": 1,
                    "take": 2,
                    "requiresCounts": true,
                    "aggregates": [{"field": "Freight", "type": "sum"}]
                }),
            )
            .unwrap();
        assert_eq!(ids(&result), vec![4, 3]);
        assert_eq!(result.count, Some(4));
        assert_eq!(
            result.aggregates.unwrap().get("Freight - sum"),
            Some(&Value::Float64(140.0))
        );
    }

    #[test]
    fn test_row_paging_then_grouping() {
        let pipeline = QueryPipeline::default();
        let result = pipeline
            .execute_json(&rows(), &json!({"group": ["Country"], "take": 3, "requiresCounts": true}))
            .unwrap();
        let groups = result.groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.iter().map(|g| g.count).sum::<usize>(), 3);
        assert_eq!(result.count, Some(5));
    }

    #[test]
    fn test_group_paging() {
        let pipeline = QueryPipeline::default();
        let result = pipeline
            .execute_json(
                &rows(),
                &json!({"group": ["Country"], "skip": 1, "take": 1, "groupPaging": true, "requiresCounts": true}),
            )
            .unwrap();
        let groups = result.groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, Value::from("Mexico"));
        assert_eq!(groups[0].count, 2);
        assert_eq!(result.count, Some(3));
    }

    #[test]
    fn test_select_and_distinct() {
        let pipeline = QueryPipeline::default();
        let result = pipeline
            .execute_json(&rows(), &json!({"distinct": "CustomerID", "select": ["CustomerID"]}))
            .unwrap();
        let rows = result.records().unwrap();
        assert_eq!(
            rows,
            &[json!({"CustomerID": "ALFKI"}), json!({"CustomerID": "ANTON"}), json!({"CustomerID": "BLONP"})]
        );
    }

    #[test]
    fn test_null_arguments_fail_fast() {
        let pipeline = QueryPipeline::default();
        let err = pipeline.execute_json(&serde_json::Value::Null, &json!({})).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ARGUMENT_NULL);
        let err = pipeline.execute_json(&json!({"a": 1}), &json!({})).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ARGUMENT_NULL);
        let err = pipeline.execute_json(&rows(), &serde_json::Value::Null).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ARGUMENT_NULL);

        let request = QueryRequest::new();
        assert!(pipeline.try_execute::<serde_json::Value>(None, Some(&request)).is_err());
        assert!(pipeline.try_execute::<serde_json::Value>(Some(&[][..]), None).is_err());
    }

    #[test]
    fn test_empty_source_with_grouping_stays_flat() {
        let pipeline = QueryPipeline::default();
        let result = pipeline
            .execute_json(&json!([]), &json!({"group": ["Country"], "requiresCounts": true, "aggregates": [{"field": "Freight", "type": "sum"}]}))
            .unwrap();
        assert_eq!(result.result, DataSet::Records(Vec::new()));
        assert_eq!(result.count, Some(0));
        assert_eq!(result.aggregates, Some(BTreeMap::new()));
    }
}
