//! Distinct rows and field projection

use super::path::{FieldPath, PathResolver};
use super::record::{Record, Representation};
use super::value::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Keep the first record for each distinct value of `field`.
///
/// Values are compared by display string, null as `"null"`. Map-like and
/// dynamic records without the path's root member are dropped.
pub fn distinct<R: Record>(records: Vec<R>, field: &str) -> Vec<R> {
    let path = FieldPath::parse(field);
    let Some(root) = path.root().map(str::to_string) else {
        return records;
    };

    let before = records.len();
    let mut seen = HashSet::new();
    let kept: Vec<R> = records
        .into_iter()
        .filter(|record| {
            if record.representation() != Representation::Static && record.member(&root).is_none() {
                return false;
            }
            let value = PathResolver::resolve(record, &path).into_value();
            let key = if value.is_null() {
                "null".to_string()
            } else {
                value.to_string()
            };
            seen.insert(key)
        })
        .collect();

    debug!(field = %field, before, after = kept.len(), "distinct");
    kept
}

/// Project each record onto `fields`, keyed by the full path
pub fn select<R: Record>(records: &[R], fields: &[String]) -> Vec<Value> {
    let paths: Vec<FieldPath> = fields.iter().map(|f| FieldPath::parse(f)).collect();
    records
        .iter()
        .map(|record| {
            let projected: BTreeMap<String, Value> = paths
                .iter()
                .map(|path| {
                    let value = PathResolver::resolve(record, path).into_value();
                    (path.to_string(), value)
                })
                .collect();
            Value::Object(projected)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_distinct_keeps_first() {
        let rows = vec![
            json!({"OrderID": 1, "CustomerID": "ALFKI"}),
            json!({"OrderID": 2, "CustomerID": "ANTON"}),
            json!({"OrderID": 3, "CustomerID": "ALFKI"}),
            json!({"OrderID": 4, "CustomerID": null}),
            json!({"OrderID": 5}),
            json!({"OrderID": 6, "CustomerID": null}),
        ];
        let ids: Vec<i64> = distinct(rows, "CustomerID")
            .iter()
            .filter_map(|r| r["OrderID"].as_i64())
            .collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn test_select_projects_paths() {
        let rows = vec![json!({"OrderID": 1, "Address": {"ShipCity": "Berlin"}, "Freight": 2.5})];
        let fields = vec!["OrderID".to_string(), "Address.ShipCity".to_string()];
        let projected = select(&rows, &fields);
        assert_eq!(projected[0].to_json(), json!({"OrderID": 1, "Address.ShipCity": "Berlin"}));
    }
}
