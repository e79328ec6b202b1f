//! Hierarchical grouping
//!
//! Grouping a flat record list produces one level of groups in first-seen
//! key order. Grouping an already grouped set adds one nesting level under
//! every leaf group, so grouping by several fields is a fold of single-field
//! groupings.

use super::aggregate::{AggregateEngine, AggregateSpec};
use super::path::{FieldPath, PathResolver};
use super::record::Record;
use super::type_resolver::TypeResolver;
use super::value::Value;
use crate::config::ShapingConfig;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

static NUMERIC_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([NnFf])(\d{0,2})$").expect("Valid regex pattern"));

/// Date pattern tokens, longest first
const DATE_TOKENS: &[(&str, &str)] = &[
    ("yyyy", "%Y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("MM", "%m"),
    ("dd", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("fff", "%3f"),
    ("tt", "%p"),
    ("yy", "%y"),
];

/// Per-request grouping switches
#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    /// Computed for every group
    pub aggregates: Vec<AggregateSpec>,
    /// Leave `items` empty unless aggregates need them
    pub lazy_load: bool,
    /// Keep a copy of every group's members in `grouped_data`
    pub lazy_expand_all: bool,
    /// Display format per field applied to group keys
    pub formats: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult<R> {
    pub key: Value,
    pub field: String,
    pub level: usize,
    pub count: usize,
    pub items: Vec<R>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subgroups: Vec<GroupResult<R>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub grouped_data: Vec<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregates: Option<BTreeMap<String, Value>>,
}

impl<R> GroupResult<R> {
    pub fn is_leaf(&self) -> bool {
        self.subgroups.is_empty()
    }

    /// Leaf groups below (or at) this group, depth first
    pub fn leaves(&self) -> Vec<&GroupResult<R>> {
        if self.is_leaf() {
            return vec![self];
        }
        self.subgroups.iter().flat_map(GroupResult::leaves).collect()
    }
}

/// Top-level groups plus nesting bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSet<R> {
    pub level: usize,
    /// Levels added below the first by regrouping
    pub child_levels: usize,
    pub groups: Vec<GroupResult<R>>,
}

impl<R> GroupSet<R> {
    pub fn depth(&self) -> usize {
        self.level + self.child_levels
    }
}

/// Flat or grouped record data
#[derive(Debug, Clone, PartialEq)]
pub enum DataSet<R> {
    Records(Vec<R>),
    Grouped(GroupSet<R>),
}

impl<R> DataSet<R> {
    /// Records, or top-level groups when grouped
    pub fn len(&self) -> usize {
        match self {
            DataSet::Records(records) => records.len(),
            DataSet::Grouped(set) => set.groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, DataSet::Grouped(_))
    }

    pub fn records(&self) -> Option<&[R]> {
        match self {
            DataSet::Records(records) => Some(records),
            DataSet::Grouped(_) => None,
        }
    }

    pub fn groups(&self) -> Option<&[GroupResult<R>]> {
        match self {
            DataSet::Records(_) => None,
            DataSet::Grouped(set) => Some(&set.groups),
        }
    }
}

impl<R: Serialize> Serialize for DataSet<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DataSet::Records(records) => records.serialize(serializer),
            DataSet::Grouped(set) => set.groups.serialize(serializer),
        }
    }
}

pub struct GroupingEngine<'a> {
    types: &'a TypeResolver,
    config: &'a ShapingConfig,
}

impl<'a> GroupingEngine<'a> {
    pub fn new(types: &'a TypeResolver, config: &'a ShapingConfig) -> Self {
        Self { types, config }
    }

    /// Group by each field in turn
    pub fn group_by<R: Record + Clone>(&self, records: Vec<R>, fields: &[String], options: &GroupOptions) -> DataSet<R> {
        fields
            .iter()
            .fold(DataSet::Records(records), |data, field| self.group(data, field, options))
    }

    /// Add one grouping level by `field`.
    ///
    /// Empty flat input comes back unchanged rather than as an empty group set.
    pub fn group<R: Record + Clone>(&self, data: DataSet<R>, field: &str, options: &GroupOptions) -> DataSet<R> {
        match data {
            DataSet::Records(records) if records.is_empty() => DataSet::Records(records),
            DataSet::Records(records) => {
                let groups = self.partition(records, field, 1, options);
                debug!(field = %field, groups = groups.len(), "grouped records");
                DataSet::Grouped(GroupSet {
                    level: 1,
                    child_levels: 0,
                    groups,
                })
            }
            DataSet::Grouped(mut set) => {
                for group in &mut set.groups {
                    self.regroup(group, field, options);
                }
                set.child_levels += 1;
                debug!(field = %field, depth = set.depth(), "regrouped groups");
                DataSet::Grouped(set)
            }
        }
    }

    fn regroup<R: Record + Clone>(&self, group: &mut GroupResult<R>, field: &str, options: &GroupOptions) {
        if !group.is_leaf() {
            for subgroup in &mut group.subgroups {
                self.regroup(subgroup, field, options);
            }
            return;
        }
        let members = if group.items.is_empty() {
            group.grouped_data.clone()
        } else {
            std::mem::take(&mut group.items)
        };
        group.subgroups = self.partition(members, field, group.level + 1, options);
    }

    fn partition<R: Record + Clone>(
        &self,
        records: Vec<R>,
        field: &str,
        level: usize,
        options: &GroupOptions,
    ) -> Vec<GroupResult<R>> {
        let path = FieldPath::parse(field);
        let format = options.formats.get(field);

        let mut partitions: IndexMap<String, (Value, Vec<R>)> = IndexMap::new();
        for record in records {
            let raw = PathResolver::resolve(&record, &path).into_value();
            let key = self.group_key(raw, format.map(String::as_str));
            // the tag keeps 1 and "1" apart
            let identity = format!("{}:{}", key.type_tag(), key);
            partitions
                .entry(identity)
                .or_insert_with(|| (key, Vec::new()))
                .1
                .push(record);
        }

        partitions
            .into_values()
            .map(|(key, members)| self.build_group(key, field, level, members, options))
            .collect()
    }

    fn group_key(&self, raw: Value, format: Option<&str>) -> Value {
        if raw.is_null() {
            return Value::String(self.config.null_group_key.clone());
        }
        match format {
            Some(format) => Value::String(format_value(&raw, format)),
            None => raw,
        }
    }

    fn build_group<R: Record + Clone>(
        &self,
        key: Value,
        field: &str,
        level: usize,
        members: Vec<R>,
        options: &GroupOptions,
    ) -> GroupResult<R> {
        let aggregates = (!options.aggregates.is_empty()).then(|| {
            AggregateEngine::new(self.types, self.config).group_aggregates(&members, &options.aggregates)
        });
        let grouped_data = if options.lazy_load || options.lazy_expand_all {
            members.clone()
        } else {
            Vec::new()
        };
        let count = members.len();
        let items = if options.lazy_load && options.aggregates.is_empty() {
            Vec::new()
        } else {
            members
        };

        GroupResult {
            key,
            field: field.to_string(),
            level,
            count,
            items,
            subgroups: Vec::new(),
            grouped_data,
            aggregates,
        }
    }
}

/// Render a group key with a display format.
///
/// `N<p>` and `F<p>` give `p` decimals (default 2), `N` with thousands
/// separators. Anything else on a date value is a date pattern such as
/// `yyyy-MM-dd`. Other combinations fall back to the plain display string.
pub fn format_value(value: &Value, format: &str) -> String {
    if let Some(caps) = NUMERIC_FORMAT.captures(format) {
        if let Some(number) = value.as_f64() {
            let precision = caps
                .get(2)
                .and_then(|p| p.as_str().parse::<usize>().ok())
                .unwrap_or(2);
            let fixed = format!("{:.*}", precision, number);
            let grouped = caps[1].eq_ignore_ascii_case("n");
            return if grouped { group_thousands(&fixed) } else { fixed };
        }
    }

    let pattern = date_pattern(format);
    match value {
        Value::DateTime(dt) => dt.format(&pattern).to_string(),
        Value::DateTimeOffset(dt) => dt.format(&pattern).to_string(),
        _ => value.to_string(),
    }
}

fn date_pattern(format: &str) -> String {
    let mut pattern = String::with_capacity(format.len() * 2);
    let mut rest = format;
    while let Some(ch) = rest.chars().next() {
        if let Some((token, spec)) = DATE_TOKENS.iter().find(|(token, _)| rest.starts_with(token)) {
            pattern.push_str(spec);
            rest = &rest[token.len()..];
            continue;
        }
        if ch == '%' {
            pattern.push_str("%%");
        } else {
            pattern.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
    }
    pattern
}

fn group_thousands(fixed: &str) -> String {
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    let mut grouped = String::new();
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::aggregate::AggregateKind;
    use chrono::NaiveDate;
    use serde_json::json;

    fn rows() -> Vec<serde_json::Value> {
        vec![
            json!({"OrderID": 1, "CustomerID": "ALFKI", "ShipCountry": "Germany", "Freight": 10.0}),
            json!({"OrderID": 2, "CustomerID": "ANTON", "ShipCountry": "Mexico", "Freight": 20.0}),
            json!({"OrderID": 3, "CustomerID": "ALFKI", "ShipCountry": "Germany", "Freight": 5.0}),
            json!({"OrderID": 4, "CustomerID": null, "ShipCountry": "Mexico", "Freight": 1.0}),
            json!({"OrderID": 5, "CustomerID": "ANTON", "ShipCountry": "Germany", "Freight": 2.0}),
        ]
    }

    fn engine_group(fields: &[&str], options: &GroupOptions) -> DataSet<serde_json::Value> {
        let types = TypeResolver::new();
        let config = ShapingConfig::default();
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        GroupingEngine::new(&types, &config).group_by(rows(), &fields, options)
    }

    #[test]
    fn test_first_seen_key_order_and_null_key() {
        let data = engine_group(&["CustomerID"], &GroupOptions::default());
        let groups = data.groups().unwrap();
        let keys: Vec<String> = groups.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(keys, vec!["ALFKI", "ANTON", "null"]);
        assert_eq!(groups.iter().map(|g| g.count).sum::<usize>(), 5);
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[0].level, 1);
    }

    #[test]
    fn test_nested_grouping_keeps_counts() {
        let data = engine_group(&["ShipCountry", "CustomerID"], &GroupOptions::default());
        let DataSet::Grouped(set) = &data else {
            panic!("expected groups");
        };
        assert_eq!(set.child_levels, 1);
        assert_eq!(set.depth(), 2);
        for group in &set.groups {
            let nested: usize = group.subgroups.iter().map(|g| g.count).sum();
            assert_eq!(nested, group.count);
            assert!(group.subgroups.iter().all(|g| g.level == 2));
        }
        let germany = &set.groups[0];
        assert_eq!(germany.key, Value::from("Germany"));
        assert_eq!(germany.subgroups.len(), 2);
        assert_eq!(germany.leaves().len(), 2);
    }

    #[test]
    fn test_lazy_load_defers_items() {
        let options = GroupOptions {
            lazy_load: true,
            ..GroupOptions::default()
        };
        let data = engine_group(&["CustomerID"], &options);
        let groups = data.groups().unwrap();
        assert!(groups.iter().all(|g| g.items.is_empty()));
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].grouped_data.len(), 2);

        let nested = engine_group(&["ShipCountry", "CustomerID"], &options);
        let total: usize = nested.groups().unwrap()[0].subgroups.iter().map(|g| g.count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_group_aggregates() {
        let options = GroupOptions {
            aggregates: vec![AggregateSpec::new("Freight", AggregateKind::Sum)],
            lazy_load: true,
            ..GroupOptions::default()
        };
        let data = engine_group(&["CustomerID"], &options);
        let alfki = &data.groups().unwrap()[0];
        assert_eq!(alfki.items.len(), 2);
        assert_eq!(
            alfki.aggregates.as_ref().unwrap().get("Freight - Sum"),
            Some(&Value::Float64(15.0))
        );
    }

    #[test]
    fn test_empty_input_stays_flat() {
        let types = TypeResolver::new();
        let config = ShapingConfig::default();
        let data = GroupingEngine::new(&types, &config).group(
            DataSet::Records(Vec::<serde_json::Value>::new()),
            "CustomerID",
            &GroupOptions::default(),
        );
        assert_eq!(data, DataSet::Records(Vec::new()));
    }

    #[test]
    fn test_formatted_keys() {
        let mut options = GroupOptions::default();
        options.formats.insert("Freight".to_string(), "N1".to_string());
        let data = engine_group(&["Freight"], &options);
        assert_eq!(data.groups().unwrap()[0].key, Value::from("10.0"));

        assert_eq!(format_value(&Value::Float64(1234567.891), "N2"), "1,234,567.89");
        assert_eq!(format_value(&Value::Float64(-1234.4), "F0"), "-1234");
        let date = NaiveDate::from_ymd_opt(1996, 7, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_value(&Value::DateTime(date), "yyyy-MM-dd"), "1996-07-04");
        assert_eq!(format_value(&Value::DateTime(date), "dd/MMM/yy"), "04/Jul/96");
        assert_eq!(format_value(&Value::from("plain"), "N2"), "plain");
    }

    #[test]
    fn test_grouped_serializes_as_group_list() {
        let data = engine_group(&["CustomerID"], &GroupOptions::default());
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 3);
        assert_eq!(json[0]["key"], json!("ALFKI"));
        assert_eq!(json[0]["count"], json!(2));
        assert!(json[0].get("groupedData").is_none());
    }
}
