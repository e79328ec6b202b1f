//! Aggregates over a field
//!
//! Sum and average pick their arithmetic from the field's resolved numeric
//! kind through a fixed dispatch table. 16-bit integer fields go through the
//! 32-bit operations.

use super::filter::{Operator, PredicateBuilder, SimpleClause};
use super::path::{FieldPath, PathResolver};
use super::record::Record;
use super::type_resolver::TypeResolver;
use super::value::{FieldKind, Value};
use crate::config::ShapingConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateKind {
    Count,
    Sum,
    Average,
    Min,
    Max,
    TrueCount,
    FalseCount,
    /// Kept so the pipeline can report and skip it
    Unsupported(String),
}

impl AggregateKind {
    /// Case-insensitive; unknown names become [`AggregateKind::Unsupported`]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "count" => AggregateKind::Count,
            "sum" => AggregateKind::Sum,
            "average" => AggregateKind::Average,
            "min" => AggregateKind::Min,
            "max" => AggregateKind::Max,
            "truecount" => AggregateKind::TrueCount,
            "falsecount" => AggregateKind::FalseCount,
            _ => AggregateKind::Unsupported(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AggregateKind::Count => "Count",
            AggregateKind::Sum => "Sum",
            AggregateKind::Average => "Average",
            AggregateKind::Min => "Min",
            AggregateKind::Max => "Max",
            AggregateKind::TrueCount => "TrueCount",
            AggregateKind::FalseCount => "FalseCount",
            AggregateKind::Unsupported(name) => name,
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateSpec {
    pub field: String,
    pub kind: AggregateKind,
}

impl AggregateSpec {
    pub fn new(field: impl Into<String>, kind: AggregateKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    /// Key in a group's aggregate map: `"Freight - Sum"`
    pub fn group_label(&self) -> String {
        format!("{} - {}", self.field, self.kind.name())
    }

    /// Key in the result envelope's aggregate map: `"Freight - sum"`
    pub fn label(&self) -> String {
        format!("{} - {}", self.field, self.kind.name().to_lowercase())
    }
}

/// Arithmetic families with their own sum and average
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumericKind {
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
}

impl NumericKind {
    fn of(kind: FieldKind) -> Option<Self> {
        match kind {
            FieldKind::Int16 | FieldKind::Int32 => Some(NumericKind::Int32),
            FieldKind::Int64 => Some(NumericKind::Int64),
            FieldKind::Float32 => Some(NumericKind::Float32),
            FieldKind::Float64 => Some(NumericKind::Float64),
            FieldKind::Decimal => Some(NumericKind::Decimal),
            _ => None,
        }
    }
}

/// Reducers over the non-null values of one field; `None` means overflow
struct NumericOps {
    sum: fn(&[Value]) -> Option<Value>,
    average: fn(&[Value]) -> Option<Value>,
}

fn numeric_ops(kind: NumericKind) -> NumericOps {
    match kind {
        NumericKind::Int32 => NumericOps {
            sum: sum_int32,
            average: average_integral,
        },
        NumericKind::Int64 => NumericOps {
            sum: sum_int64,
            average: average_integral,
        },
        NumericKind::Float32 => NumericOps {
            sum: sum_float32,
            average: average_float32,
        },
        NumericKind::Float64 => NumericOps {
            sum: sum_float64,
            average: average_float64,
        },
        NumericKind::Decimal => NumericOps {
            sum: sum_decimal,
            average: average_decimal,
        },
    }
}

fn sum_int32(values: &[Value]) -> Option<Value> {
    values
        .iter()
        .filter_map(|v| v.as_i64().and_then(|v| i32::try_from(v).ok()))
        .try_fold(0i32, i32::checked_add)
        .map(Value::Int32)
}

fn sum_int64(values: &[Value]) -> Option<Value> {
    values
        .iter()
        .filter_map(Value::as_i64)
        .try_fold(0i64, i64::checked_add)
        .map(Value::Int64)
}

fn sum_float32(values: &[Value]) -> Option<Value> {
    let sum: f32 = values.iter().filter_map(Value::as_f64).map(|v| v as f32).sum();
    Some(Value::Float32(sum))
}

fn sum_float64(values: &[Value]) -> Option<Value> {
    Some(Value::Float64(values.iter().filter_map(Value::as_f64).sum()))
}

fn sum_decimal(values: &[Value]) -> Option<Value> {
    values
        .iter()
        .filter_map(Value::as_decimal)
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .map(Value::Decimal)
}

fn average_integral(values: &[Value]) -> Option<Value> {
    let ints: Vec<i64> = values.iter().filter_map(Value::as_i64).collect();
    if ints.is_empty() {
        return Some(Value::Null);
    }
    let sum: i128 = ints.iter().map(|v| i128::from(*v)).sum();
    Some(Value::Float64(sum as f64 / ints.len() as f64))
}

fn average_float32(values: &[Value]) -> Option<Value> {
    let floats: Vec<f32> = values.iter().filter_map(Value::as_f64).map(|v| v as f32).collect();
    if floats.is_empty() {
        return Some(Value::Null);
    }
    Some(Value::Float32(floats.iter().sum::<f32>() / floats.len() as f32))
}

fn average_float64(values: &[Value]) -> Option<Value> {
    let floats: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    if floats.is_empty() {
        return Some(Value::Null);
    }
    Some(Value::Float64(floats.iter().sum::<f64>() / floats.len() as f64))
}

fn average_decimal(values: &[Value]) -> Option<Value> {
    let decimals: Vec<Decimal> = values.iter().filter_map(Value::as_decimal).collect();
    if decimals.is_empty() {
        return Some(Value::Null);
    }
    let sum = decimals
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))?;
    sum.checked_div(Decimal::from(decimals.len())).map(Value::Decimal)
}

/// Computes aggregates for one record set
pub struct AggregateEngine<'a> {
    types: &'a TypeResolver,
    config: &'a ShapingConfig,
}

impl<'a> AggregateEngine<'a> {
    pub fn new(types: &'a TypeResolver, config: &'a ShapingConfig) -> Self {
        Self { types, config }
    }

    /// One aggregate; `None` when the kind is unsupported or the field does
    /// not resolve to something the kind applies to
    pub fn aggregate<R: Record>(&self, records: &[R], spec: &AggregateSpec) -> Option<Value> {
        match &spec.kind {
            AggregateKind::Count => Some(Value::Int64(records.len() as i64)),
            AggregateKind::TrueCount => Some(self.count_matching(records, &spec.field, true)),
            AggregateKind::FalseCount => Some(self.count_matching(records, &spec.field, false)),
            AggregateKind::Unsupported(name) => {
                warn!(field = %spec.field, kind = %name, "unsupported aggregate omitted");
                None
            }
            kind => self.reduce(records, &spec.field, kind),
        }
    }

    /// Every aggregate keyed by [`AggregateSpec::label`]; failed aggregates
    /// are left out
    pub fn aggregate_all<R: Record>(&self, records: &[R], specs: &[AggregateSpec]) -> BTreeMap<String, Value> {
        if records.is_empty() {
            return BTreeMap::new();
        }
        specs
            .iter()
            .filter_map(|spec| Some((spec.label(), self.aggregate(records, spec)?)))
            .collect()
    }

    /// Per-group map keyed by [`AggregateSpec::group_label`]
    pub fn group_aggregates<R: Record>(&self, records: &[R], specs: &[AggregateSpec]) -> BTreeMap<String, Value> {
        specs
            .iter()
            .filter_map(|spec| Some((spec.group_label(), self.aggregate(records, spec)?)))
            .collect()
    }

    fn count_matching<R: Record>(&self, records: &[R], field: &str, expected: bool) -> Value {
        let clause = SimpleClause {
            field: field.to_string(),
            operator: Operator::Equals,
            value: Value::Bool(expected),
            ignore_case: true,
        };
        let predicate = PredicateBuilder::new(self.types, self.config).build_simple(records, &clause);
        Value::Int64(records.iter().filter(|r| predicate.evaluate(*r)).count() as i64)
    }

    fn reduce<R: Record>(&self, records: &[R], field: &str, kind: &AggregateKind) -> Option<Value> {
        let path = FieldPath::parse(field);
        let Some(field_type) = self.types.resolve_field_type(records, &path) else {
            warn!(field = %field, kind = %kind, "aggregate field does not resolve, omitted");
            return None;
        };

        let values: Vec<Value> = records
            .iter()
            .map(|r| PathResolver::resolve(r, &path).into_value())
            .filter(|v| !v.is_null())
            .collect();

        match kind {
            AggregateKind::Min => Some(values.iter().min_by(|a, b| a.sort_cmp(b)).cloned().unwrap_or_default()),
            AggregateKind::Max => Some(values.iter().max_by(|a, b| a.sort_cmp(b)).cloned().unwrap_or_default()),
            _ => {
                // a sampled integer type must not truncate later fractions
                let field_kind = values
                    .iter()
                    .filter_map(Value::kind)
                    .fold(field_type.kind, |kind, seen| match kind {
                        FieldKind::Unknown => seen,
                        kind => kind.widen(seen),
                    });
                let Some(numeric) = NumericKind::of(field_kind) else {
                    debug!(field = %field, kind = field_kind.name(), "aggregate needs a numeric field");
                    return None;
                };
                let ops = numeric_ops(numeric);
                let reducer = if *kind == AggregateKind::Sum {
                    ops.sum
                } else {
                    ops.average
                };
                let result = reducer(&values);
                if result.is_none() {
                    warn!(field = %field, kind = %kind, "aggregate overflowed, omitted");
                }
                result
            }
        }
    }
}
