//! Filter clauses and predicate construction
//!
//! A filter is a tree of [`FilterClause`]s. [`PredicateBuilder`] compiles the
//! tree once per record set into a [`Predicate`]: field types are resolved
//! and filter literals coerced at build time, so evaluation per record is a
//! path read plus a comparison.

use super::coercion::{coerce_for_comparison, resolve_enum};
use super::path::{FieldPath, PathResolver, Resolved};
use super::record::Record;
use super::type_resolver::TypeResolver;
use super::value::{FieldKind, TypeInfo, Value};
use crate::config::ShapingConfig;
use crate::error::{common, QueryError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    StartsWith,
    EndsWith,
    Contains,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equal",
            Operator::NotEquals => "notequal",
            Operator::LessThan => "lessthan",
            Operator::LessThanOrEqual => "lessthanorequal",
            Operator::GreaterThan => "greaterthan",
            Operator::GreaterThanOrEqual => "greaterthanorequal",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
            Operator::Contains => "contains",
        }
    }

    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::LessThan
                | Operator::LessThanOrEqual
                | Operator::GreaterThan
                | Operator::GreaterThanOrEqual
        )
    }

    /// Whether `field <op> value` holds given `field.cmp(value)`
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Operator::LessThan => ordering == Ordering::Less,
            Operator::LessThanOrEqual => ordering != Ordering::Greater,
            Operator::GreaterThan => ordering == Ordering::Greater,
            Operator::GreaterThanOrEqual => ordering != Ordering::Less,
            Operator::Equals => ordering == Ordering::Equal,
            Operator::NotEquals => ordering != Ordering::Equal,
            _ => false,
        }
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    /// Case-insensitive; accepts the grid's short names and the full names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" | "equals" => Ok(Operator::Equals),
            "notequal" | "notequals" => Ok(Operator::NotEquals),
            "lessthan" => Ok(Operator::LessThan),
            "lessthanorequal" => Ok(Operator::LessThanOrEqual),
            "greaterthan" => Ok(Operator::GreaterThan),
            "greaterthanorequal" => Ok(Operator::GreaterThanOrEqual),
            "startswith" => Ok(Operator::StartsWith),
            "endswith" => Ok(Operator::EndsWith),
            "contains" => Ok(Operator::Contains),
            _ => Err(common::unknown_operator(s, None)),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How sibling clauses combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Joiner {
    #[default]
    And,
    Or,
}

impl FromStr for Joiner {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "and" => Ok(Joiner::And),
            "or" => Ok(Joiner::Or),
            _ => Err(common::unknown_joiner(s)),
        }
    }
}

/// A single field comparison
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleClause {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    pub ignore_case: bool,
}

/// A filter tree node
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    Simple(SimpleClause),
    Composite {
        joiner: Joiner,
        clauses: Vec<FilterClause>,
    },
}

impl FilterClause {
    /// Case-insensitive simple clause
    pub fn simple(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        FilterClause::Simple(SimpleClause {
            field: field.into(),
            operator,
            value: value.into(),
            ignore_case: true,
        })
    }

    /// Case-sensitive simple clause
    pub fn exact(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        FilterClause::Simple(SimpleClause {
            field: field.into(),
            operator,
            value: value.into(),
            ignore_case: false,
        })
    }

    pub fn and(clauses: Vec<FilterClause>) -> Self {
        FilterClause::Composite {
            joiner: Joiner::And,
            clauses,
        }
    }

    pub fn or(clauses: Vec<FilterClause>) -> Self {
        FilterClause::Composite {
            joiner: Joiner::Or,
            clauses,
        }
    }
}

type Test = Box<dyn Fn(&dyn Record) -> bool + Send + Sync>;

/// A compiled boolean test over one record
pub struct Predicate {
    test: Test,
}

impl Predicate {
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&dyn Record) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Box::new(test),
        }
    }

    pub fn always(result: bool) -> Self {
        Self::new(move |_| result)
    }

    pub fn never() -> Self {
        Self::always(false)
    }

    pub fn evaluate<R: Record>(&self, record: &R) -> bool {
        (self.test)(record)
    }

    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::new(move |r| (self.test)(r) && (other.test)(r))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::new(move |r| (self.test)(r) || (other.test)(r))
    }

    /// Fold left to right: the first predicate seeds the accumulator, each
    /// later one joins with `joiner`. An empty list matches everything.
    pub fn combine(joiner: Joiner, predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut predicates = predicates.into_iter();
        let Some(first) = predicates.next() else {
            return Predicate::always(true);
        };
        predicates.fold(first, |acc, next| match joiner {
            Joiner::And => acc.and(next),
            Joiner::Or => acc.or(next),
        })
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").finish_non_exhaustive()
    }
}

/// Where a simple clause came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClauseSource {
    Filter,
    Search,
}

/// Filter literal after coercion to the field type
#[derive(Debug, Clone)]
enum Comparand {
    Typed(Value),
    /// Coercion failed; compare the field's text against the raw literal
    Text(String),
    /// The literal names no member of the field's enum: nothing equals it
    NoMatch,
}

/// Compiles filter trees against one record set
pub struct PredicateBuilder<'a> {
    pub(crate) types: &'a TypeResolver,
    pub(crate) config: &'a ShapingConfig,
}

impl<'a> PredicateBuilder<'a> {
    pub fn new(types: &'a TypeResolver, config: &'a ShapingConfig) -> Self {
        Self { types, config }
    }

    /// Compile one clause; composites combine their children with their own joiner
    pub fn build<R: Record>(&self, records: &[R], clause: &FilterClause) -> Predicate {
        match clause {
            FilterClause::Simple(simple) => self.build_simple(records, simple),
            FilterClause::Composite { joiner, clauses } => self.build_all(records, clauses, *joiner),
        }
    }

    /// Compile a list of sibling clauses joined by `joiner`
    pub fn build_all<R: Record>(&self, records: &[R], clauses: &[FilterClause], joiner: Joiner) -> Predicate {
        Predicate::combine(joiner, clauses.iter().map(|c| self.build(records, c)))
    }

    pub fn build_simple<R: Record>(&self, records: &[R], clause: &SimpleClause) -> Predicate {
        self.compile(records, clause, ClauseSource::Filter)
    }

    pub(crate) fn compile<R: Record>(&self, records: &[R], clause: &SimpleClause, source: ClauseSource) -> Predicate {
        let path = FieldPath::parse(&clause.field);
        let Some(field_type) = self.types.resolve_field_type(records, &path) else {
            debug!(field = %clause.field, "filter field does not resolve, clause matches nothing");
            return Predicate::never();
        };

        let comparison = Comparison {
            comparand: self.comparand(clause, &field_type, source),
            path,
            operator: clause.operator,
            ignore_case: clause.ignore_case,
            field_type,
            blank_marker: self.config.blank_marker.clone(),
        };
        Predicate::new(move |record| comparison.test(record))
    }

    fn comparand(&self, clause: &SimpleClause, field_type: &TypeInfo, source: ClauseSource) -> Comparand {
        if let Some(descriptor) = TypeResolver::resolve_enum_underlying_type(field_type) {
            if clause.value.is_null() {
                return Comparand::Typed(Value::Null);
            }
            return match resolve_enum(&clause.value, descriptor) {
                Some(value) => Comparand::Typed(Value::Enum(value)),
                None => {
                    debug!(
                        field = %clause.field,
                        value = %clause.value,
                        "no such enum member, clause matches nothing"
                    );
                    Comparand::NoMatch
                }
            };
        }
        match coerce_for_comparison(&clause.value, field_type) {
            Ok(value) => Comparand::Typed(value),
            Err(err) => {
                match source {
                    ClauseSource::Filter => warn!(
                        field = %clause.field,
                        error = %err,
                        "filter value does not fit the field type, comparing as text"
                    ),
                    // text keys against typed fields are routine for search
                    ClauseSource::Search => debug!(
                        field = %clause.field,
                        error = %err,
                        "search key does not fit the field type, comparing as text"
                    ),
                }
                Comparand::Text(clause.value.to_string())
            }
        }
    }
}

/// One compiled simple clause
struct Comparison {
    path: FieldPath,
    operator: Operator,
    ignore_case: bool,
    field_type: TypeInfo,
    comparand: Comparand,
    blank_marker: String,
}

impl Comparison {
    fn test(&self, record: &dyn Record) -> bool {
        let (field, intermediate_null) = match PathResolver::resolve(record, &self.path) {
            Resolved::Missing => return false,
            Resolved::IntermediateNull => (Value::Null, true),
            Resolved::Value(value) => (value, false),
        };

        match &self.comparand {
            Comparand::NoMatch => self.operator == Operator::NotEquals,
            Comparand::Text(text) => self.test_text(&field, text, intermediate_null),
            Comparand::Typed(value) if self.field_type.kind == FieldKind::Unknown => {
                // no sampled type: fit the literal to this record's value
                let kind = field.kind().unwrap_or(FieldKind::Unknown);
                match coerce_for_comparison(value, &TypeInfo::of(kind)) {
                    Ok(coerced) => self.test_typed(kind, &field, &coerced, intermediate_null),
                    Err(_) => self.test_text(&field, &value.to_string(), intermediate_null),
                }
            }
            Comparand::Typed(value) => {
                self.test_typed(self.field_type.kind, &field, value, intermediate_null)
            }
        }
    }

    fn test_text(&self, field: &Value, text: &str, intermediate_null: bool) -> bool {
        let field = if field.is_null() {
            Value::Null
        } else {
            Value::String(field.to_string())
        };
        let text = Value::String(text.to_string());
        self.test_typed(FieldKind::String, &field, &text, intermediate_null)
    }

    fn test_typed(&self, kind: FieldKind, field: &Value, value: &Value, intermediate_null: bool) -> bool {
        let date_only = kind.is_date() && self.field_type.nullable && value.is_midnight();

        match self.operator {
            Operator::Equals => self.equals(kind, field, value, date_only),
            Operator::NotEquals => !self.equals(kind, field, value, date_only),
            op if op.is_ordering() => {
                if intermediate_null || field.is_null() || value.is_null() {
                    return false;
                }
                let ordering = if date_only {
                    field
                        .date_part()
                        .zip(value.date_part())
                        .map(|(a, b)| a.cmp(&b))
                } else if kind == FieldKind::String && self.ignore_case {
                    Some(field.to_string().to_lowercase().cmp(&value.to_string().to_lowercase()))
                } else {
                    field.compare(value)
                };
                ordering.is_some_and(|o| op.accepts(o))
            }
            op => {
                // starts/ends-with read through a null intermediate as text
                if op == Operator::Contains && intermediate_null {
                    return false;
                }
                let (haystack, needle) = self.string_operands(kind, field, value);
                match op {
                    Operator::StartsWith => haystack.starts_with(&needle),
                    Operator::EndsWith => haystack.ends_with(&needle),
                    _ => haystack.contains(&needle),
                }
            }
        }
    }

    fn equals(&self, kind: FieldKind, field: &Value, value: &Value, date_only: bool) -> bool {
        if kind == FieldKind::String && self.ignore_case {
            let fallback = if value.is_null() {
                self.blank_marker.as_str()
            } else {
                ""
            };
            let lhs = if field.is_null() {
                fallback.to_string()
            } else {
                field.to_string()
            };
            let rhs = if value.is_null() {
                self.blank_marker.clone()
            } else {
                value.to_string()
            };
            return lhs.to_lowercase() == rhs.to_lowercase();
        }

        match (field.is_null(), value.is_null()) {
            (true, true) => true,
            (true, false) | (false, true) => false,
            (false, false) if date_only => field.date_part() == value.date_part(),
            (false, false) => field.loosely_eq(value),
        }
    }

    fn string_operands(&self, kind: FieldKind, field: &Value, value: &Value) -> (String, String) {
        let (haystack, needle) = if kind == FieldKind::String && value.is_null() {
            let haystack = if field.is_null() {
                self.blank_marker.clone()
            } else {
                field.to_string()
            };
            (haystack, self.blank_marker.clone())
        } else {
            (field.to_string(), value.to_string())
        };

        if self.ignore_case {
            (haystack.to_lowercase(), needle.to_lowercase())
        } else {
            (haystack, needle)
        }
    }
}
