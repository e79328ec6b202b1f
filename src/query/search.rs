//! Search clauses
//!
//! A search matches one key against several fields: any field satisfying
//! the operator satisfies the clause. Multiple clauses must all hold.

use super::coercion::resolve_enum;
use super::filter::{ClauseSource, Joiner, Operator, Predicate, PredicateBuilder, SimpleClause};
use super::path::FieldPath;
use super::record::Record;
use super::type_resolver::TypeResolver;
use super::value::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchClause {
    /// Fields to search; empty searches every member of the first record
    pub fields: Vec<String>,
    pub key: Value,
    pub operator: Operator,
    pub ignore_case: bool,
}

impl SearchClause {
    /// Case-insensitive `contains` search
    pub fn new<I, S>(fields: I, key: impl Into<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            key: key.into(),
            operator: Operator::Contains,
            ignore_case: true,
        }
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }
}

impl PredicateBuilder<'_> {
    /// OR of one simple clause per searched field.
    ///
    /// Enum fields are skipped when the key names no member of the enum, so
    /// a text search never matches an enum by its numeric value by accident.
    pub fn build_search<R: Record>(&self, records: &[R], clause: &SearchClause) -> Predicate {
        let fields = if clause.fields.is_empty() {
            records.first().map(|r| r.member_names()).unwrap_or_default()
        } else {
            clause.fields.clone()
        };

        let predicates: Vec<Predicate> = fields
            .into_iter()
            .filter(|field| self.searchable(records, field, &clause.key))
            .map(|field| {
                let simple = SimpleClause {
                    field,
                    operator: clause.operator,
                    value: clause.key.clone(),
                    ignore_case: clause.ignore_case,
                };
                self.compile(records, &simple, ClauseSource::Search)
            })
            .collect();

        if predicates.is_empty() {
            debug!(key = %clause.key, "search has no searchable fields, matches nothing");
            return Predicate::never();
        }
        Predicate::combine(Joiner::Or, predicates)
    }

    /// AND of every search clause
    pub fn build_searches<R: Record>(&self, records: &[R], clauses: &[SearchClause]) -> Predicate {
        Predicate::combine(Joiner::And, clauses.iter().map(|c| self.build_search(records, c)))
    }

    fn searchable<R: Record>(&self, records: &[R], field: &str, key: &Value) -> bool {
        let field_type = self.types.resolve_field_type(records, &FieldPath::parse(field));
        match field_type.as_ref().and_then(TypeResolver::resolve_enum_underlying_type) {
            Some(descriptor) => resolve_enum(key, descriptor).is_some(),
            None => true,
        }
    }
}
