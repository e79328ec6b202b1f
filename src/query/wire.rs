//! Wire form of a query request
//!
//! Mirrors the JSON a data-grid client posts: camelCase keys, operator and
//! direction names as strings, nested `where` predicates. Conversion into a
//! [`QueryRequest`] validates every name and rejects malformed clauses.

use super::aggregate::{AggregateKind, AggregateSpec};
use super::filter::{FilterClause, Joiner, Operator, SimpleClause};
use super::request::QueryRequest;
use super::search::SearchClause;
use super::sorter::{SortDirection, SortKey};
use super::value::Value;
use crate::config::ShapingConfig;
use crate::error::{common, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireRequest {
    pub skip: Option<i64>,
    pub take: Option<i64>,
    pub requires_counts: bool,
    #[serde(rename = "where")]
    pub filters: Option<Vec<WireFilter>>,
    pub search: Option<Vec<WireSearch>>,
    pub sorted: Option<Vec<WireSort>>,
    pub group: Option<Vec<String>>,
    pub aggregates: Option<Vec<WireAggregate>>,
    pub is_lazy_load: bool,
    pub lazy_expand_all_group: bool,
    pub group_paging: bool,
    pub distinct: Option<String>,
    pub select: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireFilter {
    pub field: Option<String>,
    pub operator: Option<String>,
    pub value: serde_json::Value,
    pub ignore_case: Option<bool>,
    pub is_complex: bool,
    pub condition: Option<String>,
    pub predicates: Option<Vec<WireFilter>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireSearch {
    pub fields: Option<Vec<String>>,
    pub key: serde_json::Value,
    pub operator: Option<String>,
    pub ignore_case: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSort {
    pub name: String,
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAggregate {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl WireRequest {
    pub fn into_request(self, config: &ShapingConfig) -> Result<QueryRequest> {
        let filters = self.filters.unwrap_or_default();
        let joiner = match filters.first().and_then(|f| f.condition.as_deref()) {
            Some(condition) => condition.parse()?,
            None => Joiner::And,
        };
        let filters = filters
            .into_iter()
            .map(|f| f.into_clause(config))
            .collect::<Result<Vec<_>>>()?;

        let search = self
            .search
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.into_clause(config))
            .collect::<Result<Vec<_>>>()?;

        // the grid sends sort keys last-key-primary
        let mut sort = self
            .sorted
            .unwrap_or_default()
            .into_iter()
            .map(WireSort::into_key)
            .collect::<Result<Vec<_>>>()?;
        sort.reverse();

        let aggregates = self
            .aggregates
            .unwrap_or_default()
            .into_iter()
            .map(|a| AggregateSpec::new(a.field, AggregateKind::parse(&a.kind)))
            .collect();

        Ok(QueryRequest {
            filters,
            joiner,
            search,
            sort,
            group: self.group.unwrap_or_default(),
            skip: paging("skip", self.skip)?.unwrap_or(0),
            take: paging("take", self.take)?,
            aggregates,
            requires_counts: self.requires_counts,
            lazy_load: self.is_lazy_load,
            lazy_expand_all: self.lazy_expand_all_group,
            group_paging: self.group_paging,
            distinct: self.distinct.filter(|d| !d.trim().is_empty()),
            select: self.select.unwrap_or_default(),
            group_formats: Default::default(),
        })
    }
}

/// Negative values are errors; zero means "not set"
fn paging(name: &str, value: Option<i64>) -> Result<Option<usize>> {
    match value {
        None | Some(0) => Ok(None),
        Some(v) if v < 0 => Err(common::invalid_paging(name, v)),
        Some(v) => Ok(usize::try_from(v).ok()),
    }
}

impl WireFilter {
    fn into_clause(self, config: &ShapingConfig) -> Result<FilterClause> {
        let has_operator = self.operator.as_deref().is_some_and(|op| !op.trim().is_empty());
        let composite = self.is_complex || self.predicates.as_ref().is_some_and(|p| !p.is_empty());

        match (has_operator, composite) {
            (true, true) => Err(common::malformed_clause(
                "a clause cannot carry both an operator and nested predicates",
                self.field.as_deref(),
            )),
            (false, false) => Err(common::malformed_clause(
                "a clause needs an operator or nested predicates",
                self.field.as_deref(),
            )),
            (false, true) => {
                let joiner = match self.condition.as_deref() {
                    Some(condition) => condition.parse()?,
                    None => Joiner::And,
                };
                let clauses = self
                    .predicates
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| p.into_clause(config))
                    .collect::<Result<Vec<_>>>()?;
                Ok(FilterClause::Composite { joiner, clauses })
            }
            (true, false) => {
                let field = self
                    .field
                    .filter(|f| !f.trim().is_empty())
                    .ok_or_else(|| common::malformed_clause("a simple clause needs a field", None))?;
                let name = self.operator.unwrap_or_default();
                let operator: Operator = name
                    .parse()
                    .map_err(|_| common::unknown_operator(&name, Some(field.as_str())))?;
                Ok(FilterClause::Simple(SimpleClause {
                    field,
                    operator,
                    value: Value::from(self.value),
                    ignore_case: self.ignore_case.unwrap_or(config.default_ignore_case),
                }))
            }
        }
    }
}

impl WireSearch {
    fn into_clause(self, config: &ShapingConfig) -> Result<SearchClause> {
        let name = self
            .operator
            .filter(|op| !op.trim().is_empty())
            .unwrap_or_else(|| config.default_search_operator.clone());
        let operator: Operator = name.parse()?;
        Ok(SearchClause {
            fields: self.fields.unwrap_or_default(),
            key: Value::from(self.key),
            operator,
            ignore_case: self.ignore_case.unwrap_or(config.default_ignore_case),
        })
    }
}

impl WireSort {
    fn into_key(self) -> Result<SortKey> {
        let direction = match self.direction.as_deref() {
            Some(direction) => direction
                .parse()
                .map_err(|_| common::unknown_direction(direction, Some(self.name.as_str())))?,
            None => SortDirection::Ascending,
        };
        let mut key = SortKey::ascending(&self.name);
        key.direction = direction;
        Ok(key)
    }
}
