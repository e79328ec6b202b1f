//! Typed query request

use super::aggregate::AggregateSpec;
use super::filter::{FilterClause, Joiner};
use super::grouping::GroupOptions;
use super::search::SearchClause;
use super::sorter::{SortDirection, SortKey, Sorter};
use super::wire::WireRequest;
use crate::config::ShapingConfig;
use crate::error::Result;
use std::collections::HashMap;

/// Everything one pipeline run does to a record set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Top-level filter clauses, combined with `joiner`
    pub filters: Vec<FilterClause>,
    pub joiner: Joiner,
    /// ANDed search clauses
    pub search: Vec<SearchClause>,
    /// First key primary
    pub sort: Vec<SortKey>,
    pub group: Vec<String>,
    pub skip: usize,
    pub take: Option<usize>,
    pub aggregates: Vec<AggregateSpec>,
    pub requires_counts: bool,
    pub lazy_load: bool,
    pub lazy_expand_all: bool,
    /// Page groups rather than rows when grouping
    pub group_paging: bool,
    pub distinct: Option<String>,
    pub select: Vec<String>,
    pub group_formats: HashMap<String, String>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a wire request
    pub fn from_json(json: &serde_json::Value, config: &ShapingConfig) -> Result<Self> {
        let wire: WireRequest = serde_json::from_value(json.clone())?;
        wire.into_request(config)
    }

    pub fn from_json_str(json: &str, config: &ShapingConfig) -> Result<Self> {
        let wire: WireRequest = serde_json::from_str(json)?;
        wire.into_request(config)
    }

    pub fn filter(mut self, clause: FilterClause) -> Self {
        self.filters.push(clause);
        self
    }

    pub fn with_joiner(mut self, joiner: Joiner) -> Self {
        self.joiner = joiner;
        self
    }

    pub fn search(mut self, clause: SearchClause) -> Self {
        self.search.push(clause);
        self
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group.push(field.into());
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }

    pub fn aggregate(mut self, spec: AggregateSpec) -> Self {
        self.aggregates.push(spec);
        self
    }

    pub fn with_counts(mut self) -> Self {
        self.requires_counts = true;
        self
    }

    pub fn lazy(mut self, lazy_load: bool, expand_all: bool) -> Self {
        self.lazy_load = lazy_load;
        self.lazy_expand_all = expand_all;
        self
    }

    pub fn paging_groups(mut self) -> Self {
        self.group_paging = true;
        self
    }

    pub fn distinct(mut self, field: impl Into<String>) -> Self {
        self.distinct = Some(field.into());
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn format_group(mut self, field: impl Into<String>, format: impl Into<String>) -> Self {
        self.group_formats.insert(field.into(), format.into());
        self
    }

    pub fn sorter(&self) -> Sorter {
        Sorter::new(self.sort.clone())
    }

    pub fn group_options(&self) -> GroupOptions {
        GroupOptions {
            aggregates: self.aggregates.clone(),
            lazy_load: self.lazy_load,
            lazy_expand_all: self.lazy_expand_all,
            formats: self.group_formats.clone(),
        }
    }

    /// Whether paging applies at all
    pub fn is_paged(&self) -> bool {
        self.skip > 0 || self.take.is_some()
    }

    /// One line per populated stage, for diagnostics
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.filters.is_empty() {
            lines.push(format!("filter: {} clause(s) joined by {:?}", self.filters.len(), self.joiner));
        }
        for clause in &self.search {
            lines.push(format!(
                "search: {} '{}' in [{}]",
                clause.operator,
                clause.key,
                clause.fields.join(", ")
            ));
        }
        if !self.sort.is_empty() {
            let keys: Vec<String> = self
                .sort
                .iter()
                .map(|key| match key.direction {
                    SortDirection::Ascending => key.field.to_string(),
                    SortDirection::Descending => format!("{} desc", key.field),
                })
                .collect();
            lines.push(format!("sort: {}", keys.join(", ")));
        }
        if let Some(field) = &self.distinct {
            lines.push(format!("distinct: {}", field));
        }
        if self.is_paged() {
            let take = self.take.map_or("all".to_string(), |t| t.to_string());
            lines.push(format!("page: skip {} take {}", self.skip, take));
        }
        if !self.group.is_empty() {
            let unit = if self.group_paging { "groups" } else { "rows" };
            lines.push(format!("group: {} (paging {})", self.group.join(" > "), unit));
        }
        if !self.aggregates.is_empty() {
            let labels: Vec<String> = self.aggregates.iter().map(AggregateSpec::label).collect();
            lines.push(format!("aggregates: {}", labels.join(", ")));
        }
        if self.requires_counts {
            lines.push("count: yes".to_string());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::aggregate::AggregateKind;
    use crate::query::filter::Operator;

    #[test]
    fn test_builder_and_summary() {
        let request = QueryRequest::new()
            .filter(FilterClause::simple("CustomerID", Operator::Equals, "ALFKI"))
            .sort_by(SortKey::descending("OrderID"))
            .group_by("ShipCountry")
            .skip(5)
            .take(5)
            .aggregate(AggregateSpec::new("Freight", AggregateKind::Sum))
            .with_counts();

        let summary = request.summary();
        assert_eq!(summary[0], "filter: 1 clause(s) joined by And");
        assert_eq!(summary[1], "sort: OrderID desc");
        assert_eq!(summary[2], "page: skip 5 take 5");
        assert_eq!(summary[3], "group: ShipCountry (paging rows)");
        assert_eq!(summary[4], "aggregates: Freight - sum");
        assert_eq!(summary[5], "count: yes");
        assert!(request.group_options().aggregates.len() == 1);
    }

    #[test]
    fn test_from_json_str() {
        let request = QueryRequest::from_json_str(
            r#"{"sorted": [{"name": "OrderID", "direction": "descending"}], "take": 2}"#,
            &ShapingConfig::default(),
        )
        .unwrap();
        assert_eq!(request.sort, vec![SortKey::descending("OrderID")]);
        assert_eq!(request.take, Some(2));
        assert!(QueryRequest::from_json_str("{", &ShapingConfig::default()).is_err());
    }
}
