//! Shaping configuration
//!
//! Defaults that the wire request does not carry: case sensitivity when a
//! clause omits `ignoreCase`, the markers used for blank and null values,
//! and how much data the type resolver samples.

pub mod loader;

pub use loader::load_config;

use crate::error::{common, Result};
use serde::{Deserialize, Serialize};

/// Engine-wide settings, loaded from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingConfig {
    /// Case-insensitive comparison when a clause does not say otherwise
    pub default_ignore_case: bool,
    /// Marker both sides of a string equality collapse to when the filter
    /// value is null
    pub blank_marker: String,
    /// Group key used for null field values
    pub null_group_key: String,
    /// Maximum records inspected when sampling a field type
    pub type_sample_limit: Option<usize>,
    /// Operator used by search clauses that name none
    pub default_search_operator: String,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            default_ignore_case: true,
            blank_marker: "blanks".to_string(),
            null_group_key: "null".to_string(),
            type_sample_limit: None,
            default_search_operator: "contains".to_string(),
        }
    }
}

impl ShapingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ShapingConfig = toml::from_str(content).map_err(|e| {
            crate::error::QueryError::config_with_code(
                crate::error::ErrorCode::CONFIG_PARSE_ERROR,
                "Failed to parse shaping configuration",
            )
            .with_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GRIDQUERY_*` environment overrides
    pub fn merge_env_vars(&mut self) {
        if let Ok(ignore_case) = std::env::var("GRIDQUERY_IGNORE_CASE") {
            if let Ok(value) = ignore_case.parse::<bool>() {
                self.default_ignore_case = value;
            }
        }

        if let Ok(limit) = std::env::var("GRIDQUERY_TYPE_SAMPLE_LIMIT") {
            if let Ok(value) = limit.parse::<usize>() {
                self.type_sample_limit = Some(value);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.blank_marker.is_empty() {
            return Err(common::config_invalid_value("blank_marker", "must not be empty"));
        }
        if self.null_group_key.is_empty() {
            return Err(common::config_invalid_value("null_group_key", "must not be empty"));
        }
        if self.type_sample_limit == Some(0) {
            return Err(common::config_invalid_value(
                "type_sample_limit",
                "must be at least 1 when set",
            ));
        }
        if self
            .default_search_operator
            .parse::<crate::query::filter::Operator>()
            .is_err()
        {
            return Err(common::config_invalid_value(
                "default_search_operator",
                "is not a known operator",
            ));
        }
        Ok(())
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.default_ignore_case = ignore_case;
        self
    }

    pub fn with_type_sample_limit(mut self, limit: Option<usize>) -> Self {
        self.type_sample_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_defaults() {
        let config = ShapingConfig::default();
        assert!(config.default_ignore_case);
        assert_eq!(config.blank_marker, "blanks");
        assert_eq!(config.null_group_key, "null");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ShapingConfig::from_toml_str(
            r#"
default_ignore_case = false
type_sample_limit = 50
"#,
        )
        .unwrap();
        assert!(!config.default_ignore_case);
        assert_eq!(config.type_sample_limit, Some(50));
        assert_eq!(config.default_search_operator, "contains");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ShapingConfig::from_toml_str("blank_marker = \"\"").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);

        let err = ShapingConfig::from_toml_str("default_search_operator = \"like\"").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);

        let err = ShapingConfig::from_toml_str("type_sample_limit = \"many\"").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_PARSE_ERROR);
    }
}
