use super::{ErrorCode, QueryError};

/// Extension trait for convenient error conversion
pub trait ErrorExt<T> {
    /// Convert to QueryError with context
    fn to_query_error(self, context: impl Into<String>) -> Result<T, QueryError>;

    /// Convert to QueryError with specific error type
    fn to_config_error(self, message: impl Into<String>) -> Result<T, QueryError>;
    fn to_request_error(self, message: impl Into<String>) -> Result<T, QueryError>;
}

impl<T, E> ErrorExt<T> for Result<T, E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn to_query_error(self, context: impl Into<String>) -> Result<T, QueryError> {
        self.map_err(|e| QueryError::other(context).with_source(e))
    }

    fn to_config_error(self, message: impl Into<String>) -> Result<T, QueryError> {
        self.map_err(|e| QueryError::config(message).with_source(e))
    }

    fn to_request_error(self, message: impl Into<String>) -> Result<T, QueryError> {
        self.map_err(|e| QueryError::request(message).with_source(e))
    }
}

/// Helper functions for common error scenarios
pub mod common {
    use super::*;

    /// Create a not found error for configuration
    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> QueryError {
        QueryError::config_with_code(
            ErrorCode::CONFIG_NOT_FOUND,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
    }

    /// Create an invalid configuration value error
    pub fn config_invalid_value(key: &str, reason: &str) -> QueryError {
        QueryError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("Invalid value for '{}': {}", key, reason),
        )
    }

    /// Create an unknown filter operator error
    pub fn unknown_operator(operator: &str, field: Option<&str>) -> QueryError {
        QueryError::request_with_code(
            ErrorCode::REQUEST_UNKNOWN_OPERATOR,
            format!("Unknown filter operator '{}'", operator),
            field.map(str::to_string),
        )
    }

    /// Create an unknown joiner error
    pub fn unknown_joiner(condition: &str) -> QueryError {
        QueryError::request_with_code(
            ErrorCode::REQUEST_UNKNOWN_JOINER,
            format!("Unknown clause condition '{}', expected 'and' or 'or'", condition),
            None,
        )
    }

    /// Create an unknown sort direction error
    pub fn unknown_direction(direction: &str, field: Option<&str>) -> QueryError {
        QueryError::request_with_code(
            ErrorCode::REQUEST_UNKNOWN_DIRECTION,
            format!(
                "Unknown sort direction '{}', expected 'ascending' or 'descending'",
                direction
            ),
            field.map(str::to_string),
        )
    }

    /// Create a malformed filter clause error
    pub fn malformed_clause(reason: &str, field: Option<&str>) -> QueryError {
        QueryError::request_with_code(
            ErrorCode::REQUEST_MALFORMED_CLAUSE,
            format!("Malformed filter clause: {}", reason),
            field.map(str::to_string),
        )
    }

    /// Create an invalid paging error
    pub fn invalid_paging(name: &str, value: i64) -> QueryError {
        QueryError::request_with_code(
            ErrorCode::REQUEST_INVALID_PAGING,
            format!("'{}' must not be negative, got {}", name, value),
            Some(name.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_ext_conversion() {
        let result: Result<i32, std::num::ParseIntError> = "x".parse::<i32>();
        let err = result.to_request_error("take is not a number").unwrap_err();
        assert_eq!(err.code(), ErrorCode::REQUEST_GENERIC);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_common_helpers() {
        let err = common::unknown_operator("like", Some("CustomerID"));
        assert_eq!(err.code(), ErrorCode::REQUEST_UNKNOWN_OPERATOR);
        assert!(err.user_message().contains("CustomerID"));

        let err = common::invalid_paging("skip", -1);
        assert_eq!(err.code(), ErrorCode::REQUEST_INVALID_PAGING);
        assert!(err.to_string().contains("-1"));
    }
}
