use std::fmt::Display;
use thiserror::Error;

pub mod codes;
pub mod helpers;

pub use codes::{describe_error_code, ErrorCode};
pub use helpers::{common, ErrorExt};

use crate::query::coercion::CoercionError;

/// Result alias used across the library surface
pub type Result<T> = std::result::Result<T, QueryError>;

/// The unified error type for gridquery
///
/// Only caller contract violations, malformed wire requests, strict coercion
/// and configuration problems surface here. Bad data inside a well-formed
/// request (missing fields, unparseable filter literals) degrades inside the
/// pipeline and never produces one of these.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("[E{code:04}] Argument error: {message}")]
    Argument {
        code: u16,
        message: String,
        argument: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Coercion error: {message}")]
    Coercion {
        code: u16,
        message: String,
        target: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Request error: {message}")]
    Request {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl QueryError {
    /// Create the fail-fast error for a missing (null) top-level argument
    pub fn argument_null(argument: impl Into<String>) -> Self {
        let argument = argument.into();
        Self::Argument {
            code: ErrorCode::ARGUMENT_NULL,
            message: format!("Value cannot be null. (Parameter '{}')", argument),
            argument: Some(argument),
            source: None,
        }
    }

    /// Create a coercion error with specific code and target type name
    pub fn coercion_with_code(code: u16, message: impl Into<String>, target: Option<String>) -> Self {
        Self::Coercion {
            code,
            message: message.into(),
            target,
            source: None,
        }
    }

    /// Create a request error with default code
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            code: ErrorCode::REQUEST_GENERIC,
            message: message.into(),
            field: None,
            source: None,
        }
    }

    /// Create a request error with specific code and offending field
    pub fn request_with_code(code: u16, message: impl Into<String>, field: Option<String>) -> Self {
        Self::Request {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Argument { source: src, .. }
            | Self::Coercion { source: src, .. }
            | Self::Request { source: src, .. }
            | Self::Config { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Argument { message, .. }
            | Self::Coercion { message, .. }
            | Self::Request { message, .. }
            | Self::Config { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Get the process exit code the CLI reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Argument { .. } => 2,
            Self::Coercion { .. } => 3,
            Self::Request { .. } => 4,
            Self::Config { .. } => 5,
            Self::Other { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Argument { code, .. }
            | Self::Coercion { code, .. }
            | Self::Request { code, .. }
            | Self::Config { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Argument {
                message, argument, ..
            } => match argument {
                Some(name) => format!("Invalid argument '{}': {}", name, message),
                None => format!("Invalid argument: {}", message),
            },
            Self::Coercion {
                message, target, ..
            } => match target {
                Some(target) => format!("Cannot convert value to {}: {}", target, message),
                None => format!("Cannot convert value: {}", message),
            },
            Self::Request { message, field, .. } => match field {
                Some(field) => format!("Invalid request at '{}': {}", field, message),
                None => format!("Invalid request: {}", message),
            },
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::Other { message, .. } => message.clone(),
        }
    }

    /// Whether the error is a caller contract violation rather than a data problem
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Argument { .. } | Self::Request { .. })
    }
}

impl From<CoercionError> for QueryError {
    fn from(err: CoercionError) -> Self {
        let code = err.code();
        let target = err.target().map(str::to_string);
        QueryError::coercion_with_code(code, err.to_string(), target).with_source(err)
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::request_with_code(
            ErrorCode::REQUEST_PARSE_ERROR,
            "Malformed request JSON",
            None,
        )
        .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation_and_chaining() {
        let parse_err = "abc".parse::<i32>().unwrap_err();
        let err = QueryError::request("Cannot read skip")
            .with_source(parse_err)
            .with_context("while converting wire request");

        assert_eq!(err.code(), ErrorCode::REQUEST_GENERIC);
        assert!(err.to_string().contains("[E3000]"));
        assert!(err.to_string().contains("while converting wire request"));
        assert!(err.user_message().contains("Cannot read skip"));
    }

    #[test]
    fn test_argument_null() {
        let err = QueryError::argument_null("dataSource");
        assert_eq!(err.code(), ErrorCode::ARGUMENT_NULL);
        assert_eq!(err.exit_code(), 2);
        assert!(err.is_caller_error());
        assert!(err.to_string().contains("dataSource"));
    }

    #[test]
    fn test_from_coercion_error() {
        let err: QueryError = CoercionError::Guid {
            input: "not-a-guid".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::COERCION_GUID);
        assert!(!err.is_caller_error());
        assert!(err.user_message().contains("Guid"));
    }
}
