//! Application configuration
//!
//! Settings that belong to the command line rather than to query shaping.

use crate::config::{load_config, ShapingConfig};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Application configuration structure
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Shaping configuration file, if one was given
    pub config_path: Option<PathBuf>,
    /// Pretty-print JSON output
    pub pretty: bool,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Get the log level string based on verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Load the shaping configuration; an explicitly named file must exist
    pub fn shaping_config(&self) -> Result<ShapingConfig> {
        let path = self.config_path.as_deref();
        load_config(path, path.is_some()).with_context(|| match path {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load default configuration".to_string(),
        })
    }

    /// Serialize a value for output
    pub fn render<T: serde::Serialize>(&self, value: &T) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.context("Failed to serialize output")
    }
}
