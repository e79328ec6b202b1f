//! Test helper functions and custom assertions

pub mod assertions;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Write a JSON document into `dir`, returning its path
pub fn write_json(dir: &Path, name: &str, json: &serde_json::Value) -> Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(json)?)?;
    Ok(path)
}

/// Write a shaping configuration file into `dir`, returning its path
pub fn write_config(dir: &Path, toml: &str) -> Result<PathBuf> {
    let path = dir.join("gridquery.toml");
    std::fs::write(&path, toml)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_json(temp_dir.path(), "nested/request.json", &json!({"take": 2})).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(serde_json::from_str::<serde_json::Value>(&content).unwrap(), json!({"take": 2}));
    }
}
