use super::ShapingConfig;
use crate::error::{common, ErrorExt, Result};
use std::path::Path;
use tracing::debug;

/// Load configuration from a TOML file, then apply environment overrides.
///
/// A missing file is not an error when `required` is false; defaults apply.
pub fn load_config(path: Option<&Path>, required: bool) -> Result<ShapingConfig> {
    let mut config = match path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(path)
                .to_config_error(format!("Failed to read {}", path.display()))?;
            debug!("Loaded shaping configuration from {}", path.display());
            ShapingConfig::from_toml_str(&content)?
        }
        Some(path) if required => return Err(common::config_not_found(path)),
        _ => ShapingConfig::default(),
    };

    config.merge_env_vars();
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shaping.toml");
        std::fs::write(&path, "null_group_key = \"(none)\"\n").unwrap();

        let config = load_config(Some(&path), true).unwrap();
        assert_eq!(config.null_group_key, "(none)");
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");

        let config = load_config(Some(&path), false).unwrap();
        assert_eq!(config.blank_marker, "blanks");

        let err = load_config(Some(&path), true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
    }
}
