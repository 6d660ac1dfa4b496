//! Configuration file loading and validation.

use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;
use crate::types::{InkstoneConfig, OFFSET_LIMIT};

/// Name of the configuration file inside a configuration directory.
pub const CONFIG_FILE: &str = "inkstone.toml";

/// Loads and validates `<config_dir>/inkstone.toml`.
///
/// Relative `user_data_dir` and `shared_data_dir` values are taken relative
/// to `config_dir`.
pub fn load_config(config_dir: &Path) -> Result<InkstoneConfig, ConfigError> {
    let config_path = config_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    let mut config = load_config_from_str(&content)?;
    config.anchor_paths(config_dir);
    Ok(config)
}

/// Parses and validates an `inkstone.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<InkstoneConfig, ConfigError> {
    let config: InkstoneConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
pub fn validate_config(config: &InkstoneConfig) -> Result<(), ConfigError> {
    if config.paths.user_data_dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("paths.user_data_dir".to_string()));
    }

    let mut seen = HashSet::new();
    for kind in &config.resource_kinds {
        if kind.name.is_empty() {
            return Err(ConfigError::MissingField("resource_kinds.name".to_string()));
        }
        if !seen.insert(kind.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "resource kind '{}' is declared more than once",
                kind.name
            )));
        }
    }

    let arena = &config.arena;
    if arena.initial_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "arena.initial_capacity must be greater than zero".to_string(),
        ));
    }
    if arena.growth_factor < 2 {
        return Err(ConfigError::ValidationError(format!(
            "arena.growth_factor must be at least 2, got {}",
            arena.growth_factor
        )));
    }
    if arena.max_capacity > OFFSET_LIMIT {
        return Err(ConfigError::ValidationError(format!(
            "arena.max_capacity {} exceeds the {OFFSET_LIMIT}-byte offset range",
            arena.max_capacity
        )));
    }
    if arena.initial_capacity > arena.max_capacity {
        return Err(ConfigError::ValidationError(format!(
            "arena.initial_capacity {} exceeds arena.max_capacity {}",
            arena.initial_capacity, arena.max_capacity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const MINIMAL: &str = r#"
[paths]
user_data_dir = "/home/u/.inkstone"
"#;

    #[test]
    fn parse_minimal_config() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(
            config.paths.user_data_dir,
            PathBuf::from("/home/u/.inkstone")
        );
        assert!(config.paths.shared_data_dir.is_none());
        assert_eq!(config.paths.staging_dir, PathBuf::from("build"));
        assert!(config.resource_kinds.is_empty());
        assert!(config.freshness.verify_checksums);
        assert_eq!(config.distribution.name, "");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[paths]
user_data_dir = "/home/u/.inkstone"
shared_data_dir = "/usr/share/inkstone"
staging_dir = "compiled"

[[resource_kinds]]
name = "dict"
suffix = ".dict.yaml"

[[resource_kinds]]
name = "schema"
prefix = "schemas/"
suffix = ".schema.yaml"

[arena]
initial_capacity = 65536
growth_factor = 4
max_capacity = 1073741824

[freshness]
verify_checksums = false

[distribution]
name = "Inkstone"
code_name = "Stonebridge"
version = "0.3.0"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.resource_kinds.len(), 2);
        let schema = config.resource_kind("schema").unwrap();
        assert_eq!(schema.prefix, "schemas/");
        assert_eq!(config.arena.growth_factor, 4);
        assert_eq!(config.arena.max_capacity, 1 << 30);
        assert!(!config.freshness.verify_checksums);
        assert_eq!(config.distribution.code_name, "Stonebridge");
        assert_eq!(
            config.staging_dir(),
            PathBuf::from("/home/u/.inkstone/compiled")
        );
    }

    #[test]
    fn missing_paths_table_errors() {
        let err = load_config_from_str("[arena]\ngrowth_factor = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn empty_user_data_dir_errors() {
        let err = load_config_from_str("[paths]\nuser_data_dir = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn duplicate_kind_errors() {
        let toml = format!(
            "{MINIMAL}\n[[resource_kinds]]\nname = \"dict\"\n\n[[resource_kinds]]\nname = \"dict\"\n"
        );
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn empty_kind_name_errors() {
        let toml = format!("{MINIMAL}\n[[resource_kinds]]\nname = \"\"\n");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn arena_validation() {
        for (table, needle) in [
            ("initial_capacity = 0", "greater than zero"),
            ("growth_factor = 1", "at least 2"),
            ("initial_capacity = 2048\nmax_capacity = 1024", "exceeds arena.max_capacity"),
            ("max_capacity = 4294967296", "offset range"),
        ] {
            let toml = format!("{MINIMAL}\n[arena]\n{table}\n");
            let err = load_config_from_str(&toml).unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError(_)), "{table}");
            assert!(err.to_string().contains(needle), "{table}: {err}");
        }
    }

    #[test]
    fn load_from_directory_anchors_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[paths]\nuser_data_dir = \"user\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.paths.user_data_dir, dir.path().join("user"));
    }

    #[test]
    fn load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
