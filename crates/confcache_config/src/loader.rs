//! Configuration file loading and validation.

use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;
use crate::types::BuildModelParameters;

/// Name of the configuration file within the build root.
pub const CONFIG_FILE: &str = "confcache.toml";

/// Loads and validates `confcache.toml` from a build root directory.
///
/// A missing file is not an error: the defaults are returned.
pub fn load_config(build_root: &Path) -> Result<BuildModelParameters, ConfigError> {
    let config_path = build_root.join(CONFIG_FILE);
    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} not found, using defaults", config_path.display());
            return Ok(BuildModelParameters::default());
        }
        Err(e) => return Err(e.into()),
    };
    load_config_from_str(&content)
}

/// Parses and validates a `confcache.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<BuildModelParameters, ConfigError> {
    let config: BuildModelParameters =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &BuildModelParameters) -> Result<(), ConfigError> {
    if config.cache.dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "cache.dir must not be empty".to_string(),
        ));
    }
    if config.cache.tool_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "cache.tool_version must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert!(config.is_configuration_cache());
        assert!(config.is_project_scope_model_cache());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[cache]
enabled = true
project_scope_model_cache = false
dir = "build/cc"
tool_version = "8.1"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(config.is_configuration_cache());
        assert!(!config.is_project_scope_model_cache());
        assert_eq!(config.cache.dir, PathBuf::from("build/cc"));
        assert_eq!(config.cache.tool_version, "8.1");
    }

    #[test]
    fn parse_disabled_cache() {
        let config = load_config_from_str("[cache]\nenabled = false\n").unwrap();
        assert!(!config.is_configuration_cache());
    }

    #[test]
    fn reject_empty_dir() {
        let err = load_config_from_str("[cache]\ndir = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn reject_blank_tool_version() {
        let err = load_config_from_str("[cache]\ntool_version = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("tool_version"));
    }

    #[test]
    fn reject_malformed_toml() {
        let err = load_config_from_str("[cache\nenabled = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert!(config.is_configuration_cache());
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[cache]\nproject_scope_model_cache = false\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert!(!config.is_project_scope_model_cache());
    }
}
