//! Global Configuration (~/.kiln/config.toml)
//!
//! ```toml
//! [store]
//! root = "/opt/kiln/packages"
//!
//! [build]
//! toolchain = "17"
//! ```

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.kiln/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Package store settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    /// Build defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildDefaults>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Package store root. Relative paths are taken from the config file's folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BuildDefaults {
    /// Toolchain version to build with instead of the latest installed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<String>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError {
                    path: path.to_path_buf(),
                    error: e,
                }
            }
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;

        if let (Some(root), Some(folder)) = (config.store_root().map(Path::to_path_buf), path.parent()) {
            if root.is_relative() {
                config.store.get_or_insert_with(StoreConfig::default).root = Some(folder.join(root));
            }
        }
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(root) = self.store_root() {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "store.root".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        if let Some(toolchain) = self.toolchain() {
            if toolchain.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "build.toolchain".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the global config file path (~/.kiln/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        Ok(kiln_home()?.join("config.toml"))
    }

    pub fn store_root(&self) -> Option<&Path> {
        self.store.as_ref().and_then(|s| s.root.as_deref())
    }

    pub fn toolchain(&self) -> Option<&str> {
        self.build.as_ref().and_then(|b| b.toolchain.as_deref())
    }
}

/// The per-user kiln folder (~/.kiln)
pub fn kiln_home() -> ConfigResult<PathBuf> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    Ok(home.join(".kiln"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_global_config() {
        let toml = r#"
[store]
root = "/opt/kiln/packages"

[build]
toolchain = "17"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.store_root(), Some(Path::new("/opt/kiln/packages")));
        assert_eq!(config.toolchain(), Some("17"));
    }

    #[test]
    fn test_parse_empty_global_config() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config, GlobalConfig::default());
        assert_eq!(config.store_root(), None);
        assert_eq!(config.toolchain(), None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<GlobalConfig, _> = toml::from_str("[store]\npath = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_toolchain_rejected() {
        let config = GlobalConfig {
            build: Some(BuildDefaults {
                toolchain: Some(" ".to_string()),
            }),
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_relative_store_root_is_anchored_to_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("config.toml");
        std::fs::write(&file, "[store]\nroot = \"packages\"\n").unwrap();

        let config = GlobalConfig::load_from_file(&file).unwrap();
        assert_eq!(config.store_root(), Some(temp.path().join("packages").as_path()));
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = GlobalConfig::load_from_file(&temp.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
