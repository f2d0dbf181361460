//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::{kiln_home, GlobalConfig};
use crate::ConfigResult;
use std::env;
use std::path::{Path, PathBuf};

/// File that marks a project root
pub const PROJECT_FILE_NAME: &str = "project.json";

/// Environment variable overriding the package store root
pub const STORE_ROOT_ENV: &str = "KILN_STORE_ROOT";

/// Environment variable pinning the toolchain version
pub const TOOLCHAIN_ENV: &str = "KILN_TOOLCHAIN";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Global config (~/.kiln/config.toml) - overrides defaults
/// 3. Environment variables (KILN_*) - overrides global config
/// 4. Explicit overrides on the loader - highest priority
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Global config file to read instead of ~/.kiln/config.toml
    global_config_path: Option<PathBuf>,
    store_root: Option<PathBuf>,
    toolchain: Option<String>,
}

/// Merged configuration result
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Project root directory (where project.json was found)
    pub project_root: Option<PathBuf>,

    /// Package store root
    pub store_root: PathBuf,

    /// Toolchain version pin, unparsed
    pub toolchain: Option<String>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Read global settings from `path` instead of ~/.kiln/config.toml
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Use this package store regardless of other settings
    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.store_root = Some(root.into());
        self
    }

    /// Pin this toolchain version regardless of other settings
    pub fn with_toolchain(mut self, version: impl Into<String>) -> Self {
        self.toolchain = Some(version.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find project.json, then merges the
    /// global config, environment and overrides on top of the defaults.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let project_root = find_project_root(start_dir);
        let global = self.load_global_config()?;

        let store_root = match self
            .store_root
            .clone()
            .or_else(|| env_value(STORE_ROOT_ENV).map(PathBuf::from))
            .or_else(|| global.store_root().map(Path::to_path_buf))
        {
            Some(root) => root,
            None => default_store_root()?,
        };

        let toolchain = self
            .toolchain
            .clone()
            .or_else(|| env_value(TOOLCHAIN_ENV))
            .or_else(|| global.toolchain().map(str::to_string));

        Ok(Config {
            project_root,
            store_root,
            toolchain,
        })
    }

    /// Load global configuration; a missing file means no global settings
    fn load_global_config(&self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match GlobalConfig::global_config_path() {
                Ok(path) => path,
                Err(_) => return Ok(GlobalConfig::default()),
            },
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a project was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}

/// Nearest folder at or above `start_dir` containing project.json
pub fn find_project_root(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .find(|dir| dir.join(PROJECT_FILE_NAME).is_file())
        .map(Path::to_path_buf)
}

/// Default package store (~/.kiln/packages)
pub fn default_store_root() -> ConfigResult<PathBuf> {
    Ok(kiln_home()?.join("packages"))
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
