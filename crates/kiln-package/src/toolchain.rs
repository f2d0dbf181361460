//! Toolchain lookup
//!
//! The toolchain is an ordinary package in the store under a fixed
//! coordinate. Its install folder holds the compiler, runtime and archiver
//! executables under `bin/`.

use crate::store::PackageStore;
use crate::version::VersionNumber;
use crate::{PackageError, Result};
use std::path::{Path, PathBuf};

/// Publisher of the toolchain package
pub const TOOLCHAIN_PUBLISHER: &str = "openjdk";
/// Project name of the toolchain package
pub const TOOLCHAIN_PROJECT: &str = "jdk";

/// An executable shipped with the toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolchainTool {
    /// Source compiler
    Compiler,
    /// Program runtime
    Runtime,
    /// Archive packager
    Archiver,
}

impl ToolchainTool {
    /// Executable name without platform suffix
    pub fn name(&self) -> &'static str {
        match self {
            Self::Compiler => "javac",
            Self::Runtime => "java",
            Self::Archiver => "jar",
        }
    }

    /// Path of the executable relative to the toolchain install folder
    pub fn relative_path(&self) -> PathBuf {
        Path::new("bin").join(format!("{}{}", self.name(), std::env::consts::EXE_SUFFIX))
    }
}

/// An installed toolchain version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    version: VersionNumber,
    root: PathBuf,
}

impl Toolchain {
    pub fn version(&self) -> &VersionNumber {
        &self.version
    }

    /// Install folder
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of one of the toolchain's executables
    pub fn tool(&self, tool: ToolchainTool) -> PathBuf {
        self.root.join(tool.relative_path())
    }

    pub fn compiler(&self) -> PathBuf {
        self.tool(ToolchainTool::Compiler)
    }

    pub fn runtime(&self) -> PathBuf {
        self.tool(ToolchainTool::Runtime)
    }

    pub fn archiver(&self) -> PathBuf {
        self.tool(ToolchainTool::Archiver)
    }
}

/// Finds installed toolchains in a package store
pub struct ToolchainLocator<'a> {
    store: &'a PackageStore,
}

impl<'a> ToolchainLocator<'a> {
    pub fn new(store: &'a PackageStore) -> Self {
        Self { store }
    }

    /// The greatest installed toolchain version
    pub fn latest(&self) -> Result<Toolchain> {
        let version = self
            .store
            .latest_version(TOOLCHAIN_PUBLISHER, TOOLCHAIN_PROJECT)
            .map_err(|_| PackageError::ToolchainNotFound {
                coordinate: format!("{}/{}", TOOLCHAIN_PUBLISHER, TOOLCHAIN_PROJECT),
            })?;
        Ok(self.toolchain(version))
    }

    /// One exact installed toolchain version
    pub fn exact(&self, version: &VersionNumber) -> Result<Toolchain> {
        let toolchain = self.toolchain(version.clone());
        if !toolchain.root.is_dir() {
            return Err(PackageError::ToolchainNotFound {
                coordinate: format!("{}/{}@{}", TOOLCHAIN_PUBLISHER, TOOLCHAIN_PROJECT, version),
            });
        }
        Ok(toolchain)
    }

    /// `exact` when a version is requested, `latest` otherwise
    pub fn locate(&self, version: Option<&VersionNumber>) -> Result<Toolchain> {
        match version {
            Some(version) => self.exact(version),
            None => self.latest(),
        }
    }

    fn toolchain(&self, version: VersionNumber) -> Toolchain {
        let root = self
            .store
            .version_folder(TOOLCHAIN_PUBLISHER, TOOLCHAIN_PROJECT, &version);
        Toolchain { version, root }
    }
}
