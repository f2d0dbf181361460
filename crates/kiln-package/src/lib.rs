//! Kiln package management
//!
//! Versioned, publisher-qualified packages (`publisher/project@version`)
//! installed in a local package store, the `project.json` descriptor that
//! declares a project's dependencies, and resolution of those dependencies
//! and of the installed toolchain against the store.

pub mod coordinate;
pub mod manifest;
pub mod resolver;
pub mod store;
pub mod toolchain;
pub mod version;

pub use coordinate::ProjectCoordinate;
pub use manifest::ProjectDescriptor;
pub use resolver::{DependencyClosure, DependencyIssue, DependencyNode, DependencyResolver};
pub use store::{InstalledVersions, PackageStore};
pub use toolchain::{Toolchain, ToolchainLocator, ToolchainTool};
pub use version::VersionNumber;

use std::path::PathBuf;

/// Package management errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to parse version number: {0}")]
    VersionParse(String),

    #[error("Invalid project coordinate '{text}': {reason}")]
    InvalidCoordinate { text: String, reason: String },

    #[error("Failed to parse project.json: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid project.json file at {path}: {error}")]
    InvalidDescriptor {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("Could not find project.json file at {0}")]
    DescriptorNotFound(PathBuf),

    #[error("No installed versions of {publisher}/{project} found")]
    VersionNotFound { publisher: String, project: String },

    #[error("No installed toolchain found for {coordinate}")]
    ToolchainNotFound { coordinate: String },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl PackageError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Whether the error reports a missing package, version, toolchain or descriptor
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DescriptorNotFound(_) | Self::VersionNotFound { .. } | Self::ToolchainNotFound { .. }
        )
    }

    /// Whether the error reports malformed text (version, coordinate or JSON)
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::VersionParse(_)
                | Self::InvalidCoordinate { .. }
                | Self::ParseError(_)
                | Self::InvalidDescriptor { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;
