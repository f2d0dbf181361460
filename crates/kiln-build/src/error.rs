/// Build system error types
use kiln_package::PackageError;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    #[error("No build state file found at {0}")]
    StateNotFound(PathBuf),

    #[error("Invalid build state: {0}")]
    InvalidBuildState(#[from] serde_json::Error),

    #[error("Invalid build state file at {path}: {error}")]
    InvalidStateFile {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("Source directory not found: {0}")]
    SourceFolderNotFound(PathBuf),

    #[error("Executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    #[error("Failed to launch {executable}: {error}")]
    ProcessLaunch {
        executable: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] kiln_config::ConfigError),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether the error reports something missing rather than malformed
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::StateNotFound(_) | Self::SourceFolderNotFound(_) | Self::ExecutableNotFound(_) => {
                true
            }
            Self::Package(e) => e.is_not_found(),
            _ => false,
        }
    }
}
