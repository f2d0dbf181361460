//! Kiln build system
//!
//! Incremental compilation for kiln projects:
//! - Persisted build state (`outputs/build.json`)
//! - Staleness planning from timestamps, source references and artifacts
//! - Toolchain invocation through a pluggable process runner
//! - Structured diagnostics parsed from compiler output
//! - Build orchestration tying the above to the package store

pub mod builder;
pub mod diagnostics;
pub mod error;
pub mod incremental;
pub mod path;
pub mod process;
pub mod references;
pub mod snapshot;
pub mod state;

// Re-export main types
pub use builder::{BuildConfig, BuildReport, Builder};
pub use diagnostics::{parse_output, DiagnosticIssue, DiagnosticParser};
pub use error::{BuildError, BuildResult};
pub use incremental::{IncrementalPlan, RecompileReason, StalenessPlanner};
pub use path::RelativePath;
pub use process::{ProcessInvocation, ProcessOutput, ProcessRunner, SystemProcessRunner};
pub use references::ReferenceScanner;
pub use snapshot::{scan_timestamps, Timestamps};
pub use state::{BuildState, SourceFileRecord};

// Re-export kiln-package types for convenience
pub use kiln_package::{ProjectCoordinate, ProjectDescriptor, VersionNumber};
