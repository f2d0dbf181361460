//! Staleness planning for incremental builds
//!
//! Compares what is on disk now against the previous build state and decides
//! which sources must be recompiled and which artifacts belong to sources
//! that no longer exist. Planning is pure: all file-system observations are
//! passed in.

use crate::path::RelativePath;
use crate::snapshot::Timestamps;
use crate::state::BuildState;
use kiln_package::{ProjectCoordinate, VersionNumber};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Why a source file needs to be recompiled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecompileReason {
    /// No record of the file exists
    NewFile,
    /// A record exists but the file was never built successfully
    NeverBuilt,
    /// Modification time differs from the recorded one
    Modified,
    /// A referenced source is itself being recompiled
    DependencyChanged(RelativePath),
    /// A referenced source no longer exists
    DependencyRemoved(RelativePath),
    /// A produced class file is gone
    ArtifactMissing(RelativePath),
    /// A produced class file was modified after the build
    ArtifactChanged(RelativePath),
    /// The toolchain version differs from the last build
    ToolchainChanged,
    /// The project's resolved dependency closure differs from the last build
    DependenciesChanged,
}

impl fmt::Display for RecompileReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewFile => write!(f, "new file"),
            Self::NeverBuilt => write!(f, "never built"),
            Self::Modified => write!(f, "modified"),
            Self::DependencyChanged(path) => write!(f, "dependency {} changed", path),
            Self::DependencyRemoved(path) => write!(f, "dependency {} removed", path),
            Self::ArtifactMissing(path) => write!(f, "class file {} missing", path),
            Self::ArtifactChanged(path) => write!(f, "class file {} changed", path),
            Self::ToolchainChanged => write!(f, "toolchain changed"),
            Self::DependenciesChanged => write!(f, "project dependencies changed"),
        }
    }
}

/// Result of staleness planning
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncrementalPlan {
    /// Sources to (re)compile, with the first reason found for each
    pub recompile: BTreeMap<RelativePath, RecompileReason>,
    /// Recorded sources that were not found on disk
    pub removed_sources: Vec<RelativePath>,
    /// Class files of removed sources
    pub artifacts_to_delete: Vec<RelativePath>,
}

impl IncrementalPlan {
    /// Whether nothing needs to be compiled or deleted
    pub fn is_up_to_date(&self) -> bool {
        self.recompile.is_empty() && self.removed_sources.is_empty()
    }

    pub fn needs_recompile(&self, path: &str) -> bool {
        self.recompile.contains_key(path)
    }

    /// Sources to compile, in path order
    pub fn files(&self) -> impl Iterator<Item = &RelativePath> {
        self.recompile.keys()
    }
}

/// Computes an [`IncrementalPlan`] from a previous [`BuildState`]
pub struct StalenessPlanner<'a> {
    state: &'a BuildState,
    toolchain: Option<&'a VersionNumber>,
    dependencies: Option<&'a [ProjectCoordinate]>,
}

impl<'a> StalenessPlanner<'a> {
    pub fn new(state: &'a BuildState) -> Self {
        Self {
            state,
            toolchain: None,
            dependencies: None,
        }
    }

    /// Toolchain about to be used; a different recorded version recompiles everything
    pub fn with_toolchain(mut self, version: &'a VersionNumber) -> Self {
        self.toolchain = Some(version);
        self
    }

    /// Resolved dependency closure about to be used; a different recorded
    /// closure recompiles everything
    pub fn with_dependencies(mut self, dependencies: &'a [ProjectCoordinate]) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    /// Plan a build.
    ///
    /// `sources` holds the source files discovered now and their modification
    /// times; `artifacts` holds the class files currently on disk.
    pub fn plan(&self, sources: &Timestamps, artifacts: &Timestamps) -> IncrementalPlan {
        let mut plan = IncrementalPlan::default();
        let global = self.global_reason();

        for (path, modified) in sources {
            let reason = self.direct_reason(path, modified, sources, artifacts, global.as_ref());
            if let Some(reason) = reason {
                debug!(file = %path, reason = %reason, "stale");
                plan.recompile.insert(path.clone(), reason);
            }
        }

        // Marking is monotonic, so this settles within |sources| passes
        loop {
            let mut marked = Vec::new();
            for path in sources.keys() {
                if plan.recompile.contains_key(path.as_str()) {
                    continue;
                }
                let Some(record) = self.state.source_file(path.as_str()) else {
                    continue;
                };
                if let Some(dependency) = record
                    .dependencies
                    .iter()
                    .find(|dependency| plan.recompile.contains_key(dependency.as_str()))
                {
                    marked.push((path.clone(), dependency.clone()));
                }
            }

            if marked.is_empty() {
                break;
            }
            for (path, dependency) in marked {
                debug!(file = %path, dependency = %dependency, "stale through dependency");
                plan.recompile
                    .insert(path, RecompileReason::DependencyChanged(dependency));
            }
        }

        for (path, record) in self.state.source_files() {
            if !sources.contains_key(path.as_str()) {
                debug!(file = %path, "source removed");
                plan.removed_sources.push(path.clone());
                plan.artifacts_to_delete
                    .extend(record.class_files.keys().cloned());
            }
        }

        plan
    }

    fn global_reason(&self) -> Option<RecompileReason> {
        if let Some(toolchain) = self.toolchain {
            if self.state.javac_version() != Some(toolchain) {
                return Some(RecompileReason::ToolchainChanged);
            }
        }
        if let Some(dependencies) = self.dependencies {
            if self.state.dependencies() != dependencies {
                return Some(RecompileReason::DependenciesChanged);
            }
        }
        None
    }

    fn direct_reason(
        &self,
        path: &RelativePath,
        modified: &chrono::DateTime<chrono::Utc>,
        sources: &Timestamps,
        artifacts: &Timestamps,
        global: Option<&RecompileReason>,
    ) -> Option<RecompileReason> {
        let Some(record) = self.state.source_file(path.as_str()) else {
            return Some(RecompileReason::NewFile);
        };

        if let Some(reason) = global {
            return Some(reason.clone());
        }

        match &record.last_modified {
            None => return Some(RecompileReason::NeverBuilt),
            Some(last_modified) if last_modified != modified => {
                return Some(RecompileReason::Modified)
            }
            Some(_) => {}
        }

        for (class_file, recorded) in &record.class_files {
            match artifacts.get(class_file.as_str()) {
                None => return Some(RecompileReason::ArtifactMissing(class_file.clone())),
                Some(current) if current != recorded => {
                    return Some(RecompileReason::ArtifactChanged(class_file.clone()))
                }
                Some(_) => {}
            }
        }

        record
            .dependencies
            .iter()
            .find(|dependency| !sources.contains_key(dependency.as_str()))
            .map(|dependency| RecompileReason::DependencyRemoved(dependency.clone()))
    }
}
