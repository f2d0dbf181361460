//! Persisted incremental build state (build.json)
//!
//! One record per source file: when it was last built, which other sources
//! it references, and which class files it produced. Unrecognized keys at
//! any level are kept and written back unchanged.

use crate::error::{BuildError, BuildResult};
use crate::path::RelativePath;
use chrono::{DateTime, Utc};
use kiln_package::{ProjectCoordinate, ProjectDescriptor, VersionNumber};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// File name of the persisted build state inside the output folder
pub const BUILD_STATE_FILE_NAME: &str = "build.json";

/// What the last build knew about one source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceFileRecord {
    /// Modification time of the source when it was last built successfully.
    /// `None` means the file has never been built.
    #[serde(
        rename = "lastModified",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<DateTime<Utc>>,

    /// Other source files this file references
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<RelativePath>,

    /// Class files produced from this source, with their modification times
    #[serde(rename = "classFiles", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub class_files: BTreeMap<RelativePath, DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SourceFileRecord {
    /// A record for a file built at the given modification time
    pub fn built(last_modified: DateTime<Utc>) -> Self {
        Self {
            last_modified: Some(last_modified),
            ..Self::default()
        }
    }

    pub fn with_dependency(mut self, dependency: RelativePath) -> Self {
        self.dependencies.insert(dependency);
        self
    }

    pub fn with_class_file(mut self, path: RelativePath, modified: DateTime<Utc>) -> Self {
        self.class_files.insert(path, modified);
        self
    }

    /// Whether this file has been built at least once
    pub fn is_built(&self) -> bool {
        self.last_modified.is_some()
    }
}

/// Build state of one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildState {
    #[serde(
        rename = "project.json",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    project: Option<ProjectDescriptor>,

    #[serde(
        rename = "javacVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    javac_version: Option<VersionNumber>,

    #[serde(rename = "javaFiles", default, skip_serializing_if = "BTreeMap::is_empty")]
    java_files: BTreeMap<RelativePath, SourceFileRecord>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl BuildState {
    /// Create an empty build state
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse build state from JSON text
    pub fn parse(content: &str) -> BuildResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load build state from a file.
    ///
    /// A missing file is `StateNotFound`; an empty or corrupt one is
    /// `InvalidStateFile`.
    pub fn load(path: &Path) -> BuildResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BuildError::StateNotFound(path.to_path_buf())
            } else {
                BuildError::io(path, e)
            }
        })?;

        serde_json::from_str(&content).map_err(|error| BuildError::InvalidStateFile {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> BuildResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the build state to a file, creating its folder if needed
    pub fn save(&self, path: &Path) -> BuildResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        let content = self.to_json_string()?;
        std::fs::write(path, content).map_err(|e| BuildError::io(path, e))
    }

    /// Descriptor the last build used
    pub fn project(&self) -> Option<&ProjectDescriptor> {
        self.project.as_ref()
    }

    pub fn set_project(&mut self, project: Option<ProjectDescriptor>) {
        self.project = project;
    }

    /// Toolchain version the last build used
    pub fn javac_version(&self) -> Option<&VersionNumber> {
        self.javac_version.as_ref()
    }

    pub fn set_javac_version(&mut self, version: Option<VersionNumber>) {
        self.javac_version = version;
    }

    /// Resolved dependency closure of the last build, taken from its descriptor
    pub fn dependencies(&self) -> &[ProjectCoordinate] {
        self.project
            .as_ref()
            .map(|project| project.dependencies.as_slice())
            .unwrap_or(&[])
    }

    pub fn source_file(&self, path: &str) -> Option<&SourceFileRecord> {
        self.java_files.get(path)
    }

    pub fn source_file_mut(&mut self, path: &str) -> Option<&mut SourceFileRecord> {
        self.java_files.get_mut(path)
    }

    /// Records in path order
    pub fn source_files(&self) -> impl Iterator<Item = (&RelativePath, &SourceFileRecord)> {
        self.java_files.iter()
    }

    /// Insert or replace the record for a source file, returning the old one
    pub fn set_source_file(
        &mut self,
        path: RelativePath,
        record: SourceFileRecord,
    ) -> Option<SourceFileRecord> {
        self.java_files.insert(path, record)
    }

    pub fn remove_source_file(&mut self, path: &str) -> Option<SourceFileRecord> {
        self.java_files.remove(path)
    }

    pub fn len(&self) -> usize {
        self.java_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.java_files.is_empty()
    }

    /// Top-level keys this type does not model
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}
