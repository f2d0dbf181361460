//! Project descriptor parsing and types (project.json)

use crate::coordinate::ProjectCoordinate;
use crate::version::VersionNumber;
use crate::{PackageError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// File name of a project descriptor, both in a project root and in an
/// installed version folder
pub const DESCRIPTOR_FILE_NAME: &str = "project.json";

/// Project descriptor (project.json)
///
/// Keys that are not modeled here are kept in `extra` and written back
/// unchanged, so loading and saving a descriptor never loses information.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionNumber>,
    /// Toolchain settings, kept opaque apart from the `version` pin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java: Option<Map<String, Value>>,
    /// Declared dependencies, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ProjectCoordinate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectDescriptor {
    /// Create a descriptor for `publisher/project@version`
    pub fn new(
        publisher: impl Into<String>,
        project: impl Into<String>,
        version: VersionNumber,
    ) -> Self {
        Self {
            publisher: Some(publisher.into()),
            project: Some(project.into()),
            version: Some(version),
            ..Self::default()
        }
    }

    /// Parse a descriptor from JSON text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a descriptor from a file.
    ///
    /// A missing file is `DescriptorNotFound`; an empty or malformed file is
    /// `InvalidDescriptor`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PackageError::DescriptorNotFound(path.to_path_buf())
            } else {
                PackageError::io(path, e)
            }
        })?;

        serde_json::from_str(&content).map_err(|error| PackageError::InvalidDescriptor {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the descriptor to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_json_string()?;
        std::fs::write(path, content).map_err(|e| PackageError::io(path, e))
    }

    /// Add a dependency; duplicates are kept
    pub fn with_dependency(mut self, dependency: ProjectCoordinate) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// The coordinate this descriptor publishes, if fully named
    pub fn coordinate(&self) -> Option<ProjectCoordinate> {
        let publisher = self.publisher.as_deref()?;
        let project = self.project.as_deref()?;
        let coordinate = ProjectCoordinate::new(publisher, project).ok()?;
        Some(match &self.version {
            Some(version) => coordinate.with_version(version.clone()),
            None => coordinate,
        })
    }

    /// Toolchain version pinned by `"java": { "version": ... }`
    pub fn toolchain_requirement(&self) -> Option<VersionNumber> {
        self.java
            .as_ref()?
            .get("version")?
            .as_str()
            .and_then(|text| VersionNumber::parse(text).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_descriptor() {
        let descriptor = ProjectDescriptor::parse("{}").unwrap();
        assert_eq!(descriptor, ProjectDescriptor::default());
    }

    #[test]
    fn test_parse_complete_descriptor() {
        let json = r#"{
            "publisher": "qub",
            "project": "build-java",
            "version": "3",
            "java": { "version": "17", "mainClass": "qub.Build" },
            "dependencies": ["qub/lib-java@7", "qub/test-java@5"]
        }"#;

        let descriptor = ProjectDescriptor::parse(json).unwrap();
        assert_eq!(descriptor.publisher.as_deref(), Some("qub"));
        assert_eq!(descriptor.project.as_deref(), Some("build-java"));
        assert_eq!(descriptor.version, Some(VersionNumber::parse("3").unwrap()));
        assert_eq!(descriptor.dependencies.len(), 2);
        assert_eq!(descriptor.dependencies[1].to_string(), "qub/test-java@5");
        assert_eq!(
            descriptor.toolchain_requirement(),
            Some(VersionNumber::parse("17").unwrap())
        );
        assert_eq!(
            descriptor.coordinate().unwrap().to_string(),
            "qub/build-java@3"
        );
    }

    #[test]
    fn test_dependencies_keep_order_and_duplicates() {
        let json = r#"{ "dependencies": ["b/y@2", "a/x@1", "b/y@2"] }"#;
        let descriptor = ProjectDescriptor::parse(json).unwrap();
        let names: Vec<String> = descriptor
            .dependencies
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(names, vec!["b/y@2", "a/x@1", "b/y@2"]);
    }

    #[test]
    fn test_unknown_keys_round_trip() {
        let json = r#"{
            "publisher": "qub",
            "description": "A project",
            "java": { "version": "17", "tests": { "skip": ["Slow"] } },
            "tags": [1, true, null]
        }"#;

        let descriptor = ProjectDescriptor::parse(json).unwrap();
        assert_eq!(descriptor.extra.len(), 2);

        let written = descriptor.to_json_string().unwrap();
        let original: Value = serde_json::from_str(json).unwrap();
        let rewritten: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(original, rewritten);
    }

    #[test]
    fn test_invalid_dependency_is_parse_error() {
        let err = ProjectDescriptor::parse(r#"{ "dependencies": ["nope"] }"#).unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_load_missing_vs_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DESCRIPTOR_FILE_NAME);

        let err = ProjectDescriptor::load(&path).unwrap_err();
        assert!(matches!(err, PackageError::DescriptorNotFound(_)));
        assert!(err.is_not_found());

        std::fs::write(&path, "").unwrap();
        let err = ProjectDescriptor::load(&path).unwrap_err();
        assert!(matches!(err, PackageError::InvalidDescriptor { .. }));
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DESCRIPTOR_FILE_NAME);

        let descriptor = ProjectDescriptor::new("qub", "app", VersionNumber::parse("1").unwrap())
            .with_dependency(ProjectCoordinate::parse("qub/lib@2").unwrap());
        descriptor.save(&path).unwrap();

        assert_eq!(ProjectDescriptor::load(&path).unwrap(), descriptor);
    }
}
