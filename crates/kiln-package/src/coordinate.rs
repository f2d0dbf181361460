//! Package coordinates (`publisher/project@version`)

use crate::version::VersionNumber;
use crate::{PackageError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifies a package in the store.
///
/// A coordinate without a version is a request for the latest installed
/// version, not a wildcard: it is never equal to a versioned coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectCoordinate {
    publisher: String,
    project: String,
    version: Option<VersionNumber>,
}

impl ProjectCoordinate {
    /// Create a version-less coordinate
    pub fn new(publisher: impl Into<String>, project: impl Into<String>) -> Result<Self> {
        let publisher = publisher.into();
        let project = project.into();
        validate_segment("publisher", &publisher)?;
        validate_segment("project", &project)?;

        Ok(Self {
            publisher,
            project,
            version: None,
        })
    }

    /// Parse `publisher/project` or `publisher/project@version`
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| PackageError::InvalidCoordinate {
            text: text.to_string(),
            reason: reason.to_string(),
        };

        let (name, version) = match text.split_once('@') {
            Some((name, version)) => (name, Some(version)),
            None => (text, None),
        };
        let (publisher, project) = name
            .split_once('/')
            .ok_or_else(|| invalid("expected 'publisher/project'"))?;

        let coordinate = Self::new(publisher, project).map_err(|e| invalid(&e.to_string()))?;
        match version {
            Some(version) => {
                let version = VersionNumber::parse(version).map_err(|e| invalid(&e.to_string()))?;
                Ok(coordinate.with_version(version))
            }
            None => Ok(coordinate),
        }
    }

    /// Pin this coordinate to a version
    pub fn with_version(mut self, version: VersionNumber) -> Self {
        self.version = Some(version);
        self
    }

    /// The same package with the version removed
    pub fn without_version(&self) -> Self {
        Self {
            publisher: self.publisher.clone(),
            project: self.project.clone(),
            version: None,
        }
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn version(&self) -> Option<&VersionNumber> {
        self.version.as_ref()
    }

    /// Whether both coordinates name the same package, ignoring versions
    pub fn same_package(&self, other: &Self) -> bool {
        self.publisher == other.publisher && self.project == other.project
    }
}

fn validate_segment(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(PackageError::InvalidArgument(format!(
            "{} cannot be empty",
            field
        )));
    }
    if value.contains(['/', '\\', '@']) {
        return Err(PackageError::InvalidArgument(format!(
            "{} '{}' cannot contain '/', '\\' or '@'",
            field, value
        )));
    }
    Ok(())
}

impl fmt::Display for ProjectCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.publisher, self.project)?;
        if let Some(version) = &self.version {
            write!(f, "@{}", version)?;
        }
        Ok(())
    }
}

impl FromStr for ProjectCoordinate {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ProjectCoordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProjectCoordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
