//! Project-relative paths
//!
//! Build state keys source and class files by paths relative to the source
//! and output folders. They are stored with forward slashes regardless of
//! platform and compared case-sensitively.

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A normalized, non-rooted, forward-slash path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelativePath(String);

impl RelativePath {
    /// Normalize and validate a relative path.
    ///
    /// Backslashes become forward slashes and `.` segments are dropped.
    /// Empty, rooted and drive-qualified paths and `..` segments are rejected.
    pub fn new(text: impl AsRef<str>) -> BuildResult<Self> {
        let text = text.as_ref();
        let normalized = text.replace('\\', "/");

        if normalized.starts_with('/') || has_drive_prefix(&normalized) {
            return Err(BuildError::invalid_argument(format!(
                "path '{}' must be relative",
                text
            )));
        }

        let mut segments = Vec::new();
        for segment in normalized.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(BuildError::invalid_argument(format!(
                        "path '{}' cannot contain '..'",
                        text
                    )))
                }
                segment => segments.push(segment),
            }
        }

        if segments.is_empty() {
            return Err(BuildError::invalid_argument(format!(
                "path '{}' is empty",
                text
            )));
        }

        Ok(Self(segments.join("/")))
    }

    /// The path of `path` below `base`
    pub fn from_base(base: &Path, path: &Path) -> BuildResult<Self> {
        let relative = path.strip_prefix(base).map_err(|_| {
            BuildError::invalid_argument(format!(
                "{} is not under {}",
                path.display(),
                base.display()
            ))
        })?;

        let segments: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Self::new(segments.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Platform path for joining onto a folder
    pub fn to_path(&self) -> PathBuf {
        self.0.split('/').collect()
    }

    /// Final segment
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its extension
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(index) => &name[..index],
        }
    }

    /// Everything before the final segment, if there is a parent folder
    pub fn parent(&self) -> Option<&str> {
        self.0.rfind('/').map(|index| &self.0[..index])
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(index) => Some(&name[index + 1..]),
        }
    }

    /// The same path with its extension replaced
    pub fn with_extension(&self, extension: &str) -> Self {
        let mut name = self.file_stem().to_string();
        if !extension.is_empty() {
            name.push('.');
            name.push_str(extension);
        }
        self.sibling(&name)
    }

    /// A path in the same folder with a different file name
    pub fn sibling(&self, file_name: &str) -> Self {
        match self.parent() {
            Some(parent) => Self(format!("{}/{}", parent, file_name)),
            None => Self(file_name.to_string()),
        }
    }

    /// Whether this path starts with the given folder path
    pub fn starts_with(&self, folder: &str) -> bool {
        let folder = folder.trim_end_matches('/');
        self.0 == folder
            || (self.0.len() > folder.len()
                && self.0.starts_with(folder)
                && self.0.as_bytes()[folder.len()] == b'/')
    }

    /// Remove a leading folder path
    pub fn strip_folder(&self, folder: &str) -> Option<Self> {
        let folder = folder.trim_end_matches('/');
        let rest = self.0.strip_prefix(folder)?.strip_prefix('/')?;
        Self::new(rest).ok()
    }
}

fn has_drive_prefix(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RelativePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for RelativePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RelativePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::new(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Foo.java", "Foo.java")]
    #[case("a/b/Foo.java", "a/b/Foo.java")]
    #[case("a\\b\\Foo.java", "a/b/Foo.java")]
    #[case("./a//Foo.java", "a/Foo.java")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(RelativePath::new(input).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("/abs/Foo.java")]
    #[case("C:\\abs\\Foo.java")]
    #[case("a/../Foo.java")]
    fn test_reject(#[case] input: &str) {
        assert!(matches!(
            RelativePath::new(input),
            Err(BuildError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_file_parts() {
        let path = RelativePath::new("qub/build/Foo.java").unwrap();
        assert_eq!(path.file_name(), "Foo.java");
        assert_eq!(path.file_stem(), "Foo");
        assert_eq!(path.extension(), Some("java"));
        assert_eq!(path.parent(), Some("qub/build"));
        assert_eq!(path.with_extension("class").as_str(), "qub/build/Foo.class");
        assert_eq!(path.sibling("Foo$1.class").as_str(), "qub/build/Foo$1.class");
    }

    #[test]
    fn test_top_level_file_parts() {
        let path = RelativePath::new("Empty.java").unwrap();
        assert_eq!(path.parent(), None);
        assert_eq!(path.with_extension("class").as_str(), "Empty.class");
    }

    #[test]
    fn test_from_base() {
        let base = Path::new("/project/sources");
        let path = base.join("a").join("Foo.java");
        assert_eq!(
            RelativePath::from_base(base, &path).unwrap().as_str(),
            "a/Foo.java"
        );
        assert!(RelativePath::from_base(base, Path::new("/other/Foo.java")).is_err());
    }

    #[test]
    fn test_strip_folder() {
        let path = RelativePath::new("sources/a/Foo.java").unwrap();
        assert!(path.starts_with("sources"));
        assert!(!path.starts_with("source"));
        assert_eq!(path.strip_folder("sources").unwrap().as_str(), "a/Foo.java");
        assert_eq!(path.strip_folder("outputs"), None);
    }

    #[test]
    fn test_case_sensitive() {
        assert_ne!(
            RelativePath::new("Foo.java").unwrap(),
            RelativePath::new("foo.java").unwrap()
        );
    }
}
