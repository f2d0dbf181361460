//! Local package store
//!
//! Installed packages live at `<root>/<publisher>/<project>/versions/<version>/`.
//! Every installed version folder holds the package's `project.json` and its
//! packaged archive `<project>.jar`.

use crate::coordinate::ProjectCoordinate;
use crate::manifest::{ProjectDescriptor, DESCRIPTOR_FILE_NAME};
use crate::version::VersionNumber;
use crate::{PackageError, Result};
use std::fs::ReadDir;
use std::path::{Path, PathBuf};

const VERSIONS_FOLDER_NAME: &str = "versions";

/// A read-only view of a package store rooted at a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    /// Create a store view rooted at the given folder
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root folder
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<publisher>/<project>`
    pub fn project_folder(&self, publisher: &str, project: &str) -> PathBuf {
        self.root.join(publisher).join(project)
    }

    /// `<root>/<publisher>/<project>/versions`
    pub fn versions_folder(&self, publisher: &str, project: &str) -> PathBuf {
        self.project_folder(publisher, project)
            .join(VERSIONS_FOLDER_NAME)
    }

    /// Install location of one exact version.
    ///
    /// An installed folder whose name reads as `version` without being its
    /// canonical text (`1.02` for `1.2`) is returned as found on disk.
    /// Otherwise the canonical location is returned without checking that it
    /// exists.
    pub fn version_folder(&self, publisher: &str, project: &str, version: &VersionNumber) -> PathBuf {
        let canonical = self
            .versions_folder(publisher, project)
            .join(version.to_string());
        if canonical.is_dir() {
            return canonical;
        }
        self.installed_versions(publisher, project)
            .folders()
            .find(|(installed, _)| installed == version)
            .map(|(_, folder)| folder)
            .unwrap_or(canonical)
    }

    /// Install location of a versioned coordinate
    pub fn coordinate_folder(&self, coordinate: &ProjectCoordinate) -> Result<PathBuf> {
        let version = require_version(coordinate)?;
        Ok(self.version_folder(coordinate.publisher(), coordinate.project(), version))
    }

    /// Path of the installed `project.json` for a versioned coordinate
    pub fn descriptor_path(&self, coordinate: &ProjectCoordinate) -> Result<PathBuf> {
        Ok(self.coordinate_folder(coordinate)?.join(DESCRIPTOR_FILE_NAME))
    }

    /// Path of the packaged archive for a versioned coordinate
    pub fn library_path(&self, coordinate: &ProjectCoordinate) -> Result<PathBuf> {
        Ok(self
            .coordinate_folder(coordinate)?
            .join(format!("{}.jar", coordinate.project())))
    }

    /// Whether the version folder for a versioned coordinate exists
    pub fn is_installed(&self, coordinate: &ProjectCoordinate) -> bool {
        self.coordinate_folder(coordinate)
            .map(|folder| folder.is_dir())
            .unwrap_or(false)
    }

    /// Versions of a project found on disk.
    ///
    /// The sequence is produced lazily while reading the versions folder and
    /// can only be consumed once. A project with no versions folder yields
    /// nothing.
    pub fn installed_versions(&self, publisher: &str, project: &str) -> InstalledVersions {
        let entries = std::fs::read_dir(self.versions_folder(publisher, project)).ok();
        InstalledVersions { entries }
    }

    /// The greatest installed version of a project
    pub fn latest_version(&self, publisher: &str, project: &str) -> Result<VersionNumber> {
        self.installed_versions(publisher, project)
            .max()
            .ok_or_else(|| PackageError::VersionNotFound {
                publisher: publisher.to_string(),
                project: project.to_string(),
            })
    }

    /// Pin a version-less coordinate to its latest installed version.
    /// Versioned coordinates are returned unchanged.
    pub fn resolve_version(&self, coordinate: &ProjectCoordinate) -> Result<ProjectCoordinate> {
        if coordinate.version().is_some() {
            return Ok(coordinate.clone());
        }
        let latest = self.latest_version(coordinate.publisher(), coordinate.project())?;
        Ok(coordinate.clone().with_version(latest))
    }

    /// Load the installed descriptor of a versioned coordinate
    pub fn load_descriptor(&self, coordinate: &ProjectCoordinate) -> Result<ProjectDescriptor> {
        ProjectDescriptor::load(&self.descriptor_path(coordinate)?)
    }
}

fn require_version(coordinate: &ProjectCoordinate) -> Result<&VersionNumber> {
    coordinate.version().ok_or_else(|| {
        PackageError::InvalidArgument(format!(
            "coordinate {} must have a version",
            coordinate
        ))
    })
}

/// Lazily enumerated installed versions of one project
#[derive(Debug)]
pub struct InstalledVersions {
    entries: Option<ReadDir>,
}

impl InstalledVersions {
    /// Pair each version with the folder it was read from
    pub fn folders(self) -> impl Iterator<Item = (VersionNumber, PathBuf)> {
        let mut versions = self;
        std::iter::from_fn(move || versions.next_folder())
    }

    fn next_folder(&mut self) -> Option<(VersionNumber, PathBuf)> {
        let entries = self.entries.as_mut()?;
        for entry in entries.by_ref() {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name();
            if let Some(version) = name.to_str().and_then(|n| VersionNumber::parse(n).ok()) {
                return Some((version, entry.path()));
            }
        }
        None
    }
}

impl Iterator for InstalledVersions {
    type Item = VersionNumber;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_folder().map(|(version, _)| version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn install(store: &PackageStore, publisher: &str, project: &str, version: &str) -> PathBuf {
        let folder = store.version_folder(publisher, project, &VersionNumber::parse(version).unwrap());
        fs::create_dir_all(&folder).unwrap();
        folder
    }

    #[test]
    fn test_version_folder_layout() {
        let store = PackageStore::new("/store");
        let folder = store.version_folder("qub", "lib-java", &VersionNumber::parse("7").unwrap());
        assert_eq!(folder, PathBuf::from("/store/qub/lib-java/versions/7"));
        assert!(!folder.exists());
    }

    #[test]
    fn test_installed_versions_missing_project() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        assert_eq!(store.installed_versions("qub", "nothing").count(), 0);
    }

    #[test]
    fn test_installed_versions_skips_files() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        install(&store, "qub", "lib", "1");
        install(&store, "qub", "lib", "2.1");
        fs::write(store.versions_folder("qub", "lib").join("notes.txt"), "x").unwrap();

        let mut versions: Vec<VersionNumber> = store.installed_versions("qub", "lib").collect();
        versions.sort();
        assert_eq!(
            versions,
            vec![VersionNumber::parse("1").unwrap(), VersionNumber::parse("2.1").unwrap()]
        );
    }

    #[test]
    fn test_latest_version() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        install(&store, "openjdk", "jdk", "16.0.1");
        install(&store, "openjdk", "jdk", "17");

        assert_eq!(
            store.latest_version("openjdk", "jdk").unwrap(),
            VersionNumber::parse("17").unwrap()
        );
    }

    #[test]
    fn test_latest_version_not_found() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        let err = store.latest_version("qub", "lib").unwrap_err();
        assert!(matches!(err, PackageError::VersionNotFound { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_resolve_version() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        install(&store, "qub", "lib", "3");
        install(&store, "qub", "lib", "4");

        let latest = ProjectCoordinate::parse("qub/lib").unwrap();
        assert_eq!(store.resolve_version(&latest).unwrap().to_string(), "qub/lib@4");

        let pinned = ProjectCoordinate::parse("qub/lib@3").unwrap();
        assert_eq!(store.resolve_version(&pinned).unwrap(), pinned);
        assert!(store.is_installed(&pinned));
    }

    #[test]
    fn test_non_canonical_folder_name_is_found() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        let folder = store.versions_folder("qub", "lib").join("1.02");
        fs::create_dir_all(&folder).unwrap();

        let latest = store.latest_version("qub", "lib").unwrap();
        assert_eq!(latest.to_string(), "1.2");
        assert_eq!(store.version_folder("qub", "lib", &latest), folder);

        let coordinate = ProjectCoordinate::parse("qub/lib").unwrap();
        let resolved = store.resolve_version(&coordinate).unwrap();
        assert!(store.is_installed(&resolved));
        assert_eq!(store.library_path(&resolved).unwrap(), folder.join("lib.jar"));
    }

    #[test]
    fn test_coordinate_paths_require_version() {
        let store = PackageStore::new("/store");
        let coordinate = ProjectCoordinate::parse("qub/lib").unwrap();
        assert!(matches!(
            store.descriptor_path(&coordinate),
            Err(PackageError::InvalidArgument(_))
        ));

        let coordinate = coordinate.with_version(VersionNumber::parse("2").unwrap());
        assert_eq!(
            store.library_path(&coordinate).unwrap(),
            PathBuf::from("/store/qub/lib/versions/2/lib.jar")
        );
    }
}
