//! File timestamp snapshots

use crate::error::{BuildError, BuildResult};
use crate::path::RelativePath;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Modification times keyed by path relative to the scanned folder
pub type Timestamps = BTreeMap<RelativePath, DateTime<Utc>>;

/// Modification time of one file
pub fn modified_time(path: &Path) -> BuildResult<DateTime<Utc>> {
    let metadata = std::fs::metadata(path).map_err(|e| BuildError::io(path, e))?;
    let modified = metadata.modified().map_err(|e| BuildError::io(path, e))?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Every file below `folder` with the given extension, recursively.
///
/// A missing folder yields an empty snapshot.
pub fn scan_timestamps(folder: &Path, extension: &str) -> BuildResult<Timestamps> {
    let mut timestamps = Timestamps::new();
    if !folder.is_dir() {
        return Ok(timestamps);
    }

    for entry in WalkDir::new(folder).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(folder).to_path_buf();
            BuildError::io(path, std::io::Error::from(e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some(extension) {
            continue;
        }

        let relative = RelativePath::from_base(folder, path)?;
        timestamps.insert(relative, modified_time(path)?);
    }

    Ok(timestamps)
}
