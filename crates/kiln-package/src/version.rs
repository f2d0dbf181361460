//! Version numbers of installed packages
//!
//! Versions are dot-delimited and only partially numeric: `17`, `16.0.1`,
//! `1.2.3-beta` and even `nightly` are all valid folder names in a package
//! store. Whatever cannot be read as `major[.minor[.patch]]` is kept verbatim
//! as the suffix, so parsing arbitrary text never fails.

use crate::{PackageError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A comparable, partially-numeric version identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VersionNumber {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    suffix: Option<String>,
}

impl VersionNumber {
    /// Create a fully numeric `major.minor.patch` version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major: Some(major),
            minor: Some(minor),
            patch: Some(patch),
            suffix: None,
        }
    }

    /// Parse a version from dot-delimited text.
    ///
    /// Only empty text is rejected. Trailing text that is not part of the
    /// numeric prefix becomes the suffix, and fully non-numeric text becomes a
    /// version with no numeric parts at all.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(PackageError::VersionParse(
                "version text cannot be empty".to_string(),
            ));
        }

        let mut parts = [None; 3];
        let mut rest = text;
        for (index, part) in parts.iter_mut().enumerate() {
            let body = if index == 0 {
                rest
            } else {
                match rest.strip_prefix('.') {
                    Some(after) if after.starts_with(|c: char| c.is_ascii_digit()) => after,
                    _ => break,
                }
            };

            let digits = body.len() - body.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            if digits == 0 {
                break;
            }
            match body[..digits].parse::<u64>() {
                Ok(value) => {
                    *part = Some(value);
                    rest = &body[digits..];
                }
                // Too large for u64: keep it as suffix text
                Err(_) => break,
            }
        }

        let [major, minor, patch] = parts;
        Ok(Self {
            major,
            minor,
            patch,
            suffix: (!rest.is_empty()).then(|| rest.to_string()),
        })
    }

    /// Set the major component
    pub fn with_major(mut self, major: u64) -> Self {
        self.major = Some(major);
        self
    }

    /// Set the minor component
    pub fn with_minor(mut self, minor: u64) -> Self {
        self.minor = Some(minor);
        self
    }

    /// Set the patch component
    pub fn with_patch(mut self, patch: u64) -> Self {
        self.patch = Some(patch);
        self
    }

    /// Set the suffix
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn major(&self) -> Option<u64> {
        self.major
    }

    pub fn minor(&self) -> Option<u64> {
        self.minor
    }

    pub fn patch(&self) -> Option<u64> {
        self.patch
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn has_suffix(&self) -> bool {
        self.suffix.is_some()
    }
}

impl Ord for VersionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        // Absent numeric parts sort lowest; a release sorts above any suffixed version
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.suffix, &other.suffix) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(lhs), Some(rhs)) => lhs.cmp(rhs),
            })
    }
}

impl PartialOrd for VersionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers = [self.major, self.minor, self.patch];
        let mut first = true;
        for value in numbers.iter().flatten() {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", value)?;
            first = false;
        }
        if let Some(suffix) = &self.suffix {
            write!(f, "{}", suffix)?;
        }
        Ok(())
    }
}

impl FromStr for VersionNumber {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for VersionNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
