//! Canonical tier-relative paths.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while normalizing a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path cannot be turned into a canonical relative path.
    #[error("malformed path {path:?}: {reason}")]
    Malformed { path: String, reason: &'static str },
}

impl PathError {
    fn malformed(path: &str, reason: &'static str) -> Self {
        Self::Malformed {
            path: path.to_string(),
            reason,
        }
    }
}

/// A path shared by all storage tiers.
///
/// Never starts with a separator, never contains empty, `.` or `..` segments,
/// and is never empty. Constructing one from its own string form yields the
/// same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Canonicalizes a path that is already relative to the tier namespace.
    ///
    /// A single leading separator is tolerated and stripped, so
    /// `/raw/a.h5` and `raw/a.h5` both become `raw/a.h5`.
    pub fn new(path: &str) -> Result<Self, PathError> {
        let segments = canonical_segments(path)?;
        if segments.is_empty() {
            return Err(PathError::malformed(path, "no path segments"));
        }
        Ok(Self(segments.join("/")))
    }

    /// Derives the relative path from an instrument-reported absolute path.
    ///
    /// The result is rooted at the first segment after the `marker` segment,
    /// e.g. `/global/raw/s1/scan.h5` with marker `global` gives `raw/s1/scan.h5`.
    /// Input without a leading separator is taken as already normalized, which
    /// makes normalization idempotent.
    pub fn normalize(raw: &str, marker: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim();
        if !trimmed.starts_with('/') {
            return Self::new(trimmed);
        }

        let segments = canonical_segments(trimmed)?;
        let Some(pos) = segments.iter().position(|s| *s == marker) else {
            return Err(PathError::malformed(raw, "marker segment not found"));
        };
        let rest = &segments[pos + 1..];
        if rest.is_empty() {
            return Err(PathError::malformed(raw, "nothing after marker segment"));
        }
        Ok(Self(rest.join("/")))
    }

    /// Like [`RelativePath::normalize`], but the input must be the absolute
    /// path the instrument reported.
    pub fn from_instrument(raw: &str, marker: &str) -> Result<Self, PathError> {
        if !raw.trim().starts_with('/') {
            return Err(PathError::malformed(raw, "instrument path must be absolute"));
        }
        Self::normalize(raw, marker)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment of the path.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Parent directory, if the path has more than one segment.
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }

    /// Returns a sibling path with the last segment replaced.
    pub fn with_file_name(&self, name: &str) -> Result<Self, PathError> {
        match self.parent() {
            Some(parent) => Self::new(&format!("{parent}/{name}")),
            None => Self::new(name),
        }
    }
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

impl TryFrom<String> for RelativePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<RelativePath> for String {
    fn from(value: RelativePath) -> Self {
        value.0
    }
}

fn canonical_segments(path: &str) -> Result<Vec<&str>, PathError> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(PathError::malformed(path, "parent directory segment")),
            s => segments.push(s),
        }
    }
    Ok(segments)
}

/// Joins a root path and a relative path with exactly one separator.
///
/// Trailing separators on `root` and leading separators on `relative` are
/// collapsed. An empty `relative` yields the root itself, and an empty root is
/// treated as the filesystem root.
pub fn join(root: &str, relative: &str) -> String {
    let root = root.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    match (root.is_empty(), relative.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{relative}"),
        (false, true) => root.to_string(),
        (false, false) => format!("{root}/{relative}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_marker() {
        let rel = RelativePath::normalize("/global/raw/sample1/scan0001.h5", "global").unwrap();
        assert_eq!(rel.as_str(), "raw/sample1/scan0001.h5");
    }

    #[test]
    fn test_normalize_uses_first_marker_occurrence() {
        let rel = RelativePath::normalize("/mnt/global/raw/global/a.h5", "global").unwrap();
        assert_eq!(rel.as_str(), "raw/global/a.h5");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "/global/raw/sample1/scan0001.h5",
            "/global//raw///x.h5",
            "/data/global/raw/global/y.h5",
            "raw/already/relative.h5",
        ];
        for input in inputs {
            let once = RelativePath::normalize(input, "global").unwrap();
            let twice = RelativePath::normalize(once.as_str(), "global").unwrap();
            assert_eq!(once, twice, "input {input:?}");
        }
    }

    #[test]
    fn test_normalize_missing_marker_fails() {
        let err = RelativePath::normalize("/data/raw/scan.h5", "global").unwrap_err();
        assert!(matches!(err, PathError::Malformed { .. }));
        assert!(err.to_string().contains("marker segment not found"));
    }

    #[test]
    fn test_from_instrument_requires_absolute_path() {
        let err = RelativePath::from_instrument("raw/s1/scan.h5", "global").unwrap_err();
        assert!(err.to_string().contains("must be absolute"));

        let relative = RelativePath::from_instrument("/global/raw/s1/scan.h5", "global").unwrap();
        assert_eq!(relative.as_str(), "raw/s1/scan.h5");
    }

    #[test]
    fn test_normalize_marker_must_be_whole_segment() {
        let result = RelativePath::normalize("/globalscratch/raw/scan.h5", "global");
        assert!(result.is_err());
    }

    #[test]
    fn test_normalize_nothing_after_marker_fails() {
        assert!(RelativePath::normalize("/global", "global").is_err());
        assert!(RelativePath::normalize("/global/", "global").is_err());
    }

    #[test]
    fn test_normalize_rejects_parent_segments() {
        assert!(RelativePath::normalize("/global/raw/../etc/passwd", "global").is_err());
        assert!(RelativePath::new("raw/../../x").is_err());
    }

    #[test]
    fn test_new_strips_leading_separator() {
        let rel = RelativePath::new("/raw/transfer_tests/test.txt").unwrap();
        assert_eq!(rel.as_str(), "raw/transfer_tests/test.txt");
    }

    #[test]
    fn test_new_empty_fails() {
        assert!(RelativePath::new("").is_err());
        assert!(RelativePath::new("///").is_err());
    }

    #[test]
    fn test_file_name_and_parent() {
        let rel = RelativePath::new("raw/sample1/scan0001.h5").unwrap();
        assert_eq!(rel.file_name(), "scan0001.h5");
        assert_eq!(rel.parent(), Some("raw/sample1"));

        let flat = RelativePath::new("scan.h5").unwrap();
        assert_eq!(flat.file_name(), "scan.h5");
        assert_eq!(flat.parent(), None);
    }

    #[test]
    fn test_with_file_name() {
        let rel = RelativePath::new("raw/transfer_tests/test.txt").unwrap();
        let sibling = rel.with_file_name("test_abc.txt").unwrap();
        assert_eq!(sibling.as_str(), "raw/transfer_tests/test_abc.txt");
    }

    #[test]
    fn test_join_single_separator() {
        assert_eq!(join("/data/", "raw/a.h5"), "/data/raw/a.h5");
        assert_eq!(join("/data", "/raw/a.h5"), "/data/raw/a.h5");
        assert_eq!(join("/data//", "//raw/a.h5"), "/data/raw/a.h5");
        assert_eq!(join("/", "raw/a.h5"), "/raw/a.h5");
    }

    #[test]
    fn test_join_empty_relative_keeps_root() {
        assert_eq!(join("/data/", ""), "/data");
        assert_eq!(join("/", ""), "/");
        assert_eq!(join("", ""), "/");
    }

    #[test]
    fn test_join_never_doubles_or_drops_root() {
        let roots = ["/", "/~/", "/global/cfs/cdirs/als/data_mover/8.3.2", "/data/"];
        let rel = RelativePath::new("raw/sample1/scan0001.h5").unwrap();
        for root in roots {
            let joined = join(root, rel.as_str());
            assert!(!joined.contains("//"), "{joined}");
            assert!(joined.starts_with(root.trim_end_matches('/')), "{joined}");
            assert!(joined.ends_with(rel.as_str()));
        }
    }

    #[test]
    fn test_serde_round_trip_canonicalizes() {
        let rel: RelativePath = serde_json::from_str("\"/raw//a.h5\"").unwrap();
        assert_eq!(rel.as_str(), "raw/a.h5");
        assert!(serde_json::from_str::<RelativePath>("\"\"").is_err());
    }
}
