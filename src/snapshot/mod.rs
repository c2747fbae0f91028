//! File snapshots of a source tree and the change sets derived from them.

mod capture;
mod diff;

pub use capture::{capture, record_file, CaptureOptions};
pub(crate) use capture::now_millis;
pub use diff::{diff, ChangeSet, MTIME_TOLERANCE_MS};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Metadata for one tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the snapshot root, `/`-separated
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub size_bytes: u64,
    pub modified_at_millis: i64,
    /// Hex SHA-256 of the file bytes, when computed
    pub checksum: Option<String>,
}

/// Point-in-time record of the tracked files under a root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub root_path: PathBuf,
    pub captured_at_millis: i64,
    pub files: BTreeMap<String, FileRecord>,
    /// Display-only tag derived from count, total size and capture time
    pub version_tag: String,
    /// Entries the capture could not read or stat
    #[serde(skip)]
    pub skipped: Vec<SkippedEntry>,
}

/// An entry left out of a snapshot because it could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: String,
    pub reason: String,
}

impl Snapshot {
    pub fn new(root_path: PathBuf, captured_at_millis: i64, files: BTreeMap<String, FileRecord>) -> Self {
        let version_tag = version_tag(&files, captured_at_millis);
        Self {
            root_path,
            captured_at_millis,
            files,
            version_tag,
            skipped: Vec::new(),
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn total_size(&self) -> u64 {
        self.files.values().map(|f| f.size_bytes).sum()
    }

    pub fn get(&self, relative_path: &str) -> Option<&FileRecord> {
        self.files.get(relative_path)
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.files.contains_key(relative_path)
    }
}

fn version_tag(files: &BTreeMap<String, FileRecord>, captured_at_millis: i64) -> String {
    let total: u64 = files.values().map(|f| f.size_bytes).sum();
    let digest = format!("{:x}", Sha256::digest(format!("{}-{}-{}", files.len(), total, captured_at_millis)));
    digest[..8].to_string()
}

/// Relative `/`-separated key for `path` under `root`.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_version_tag_is_short_and_stable() {
        let a = snapshot(vec![record("a.ts", 10, 5, None)]);
        let b = snapshot(vec![record("a.ts", 10, 99, None)]);
        assert_eq!(a.version_tag.len(), 8);
        // mtime is not part of the tag, only count, size and capture time
        assert_eq!(a.version_tag, b.version_tag);

        let c = snapshot(vec![record("a.ts", 11, 5, None)]);
        assert_ne!(a.version_tag, c.version_tag);
    }

    #[test]
    fn test_relative_key_uses_forward_slashes() {
        let root = Path::new("/repo");
        assert_eq!(
            relative_key(root, Path::new("/repo/src/lib/a.ts")),
            Some("src/lib/a.ts".to_string())
        );
        assert_eq!(relative_key(root, Path::new("/repo")), None);
        assert_eq!(relative_key(root, Path::new("/other/a.ts")), None);
    }

    #[test]
    fn test_totals() {
        let s = snapshot(vec![record("a.ts", 10, 0, None), record("b.ts", 5, 0, None)]);
        assert_eq!(s.file_count(), 2);
        assert_eq!(s.total_size(), 15);
        assert!(s.contains("b.ts"));
    }
}
