use serde::{Deserialize, Serialize};

use super::{FileRecord, Snapshot};

/// Filesystem timestamp granularity absorbed when comparing mtimes.
pub const MTIME_TOLERANCE_MS: i64 = 1000;

/// Delta between two snapshots. The three lists are disjoint by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<FileRecord>,
    pub modified: Vec<FileRecord>,
    pub deleted: Vec<String>,
    /// Paths present in both snapshots with no detected change
    pub unchanged: usize,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Number of changed paths.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// Added and modified paths, in that order.
    pub fn upserted_paths(&self) -> impl Iterator<Item = &str> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .map(|r| r.relative_path.as_str())
    }
}

/// Compare `current` against `previous`.
///
/// With no previous snapshot every file is added. Otherwise a size change is
/// decisive, a checksum present on both sides settles the comparison on its
/// own, and only then is the mtime compared with [`MTIME_TOLERANCE_MS`].
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> ChangeSet {
    let Some(previous) = previous else {
        return ChangeSet {
            added: current.files.values().cloned().collect(),
            ..Default::default()
        };
    };

    let mut changes = ChangeSet::default();

    for (path, record) in &current.files {
        match previous.files.get(path) {
            None => changes.added.push(record.clone()),
            Some(old) if is_modified(old, record) => changes.modified.push(record.clone()),
            Some(_) => changes.unchanged += 1,
        }
    }

    changes.deleted = previous
        .files
        .keys()
        .filter(|path| !current.files.contains_key(*path))
        .cloned()
        .collect();

    changes
}

fn is_modified(old: &FileRecord, new: &FileRecord) -> bool {
    if old.size_bytes != new.size_bytes {
        return true;
    }
    if let (Some(a), Some(b)) = (&old.checksum, &new.checksum) {
        return a != b;
    }
    (old.modified_at_millis - new.modified_at_millis).abs() > MTIME_TOLERANCE_MS
}
