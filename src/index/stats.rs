use serde::{Deserialize, Serialize};

use crate::snapshot::{ChangeSet, Snapshot};

/// Counts of the change set a build applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl From<&ChangeSet> for ChangeSummary {
    fn from(changes: &ChangeSet) -> Self {
        Self {
            added: changes.added.len(),
            modified: changes.modified.len(),
            deleted: changes.deleted.len(),
            unchanged: changes.unchanged,
        }
    }
}

/// Result of a build or incremental update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_symbols: usize,
    /// Source files with symbols or a graph node
    pub files_indexed: usize,
    /// Files that could not be read or parsed in this pass
    pub files_skipped: usize,
    pub memory_usage_mb: f64,
    pub last_updated_millis: i64,
    pub embeddings_generated: usize,
    pub embeddings_failed: usize,
    pub symbols_evicted: usize,
    pub changes: ChangeSummary,
    pub incremental: bool,
    pub duration_ms: u64,
}

/// Summary of the published snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub exists: bool,
    pub captured_at_millis: Option<i64>,
    pub file_count: usize,
    pub total_size: u64,
    pub version_tag: Option<String>,
}

impl SnapshotStats {
    pub fn of(snapshot: Option<&Snapshot>) -> Self {
        match snapshot {
            Some(s) => Self {
                exists: true,
                captured_at_millis: Some(s.captured_at_millis),
                file_count: s.file_count(),
                total_size: s.total_size(),
                version_tag: Some(s.version_tag.clone()),
            },
            None => Self::default(),
        }
    }
}

pub(crate) fn bytes_to_mb(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
