use ignore::gitignore::GitignoreBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use ignore::{Walk, WalkBuilder};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsStr;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use super::{relative_key, FileRecord, SkippedEntry, Snapshot};
use crate::config::IndexerConfig;
use crate::error::{IndexError, Result};

/// What a capture tracks and how much work it does per file.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Extensions that get a checksum (when enabled)
    pub source_extensions: HashSet<String>,
    pub ignore_patterns: Vec<String>,
    pub max_depth: usize,
    pub max_file_size: u64,
    pub checksum_enabled: bool,
}

impl From<&IndexerConfig> for CaptureOptions {
    fn from(config: &IndexerConfig) -> Self {
        Self {
            source_extensions: config.extensions.iter().cloned().collect(),
            ignore_patterns: config.ignore_patterns.clone(),
            max_depth: config.max_depth,
            max_file_size: config.max_file_size,
            checksum_enabled: config.checksum_enabled,
        }
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::from(&IndexerConfig::default())
    }
}

/// Per-directory ignore files, highest precedence first.
const IGNORE_FILES: [&str; 2] = [".ignore", ".gitignore"];

/// Walk `root` and record every tracked file.
///
/// Directories are descended at most `max_depth` levels below the root.
/// `.ignore` and `.gitignore` files under the root apply whether or not the
/// tree is a git checkout. Unreadable entries are logged and listed in
/// [`Snapshot::skipped`]; a checksum failure leaves that file's checksum
/// empty. Only a missing root or a malformed ignore pattern fails the
/// capture.
pub fn capture(root: &Path, options: &CaptureOptions) -> Result<Snapshot> {
    let root = root
        .canonicalize()
        .map_err(|e| IndexError::io(root, e))?;
    if !root.is_dir() {
        return Err(IndexError::io(
            &root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "root is not a directory"),
        ));
    }

    let overrides = build_overrides(&root, &options.ignore_patterns)?;

    let mut records: Vec<FileRecord> = Vec::new();
    let mut skipped: Vec<SkippedEntry> = Vec::new();

    for entry in walker(&root, options, overrides) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = error_path(&e)
                    .and_then(|p| relative_key(&root, p))
                    .unwrap_or_else(|| root.display().to_string());
                warn!("Skipping unreadable entry {}: {}", path, e);
                skipped.push(SkippedEntry {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!("Cannot stat {}: {}", entry.path().display(), e);
                skipped.push(SkippedEntry {
                    path: relative_key(&root, entry.path()).unwrap_or_else(|| entry.path().display().to_string()),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if metadata.len() > options.max_file_size {
            debug!(
                "Skipping {} ({} bytes exceeds limit)",
                entry.path().display(),
                metadata.len()
            );
            continue;
        }
        let Some(relative_path) = relative_key(&root, entry.path()) else {
            continue;
        };

        records.push(FileRecord {
            relative_path,
            absolute_path: entry.path().to_path_buf(),
            size_bytes: metadata.len(),
            modified_at_millis: metadata.modified().map(system_time_millis).unwrap_or(0),
            checksum: None,
        });
    }

    if options.checksum_enabled {
        records
            .par_iter_mut()
            .filter(|r| is_source(&r.absolute_path, &options.source_extensions))
            .for_each(|record| {
                record.checksum = checksum_file(&record.absolute_path);
            });
    }

    debug!(
        root = %root.display(),
        files = records.len(),
        skipped = skipped.len(),
        "Captured snapshot"
    );
    if !skipped.is_empty() {
        warn!("{} entries under {} could not be read", skipped.len(), root.display());
    }

    let files: BTreeMap<String, FileRecord> = records
        .into_iter()
        .map(|r| (r.relative_path.clone(), r))
        .collect();
    let mut snapshot = Snapshot::new(root, now_millis(), files);
    snapshot.skipped = skipped;
    Ok(snapshot)
}

fn walker(root: &Path, options: &CaptureOptions, overrides: Override) -> Walk {
    WalkBuilder::new(root)
        .hidden(true)
        .follow_links(false)
        // only ignore files under the root apply, matching `record_file`
        .parents(false)
        .require_git(false)
        .git_global(false)
        .git_exclude(false)
        // files inside a directory at depth `max_depth` still count
        .max_depth(Some(options.max_depth + 1))
        .overrides(overrides)
        .build()
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => error_path(err),
        _ => None,
    }
}

/// Record a single file under `root` (canonical) the way [`capture`] would.
///
/// `Ok(None)` when the file is missing, ignored, hidden or too large.
pub fn record_file(root: &Path, relative_path: &str, options: &CaptureOptions) -> Result<Option<FileRecord>> {
    let overrides = build_overrides(root, &options.ignore_patterns)?;
    let absolute_path = root.join(relative_path);

    let hidden = relative_path.split('/').any(|part| part.starts_with('.'));
    let depth = relative_path.split('/').count();
    if hidden
        || depth > options.max_depth + 1
        || overrides.matched(&absolute_path, false).is_ignore()
        || excluded_by_ignore_files(root, &absolute_path)
    {
        return Ok(None);
    }

    let metadata = match std::fs::metadata(&absolute_path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(IndexError::io(&absolute_path, e)),
    };
    if metadata.len() > options.max_file_size {
        return Ok(None);
    }

    let checksum = if options.checksum_enabled && is_source(&absolute_path, &options.source_extensions) {
        checksum_file(&absolute_path)
    } else {
        None
    };

    Ok(Some(FileRecord {
        relative_path: relative_path.to_string(),
        size_bytes: metadata.len(),
        modified_at_millis: metadata.modified().map(system_time_millis).unwrap_or(0),
        checksum,
        absolute_path,
    }))
}

/// Whether an ignore file between `root` and `path` excludes `path`.
///
/// The deepest directory with a matching rule decides, and `.ignore` takes
/// precedence over `.gitignore` in the same directory.
fn excluded_by_ignore_files(root: &Path, path: &Path) -> bool {
    for dir in path.ancestors().skip(1).take_while(|dir| dir.starts_with(root)) {
        for name in IGNORE_FILES {
            let file = dir.join(name);
            if !file.is_file() {
                continue;
            }
            let mut builder = GitignoreBuilder::new(dir);
            if let Some(e) = builder.add(&file) {
                warn!("Bad ignore file {}: {}", file.display(), e);
            }
            let matcher = match builder.build() {
                Ok(matcher) => matcher,
                Err(e) => {
                    warn!("Bad ignore file {}: {}", file.display(), e);
                    continue;
                }
            };
            let matched = matcher.matched_path_or_any_parents(path, false);
            if matched.is_ignore() {
                return true;
            }
            if matched.is_whitelist() {
                return false;
            }
        }
    }
    false
}

/// Ignore patterns as whitelist-negations, so a match means "skip".
fn build_overrides(root: &Path, patterns: &[String]) -> Result<Override> {
    let mut overrides = OverrideBuilder::new(root);
    for pattern in patterns {
        overrides
            .add(&format!("!{}", pattern))
            .map_err(|e| IndexError::invalid_pattern(pattern.as_str(), e))?;
    }
    overrides
        .build()
        .map_err(|e| IndexError::invalid_pattern(patterns.join(","), e))
}

fn is_source(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| extensions.contains(ext))
        .unwrap_or(false)
}

fn checksum_file(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(format!("{:x}", Sha256::digest(&bytes))),
        Err(e) => {
            warn!("Checksum failed for {}: {}", path.display(), e);
            None
        }
    }
}

fn system_time_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub(crate) fn now_millis() -> i64 {
    system_time_millis(SystemTime::now())
}
