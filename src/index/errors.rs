//! Per-file failure collection during a build.
//!
//! Read and parse failures never abort a build; they are recorded here and
//! summarized in the build's statistics.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

/// Stage where an error occurred during processing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStage {
    Read,
    Parse,
    Embedding,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Read => write!(f, "File Read"),
            ProcessingStage::Parse => write!(f, "Parse"),
            ProcessingStage::Embedding => write!(f, "Embedding"),
        }
    }
}

/// Error that occurred while processing a file or symbol
#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    /// Root-relative file path, or a symbol id for embedding failures
    pub path: String,
    pub error: String,
    pub stage: ProcessingStage,
}

/// Collects errors from parallel workers
#[derive(Clone, Default)]
pub struct ErrorCollector {
    errors: Arc<Mutex<Vec<FileError>>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FileError>> {
        // a panicking worker must not hide everyone else's errors
        self.errors.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, path: impl Into<String>, error: impl std::fmt::Display, stage: ProcessingStage) {
        self.lock().push(FileError {
            path: path.into(),
            error: error.to_string(),
            stage,
        });
    }

    pub fn error_count(&self) -> usize {
        self.lock().len()
    }

    pub fn count_for(&self, stage: ProcessingStage) -> usize {
        self.lock().iter().filter(|e| e.stage == stage).count()
    }

    pub fn get_report(&self) -> ErrorReport {
        ErrorReport::from_errors(&self.lock())
    }
}

/// Detailed error report with statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorReport {
    pub total_errors: usize,
    pub by_stage: BTreeMap<ProcessingStage, Vec<FileError>>,
    pub summary: String,
}

impl ErrorReport {
    pub fn from_errors(errors: &[FileError]) -> Self {
        let mut by_stage: BTreeMap<ProcessingStage, Vec<FileError>> = BTreeMap::new();
        for error in errors {
            by_stage.entry(error.stage).or_default().push(error.clone());
        }

        let summary = if errors.is_empty() {
            "No errors occurred during processing".to_string()
        } else {
            format!("Processing completed with {} errors", errors.len())
        };

        Self {
            total_errors: errors.len(),
            by_stage,
            summary,
        }
    }

    /// Print a summary of the errors to stdout
    pub fn print_summary(&self) {
        if self.total_errors == 0 {
            println!("✅ {}", self.summary);
            return;
        }

        println!("⚠️  {}", self.summary);
        for (stage, errors) in &self.by_stage {
            println!("  {}: {} errors", stage, errors.len());
            for error in errors.iter().take(5) {
                println!("    - {}: {}", error.path, error.error);
            }
            if errors.len() > 5 {
                println!("    ... and {} more", errors.len() - 5);
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_groups_by_stage() {
        let collector = ErrorCollector::new();
        let worker = collector.clone();
        worker.record("a.ts", "permission denied", ProcessingStage::Read);
        worker.record("b.ts", "unexpected token", ProcessingStage::Parse);
        worker.record("c.ts", "unexpected token", ProcessingStage::Parse);

        assert_eq!(collector.error_count(), 3);
        assert_eq!(collector.count_for(ProcessingStage::Parse), 2);

        let report = collector.get_report();
        assert!(report.has_errors());
        assert_eq!(report.by_stage[&ProcessingStage::Read].len(), 1);
        assert_eq!(report.summary, "Processing completed with 3 errors");
    }

    #[test]
    fn test_empty_report() {
        let report = ErrorCollector::new().get_report();
        assert!(!report.has_errors());
        assert!(report.by_stage.is_empty());
    }
}
