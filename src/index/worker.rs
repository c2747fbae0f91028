//! Parallel file parsing on a bounded rayon pool.
//!
//! Workers only read and parse; they hand `(path, symbols, node)` results
//! back to the index owner, which is the only writer.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::errors::{ErrorCollector, ProcessingStage};
use super::progress::{BuildPhase, ProgressReporter};
use crate::error::{IndexError, Result};
use crate::graph::DependencyNode;
use crate::parser::SourceParser;
use crate::snapshot::FileRecord;
use crate::symbol::Symbol;

/// One successfully parsed file.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub relative_path: String,
    pub symbols: Vec<Symbol>,
    /// Imports and exports; resolution happens in the owner
    pub node: DependencyNode,
}

pub struct ParseWorkers {
    pool: Arc<rayon::ThreadPool>,
    parser: Arc<dyn SourceParser>,
    context_lines: usize,
}

impl ParseWorkers {
    pub fn new(parser: Arc<dyn SourceParser>, threads: Option<usize>, context_lines: usize) -> Result<Self> {
        let threads = threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("codeindex-parse-{}", i))
            .build()
            .map_err(|e| IndexError::Config(format!("Failed to initialize parse thread pool: {}", e)))?;
        info!("Using {} threads for parallel parsing", threads);

        Ok(Self {
            pool: Arc::new(pool),
            parser,
            context_lines,
        })
    }

    pub fn set_parser(&mut self, parser: Arc<dyn SourceParser>) {
        self.parser = parser;
    }

    pub fn supports(&self, relative_path: &str) -> bool {
        self.parser.supports(Path::new(relative_path))
    }

    /// Read and parse `records` off the async runtime.
    ///
    /// Per-file failures go to `errors` and the file is left out of the
    /// result. Cancellation is checked before each file.
    pub(crate) async fn parse_all(
        &self,
        records: Vec<FileRecord>,
        now_millis: i64,
        errors: &ErrorCollector,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ParsedSource>> {
        let total = records.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let pool = self.pool.clone();
        let parser = self.parser.clone();
        let context_lines = self.context_lines;
        let errors = errors.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();

        let parsed = tokio::task::spawn_blocking(move || {
            let done = AtomicUsize::new(0);
            let parsed: Vec<ParsedSource> = pool.install(|| {
                records
                    .par_iter()
                    .filter_map(|record| {
                        if cancel.is_cancelled() {
                            return None;
                        }
                        let result = parse_one(parser.as_ref(), record, context_lines, now_millis, &errors);
                        let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                        progress.report(BuildPhase::Parsing, current, total);
                        result
                    })
                    .collect()
            });
            if cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }
            Ok(parsed)
        })
        .await
        .map_err(|e| IndexError::Parse {
            path: Default::default(),
            message: format!("parse task failed: {}", e),
        })??;

        debug!(parsed = parsed.len(), total, "Parsed files");
        Ok(parsed)
    }
}

fn parse_one(
    parser: &dyn SourceParser,
    record: &FileRecord,
    context_lines: usize,
    now_millis: i64,
    errors: &ErrorCollector,
) -> Option<ParsedSource> {
    let content = match std::fs::read_to_string(&record.absolute_path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Skipping unreadable file {}: {}", record.relative_path, e);
            errors.record(record.relative_path.as_str(), e, ProcessingStage::Read);
            return None;
        }
    };

    let facts = match parser.parse(Path::new(&record.relative_path), &content) {
        Ok(facts) => facts,
        Err(e) => {
            let error = IndexError::Parse {
                path: record.absolute_path.clone(),
                message: format!("{:#}", e),
            };
            warn!("{}", error);
            errors.record(record.relative_path.as_str(), error, ProcessingStage::Parse);
            return None;
        }
    };

    let lines: Vec<&str> = content.lines().collect();
    let symbols = facts
        .symbols
        .iter()
        .map(|fact| Symbol::from_fact(&record.relative_path, fact, &lines, context_lines, now_millis))
        .collect();

    Some(ParsedSource {
        relative_path: record.relative_path.clone(),
        symbols,
        node: DependencyNode::new(record.relative_path.as_str(), facts.imports, facts.exports),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TreeSitterParser;
    use crate::snapshot::{capture, CaptureOptions};
    use std::fs;
    use tempfile::tempdir;

    fn workers() -> ParseWorkers {
        ParseWorkers::new(Arc::new(TreeSitterParser::new()), Some(2), 1).unwrap()
    }

    #[tokio::test]
    async fn test_parse_all_collects_symbols_and_imports() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "import { b } from './b';\nexport function a() { return b(); }\n").unwrap();
        fs::write(dir.path().join("b.ts"), "export function b() { return 1; }\n").unwrap();
        let snapshot = capture(dir.path(), &CaptureOptions::default()).unwrap();

        let errors = ErrorCollector::new();
        let mut parsed = workers()
            .parse_all(
                snapshot.files.values().cloned().collect(),
                7,
                &errors,
                &ProgressReporter::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        parsed.sort_by(|x, y| x.relative_path.cmp(&y.relative_path));

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].node.imports[0].source, "./b");
        assert!(parsed[0].symbols.iter().any(|s| s.name == "a" && s.indexed_at_millis == 7));
        assert_eq!(errors.error_count(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_recorded_and_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ok.ts"), "const x = 1;\n").unwrap();
        fs::write(dir.path().join("binary.ts"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let snapshot = capture(dir.path(), &CaptureOptions::default()).unwrap();

        let errors = ErrorCollector::new();
        let parsed = workers()
            .parse_all(
                snapshot.files.values().cloned().collect(),
                1,
                &errors,
                &ProgressReporter::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(errors.count_for(ProcessingStage::Read), 1);
    }

    #[tokio::test]
    async fn test_cancelled_parse() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "const a = 1;\n").unwrap();
        let snapshot = capture(dir.path(), &CaptureOptions::default()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = workers()
            .parse_all(
                snapshot.files.values().cloned().collect(),
                1,
                &ErrorCollector::new(),
                &ProgressReporter::default(),
                &cancel,
            )
            .await;
        assert!(matches!(result, Err(IndexError::Cancelled)));
    }
}
