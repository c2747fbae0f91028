//! The index facade.
//!
//! [`CodeIndex`] owns one root: its snapshot, symbol index, dependency graph
//! and embedding cache. Builds run under a single writer lock and work on a
//! shadow copy of the published state, which is swapped in whole when the
//! pass completes. Queries only ever load the published state, so they never
//! see a half-applied change set and never wait for a build.

mod errors;
mod persist;
mod progress;
mod state;
mod stats;
mod worker;

pub use errors::{ErrorCollector, ErrorReport, FileError, ProcessingStage};
pub use persist::INDEX_VERSION;
pub use progress::{progress_channel, BuildPhase, ProgressEvent, ProgressReceiver, ProgressSender};
pub use state::{IndexPhase, IndexState};
pub use stats::{ChangeSummary, IndexStats, SnapshotStats};
pub use worker::{ParseWorkers, ParsedSource};

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embeddings::{EmbeddingProvider, HealthStatus};
use crate::error::{IndexError, Result};
use crate::graph::{
    analyze, analyze_module, detect_cycles, find_unreachable, infer_entry_points, Cycle, DependencyAnalysis,
    normalize_path, DependencyGraph, GraphBuilder, GraphExport, ImportResolver, ModuleAnalysis,
};
use crate::metrics::{
    INDEXED_FILES, INDEXED_SYMBOLS, INDEX_LATENCY, SEARCH_LATENCY, SEARCH_REQUESTS, SEARCH_RESULTS, SKIPPED_FILES,
};
use crate::parser::{SourceParser, TreeSitterParser};
use crate::semantic::{EmbeddingBuilder, EmbeddingJob, EvictionPolicy};
use crate::snapshot::{self, now_millis, CaptureOptions, ChangeSet, FileRecord, Snapshot};
use crate::symbol::{
    self, CrossReference, RankedSymbol, Symbol, SymbolIndexStats, SymbolKind, SymbolQuery, Usage, UsageScope,
};
use progress::ProgressReporter;

/// How a build runs.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Rebuild everything instead of applying the diff against the
    /// published snapshot
    pub force: bool,
    pub cancel: CancellationToken,
    pub progress: Option<ProgressSender>,
}

impl BuildOptions {
    pub fn force() -> Self {
        Self {
            force: true,
            ..Default::default()
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// One semantic search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub symbol: Symbol,
    /// Cosine similarity to the query
    pub score: f32,
    pub explanation: String,
}

impl SearchResult {
    fn new(symbol: Symbol, score: f32, query: &str) -> Self {
        let explanation = format!(
            "{}% match: {} \"{}\" - likely relevant to \"{}\"",
            (score * 100.0).round() as i64,
            symbol.kind,
            symbol.name,
            query
        );
        Self {
            symbol,
            score,
            explanation,
        }
    }
}

pub struct CodeIndex {
    root: PathBuf,
    config: Config,
    capture_options: CaptureOptions,
    workers: ParseWorkers,
    graph_builder: GraphBuilder,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    eviction: EvictionPolicy,
    published: ArcSwap<IndexState>,
    phase: watch::Sender<IndexPhase>,
    writer: Mutex<()>,
}

impl CodeIndex {
    /// An empty index over `root`, parsing with tree-sitter and without an
    /// embedding provider.
    pub fn new(root: impl AsRef<Path>, config: Config) -> Result<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| IndexError::io(root, e))?;

        let parser: Arc<dyn SourceParser> = Arc::new(TreeSitterParser::new());
        let workers = ParseWorkers::new(parser, config.indexer.parallel_threads, config.indexer.context_lines)?;
        let (phase, _) = watch::channel(IndexPhase::Empty);

        Ok(Self {
            capture_options: CaptureOptions::from(&config.indexer),
            graph_builder: GraphBuilder::new(ImportResolver::from_config(&config.dependencies)),
            eviction: EvictionPolicy::from_megabytes(config.embeddings.max_memory_mb),
            provider: None,
            published: ArcSwap::from_pointee(IndexState::default()),
            writer: Mutex::new(()),
            workers,
            phase,
            config,
            root,
        })
    }

    /// Like [`CodeIndex::new`], then load the persisted state if there is one.
    ///
    /// An unreadable or corrupt index file is logged and ignored.
    pub fn open(root: impl AsRef<Path>, config: Config) -> Result<Self> {
        let index = Self::new(root, config)?;
        match persist::load(&Config::index_path(&index.root)) {
            Ok(Some(state)) => {
                info!(
                    symbols = state.symbols.len(),
                    files = state.graph.len(),
                    "Loaded persisted index"
                );
                index.publish(state);
                index.phase.send_replace(IndexPhase::Ready);
            }
            Ok(None) => debug!("No persisted index under {}", index.root.display()),
            Err(e) => warn!("Ignoring persisted index: {}", e),
        }
        Ok(index)
    }

    pub fn with_parser(mut self, parser: Arc<dyn SourceParser>) -> Self {
        self.workers.set_parser(parser);
        self
    }

    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn has_embedding_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn phase(&self) -> IndexPhase {
        *self.phase.borrow()
    }

    /// Receiver that observes every phase transition.
    pub fn subscribe_phase(&self) -> watch::Receiver<IndexPhase> {
        self.phase.subscribe()
    }

    /// Build or refresh the index.
    ///
    /// Without `force`, and with a published snapshot, only the diff against
    /// that snapshot is applied; running it twice on an unchanged tree
    /// changes nothing. On error or cancellation the published state is left
    /// as it was.
    pub async fn build(&self, options: BuildOptions) -> Result<IndexStats> {
        let _writer = self.writer.lock().await;
        let previous = self.published.load_full();
        let prior_phase = self.phase();
        let incremental = !options.force && prior_phase == IndexPhase::Ready && previous.snapshot.is_some();
        let pass = Pass::begin(self, incremental, &options);

        let result = async {
            pass.reporter.report(BuildPhase::Scanning, 0, 0);
            let snapshot = self.capture_snapshot().await?;
            pass.check_cancelled()?;

            let base = if incremental {
                (*previous).clone()
            } else {
                IndexState::default()
            };
            let changes = snapshot::diff(base.snapshot.as_ref(), &snapshot);
            self.apply_changes(base, snapshot, changes, &pass).await
        }
        .await;

        self.finish(pass, prior_phase, result)
    }

    /// Diff-driven refresh: apply whatever changed on disk since the last build.
    pub async fn refresh(&self) -> Result<IndexStats> {
        self.build(BuildOptions::default()).await
    }

    /// Re-index exactly `changed` (absolute or root-relative paths). Paths
    /// that no longer exist, or are no longer tracked, are treated as deleted.
    pub async fn update_incremental(&self, changed: &[PathBuf]) -> Result<IndexStats> {
        let _writer = self.writer.lock().await;
        let previous = self.published.load_full();
        let prior_phase = self.phase();
        let Some(previous_snapshot) = previous.snapshot.as_ref().filter(|_| prior_phase == IndexPhase::Ready) else {
            return Err(IndexError::QueryBeforeReady {
                operation: "update_incremental",
                phase: prior_phase,
            });
        };

        let options = BuildOptions::default();
        let pass = Pass::begin(self, true, &options);

        let result = async {
            let mut files = previous_snapshot.files.clone();
            let keys: BTreeSet<String> = changed.iter().filter_map(|p| self.relative_key(p)).collect();
            for key in keys {
                match snapshot::record_file(&self.root, &key, &self.capture_options)? {
                    Some(record) => {
                        files.insert(key, record);
                    }
                    None => {
                        files.remove(&key);
                    }
                }
            }

            let snapshot = Snapshot::new(self.root.clone(), now_millis(), files);
            let changes = snapshot::diff(Some(previous_snapshot), &snapshot);
            self.apply_changes((*previous).clone(), snapshot, changes, &pass).await
        }
        .await;

        self.finish(pass, prior_phase, result)
    }

    async fn capture_snapshot(&self) -> Result<Snapshot> {
        let root = self.root.clone();
        let options = self.capture_options.clone();
        tokio::task::spawn_blocking(move || snapshot::capture(&root, &options))
            .await
            .map_err(|e| IndexError::io(&self.root, std::io::Error::other(e)))?
    }

    /// Apply `changes` to the shadow `state` and return it ready to publish.
    async fn apply_changes(
        &self,
        mut state: IndexState,
        snapshot: Snapshot,
        changes: ChangeSet,
        pass: &Pass,
    ) -> Result<IndexState> {
        if pass.incremental && changes.is_empty() {
            debug!(unchanged = changes.unchanged, "No changes since the last build");
            state.stats.changes = ChangeSummary::from(&changes);
            state.stats.incremental = true;
            state.stats.duration_ms = pass.start.elapsed().as_millis() as u64;
            state.snapshot = Some(snapshot);
            return Ok(state);
        }

        let errors = ErrorCollector::new();
        for entry in &snapshot.skipped {
            errors.record(entry.path.as_str(), &entry.reason, ProcessingStage::Read);
        }
        let now = now_millis();

        let to_parse: Vec<FileRecord> = changes
            .added
            .iter()
            .chain(changes.modified.iter())
            .filter(|r| self.is_indexable(&r.relative_path))
            .cloned()
            .collect();
        info!(
            added = changes.added.len(),
            modified = changes.modified.len(),
            deleted = changes.deleted.len(),
            parsing = to_parse.len(),
            incremental = pass.incremental,
            "Applying change set"
        );

        let parsed = self
            .workers
            .parse_all(to_parse, now, &errors, &pass.reporter, &pass.cancel)
            .await?;

        // Files that changed but produced nothing lose their old symbols and node.
        let parsed_paths: HashSet<&str> = parsed.iter().map(|p| p.relative_path.as_str()).collect();
        let mut removed: Vec<String> = changes.deleted.clone();
        removed.extend(
            changes
                .upserted_paths()
                .filter(|path| !parsed_paths.contains(path))
                .map(str::to_string),
        );
        for path in &removed {
            for id in state.symbols.remove_file(path) {
                state.embeddings.remove(&id);
            }
        }

        let mut new_ids: Vec<String> = Vec::new();
        let mut nodes = Vec::with_capacity(parsed.len());
        for source in parsed {
            pass.check_cancelled()?;
            for id in state.symbols.replace_file(&source.relative_path, source.symbols, now) {
                state.embeddings.remove(&id);
            }
            new_ids.extend(
                state
                    .symbols
                    .symbols_in_file(&source.relative_path)
                    .into_iter()
                    .map(|s| s.id.clone()),
            );
            nodes.push(source.node);
        }

        pass.reporter.report(BuildPhase::Finalizing, 0, 0);
        let known: HashSet<String> = snapshot.files.keys().cloned().collect();
        if pass.incremental {
            let file_set_changed = !changes.added.is_empty() || !changes.deleted.is_empty();
            self.graph_builder
                .update(&mut state.graph, nodes, &removed, &known, file_set_changed);
        } else {
            state.graph = self.graph_builder.build(nodes, &known);
        }

        let (embeddings_generated, embeddings_failed) =
            self.embed_symbols(&mut state, new_ids, now, &errors, pass).await?;

        let orphans = state.embeddings.purge_orphans(&state.symbols);
        if !orphans.is_empty() {
            warn!("Purged {} embeddings without symbols", orphans.len());
        }
        let eviction = self.eviction.enforce(&mut state.symbols, &mut state.embeddings);

        let files_skipped = errors.count_for(ProcessingStage::Read) + errors.count_for(ProcessingStage::Parse);
        state.stats = IndexStats {
            total_symbols: state.symbols.len(),
            files_indexed: state.graph.len(),
            files_skipped,
            memory_usage_mb: stats::bytes_to_mb(state.memory_bytes()),
            last_updated_millis: now,
            embeddings_generated,
            embeddings_failed,
            symbols_evicted: eviction.evicted.len(),
            changes: ChangeSummary::from(&changes),
            incremental: pass.incremental,
            duration_ms: pass.start.elapsed().as_millis() as u64,
        };
        state.snapshot = Some(snapshot);
        state.errors = errors.get_report();

        SKIPPED_FILES.inc_by(files_skipped as f64);
        Ok(state)
    }

    /// Embed `ids` into `state.embeddings`. Returns (generated, failed).
    async fn embed_symbols(
        &self,
        state: &mut IndexState,
        ids: Vec<String>,
        now: i64,
        errors: &ErrorCollector,
        pass: &Pass,
    ) -> Result<(usize, usize)> {
        let Some(provider) = &self.provider else {
            return Ok((0, 0));
        };
        let jobs: Vec<EmbeddingJob> = ids
            .into_iter()
            .filter_map(|id| {
                let text = state.symbols.get(&id)?.embedding_text();
                Some(EmbeddingJob { symbol_id: id, text })
            })
            .collect();
        if jobs.is_empty() {
            return Ok((0, 0));
        }

        let builder = EmbeddingBuilder::new(
            provider.clone(),
            self.config.embeddings.batch_size,
            self.config.embeddings.max_concurrent_batches,
        );
        let outcome = builder
            .run(jobs, &pass.cancel, |done, total| {
                pass.reporter.report(BuildPhase::Embedding, done, total)
            })
            .await?;

        let mut generated = 0;
        for (id, vector) in outcome.vectors {
            match state.embeddings.insert(&state.symbols, &id, vector, now) {
                Ok(()) => generated += 1,
                Err(e) => errors.record(id, e, ProcessingStage::Embedding),
            }
        }
        for id in outcome.failed {
            errors.record(id, "embedding provider failed", ProcessingStage::Embedding);
        }
        let failed = errors.count_for(ProcessingStage::Embedding);
        if failed > 0 {
            warn!("{} symbols have no embedding", failed);
        }
        Ok((generated, failed))
    }

    fn finish(&self, pass: Pass, prior_phase: IndexPhase, result: Result<IndexState>) -> Result<IndexStats> {
        match result {
            Ok(state) => {
                let stats = state.stats.clone();
                self.publish(state);
                self.phase.send_replace(IndexPhase::Ready);
                INDEX_LATENCY.observe(pass.start.elapsed().as_secs_f64());
                pass.reporter
                    .report(BuildPhase::Complete, stats.files_indexed, stats.files_indexed);
                info!(
                    symbols = stats.total_symbols,
                    files = stats.files_indexed,
                    skipped = stats.files_skipped,
                    embeddings = stats.embeddings_generated,
                    evicted = stats.symbols_evicted,
                    incremental = stats.incremental,
                    duration_ms = stats.duration_ms,
                    "Index build complete"
                );
                Ok(stats)
            }
            Err(e) => {
                self.phase.send_replace(prior_phase);
                if matches!(e, IndexError::Cancelled) {
                    pass.reporter.report(BuildPhase::Cancelled, 0, 0);
                    info!("Index build cancelled, keeping the previously published state");
                } else {
                    warn!("Index build failed: {}", e);
                }
                Err(e)
            }
        }
    }

    fn publish(&self, state: IndexState) {
        INDEXED_FILES.set(state.graph.len() as f64);
        INDEXED_SYMBOLS.set(state.symbols.len() as f64);
        self.published.store(Arc::new(state));
    }

    fn is_indexable(&self, relative_path: &str) -> bool {
        let has_extension = Path::new(relative_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.config.indexer.extensions.iter().any(|x| x == ext))
            .unwrap_or(false);
        has_extension && self.workers.supports(relative_path)
    }

    /// Root-relative `/`-separated key for a user-supplied path, with `.`
    /// and `..` segments folded. Paths that leave the root have no key.
    fn relative_key(&self, path: &Path) -> Option<String> {
        let key = if path.is_absolute() {
            snapshot::relative_key(&self.root, path).or_else(|| {
                let canonical = path.canonicalize().ok()?;
                snapshot::relative_key(&self.root, &canonical)
            })?
        } else {
            path.to_string_lossy().replace('\\', "/")
        };
        normalize_path(&key).filter(|key| !key.is_empty())
    }

    fn ready_state(&self, operation: &'static str) -> Result<Arc<IndexState>> {
        let phase = self.phase();
        if !phase.is_queryable() {
            return Err(IndexError::QueryBeforeReady { operation, phase });
        }
        Ok(self.published.load_full())
    }

    /// Semantic search over symbol embeddings.
    ///
    /// Embedding the query is bounded by `embeddings.query_timeout_ms`; on
    /// timeout the request fails.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let state = self.ready_state("search")?;
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| IndexError::Embedding("no embedding provider configured".to_string()))?;

        SEARCH_REQUESTS.inc();
        let start = Instant::now();
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let timeout = Duration::from_millis(self.config.embeddings.query_timeout_ms);
        let vector = match tokio::time::timeout(timeout, provider.embed_query(query)).await {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) => return Err(IndexError::Embedding(format!("{:#}", e))),
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Query embedding timed out");
                return Err(IndexError::Timeout(timeout));
            }
        };

        let hits = state.embeddings.search(
            &state.symbols,
            &vector,
            self.config.embeddings.relevance_floor,
            limit,
            now_millis(),
        );
        let results: Vec<SearchResult> = hits
            .into_iter()
            .map(|hit| SearchResult::new(hit.symbol, hit.similarity, query))
            .collect();

        SEARCH_RESULTS.observe(results.len() as f64);
        SEARCH_LATENCY.observe(start.elapsed().as_secs_f64());
        debug!(query, results = results.len(), "Semantic search");
        Ok(results)
    }

    /// Exact or fuzzy search over symbol names.
    pub fn search_symbols(&self, query: &SymbolQuery) -> Result<Vec<RankedSymbol>> {
        let state = self.ready_state("search_symbols")?;
        SEARCH_REQUESTS.inc();
        let start = Instant::now();
        let results = symbol::search(&state.symbols, query)?;
        SEARCH_RESULTS.observe(results.len() as f64);
        SEARCH_LATENCY.observe(start.elapsed().as_secs_f64());
        Ok(results)
    }

    pub fn symbols_in_file(&self, file: impl AsRef<Path>) -> Result<Vec<Symbol>> {
        let state = self.ready_state("symbols_in_file")?;
        let Some(key) = self.relative_key(file.as_ref()) else {
            return Ok(Vec::new());
        };
        Ok(state.symbols.symbols_in_file(&key).into_iter().cloned().collect())
    }

    pub fn symbols_of_kind(&self, kind: SymbolKind) -> Result<Vec<Symbol>> {
        let state = self.ready_state("symbols_of_kind")?;
        Ok(state.symbols.symbols_by_kind(kind).into_iter().cloned().collect())
    }

    pub fn find_usages(&self, name: &str, scope: UsageScope) -> Result<Vec<Usage>> {
        let state = self.ready_state("find_usages")?;
        Ok(symbol::find_usages(&state.symbols, name, scope, |file| self.read_source(file)))
    }

    pub fn cross_references(&self, name: &str) -> Result<Option<CrossReference>> {
        let state = self.ready_state("cross_references")?;
        Ok(symbol::cross_references(&state.symbols, name, |file| {
            self.read_source(file)
        }))
    }

    fn read_source(&self, relative_path: &str) -> Option<String> {
        std::fs::read_to_string(self.root.join(relative_path)).ok()
    }

    /// Internal files `file` imports.
    pub fn dependencies(&self, file: impl AsRef<Path>) -> Result<Vec<String>> {
        let state = self.ready_state("dependencies")?;
        let Some(key) = self.relative_key(file.as_ref()) else {
            return Ok(Vec::new());
        };
        Ok(state.graph.neighbors(&key).cloned().collect())
    }

    /// Files that import `file`.
    pub fn dependents(&self, file: impl AsRef<Path>) -> Result<Vec<String>> {
        let state = self.ready_state("dependents")?;
        let Some(key) = self.relative_key(file.as_ref()) else {
            return Ok(Vec::new());
        };
        Ok(state
            .graph
            .get(&key)
            .map(|n| n.dependents.iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn find_cycles(&self) -> Result<Vec<Cycle>> {
        let state = self.ready_state("find_cycles")?;
        Ok(detect_cycles(&state.graph))
    }

    /// Files unreachable from `entries`, or from inferred entry points when
    /// `entries` is empty.
    pub fn find_unreachable(&self, entries: &[String]) -> Result<Vec<String>> {
        let state = self.ready_state("find_unreachable")?;
        let entries = self.entry_keys(&state.graph, entries);
        Ok(find_unreachable(&state.graph, &entries))
    }

    pub fn analyze_dependencies(&self, entries: &[String]) -> Result<DependencyAnalysis> {
        let state = self.ready_state("analyze_dependencies")?;
        let entries = self.entry_keys(&state.graph, entries);
        Ok(analyze(&state.graph, &entries))
    }

    pub fn module_analysis(&self, file: impl AsRef<Path>) -> Result<Option<ModuleAnalysis>> {
        let state = self.ready_state("module_analysis")?;
        Ok(self
            .relative_key(file.as_ref())
            .and_then(|key| analyze_module(&state.graph, &key)))
    }

    pub fn graph_export(&self) -> Result<GraphExport> {
        let state = self.ready_state("graph_export")?;
        Ok(state.graph.to_export())
    }

    fn entry_keys(&self, graph: &DependencyGraph, entries: &[String]) -> Vec<String> {
        if entries.is_empty() {
            return infer_entry_points(graph);
        }
        entries
            .iter()
            .filter_map(|e| self.relative_key(Path::new(e)))
            .collect()
    }

    /// Statistics of the published state, available in every phase.
    pub fn stats(&self) -> IndexStats {
        let state = self.published.load();
        IndexStats {
            total_symbols: state.symbols.len(),
            memory_usage_mb: stats::bytes_to_mb(state.memory_bytes()),
            ..state.stats.clone()
        }
    }

    /// Symbol counts of the published state, by kind.
    pub fn symbol_stats(&self) -> SymbolIndexStats {
        self.published.load().symbols.stats()
    }

    pub fn snapshot_stats(&self) -> SnapshotStats {
        SnapshotStats::of(self.published.load().snapshot.as_ref())
    }

    /// Per-file failures of the last completed pass.
    pub fn last_error_report(&self) -> ErrorReport {
        self.published.load().errors.clone()
    }

    /// True when the published snapshot is older than `indexer.index_ttl_secs`.
    pub fn is_stale(&self) -> bool {
        let ttl_ms = self.config.indexer.index_ttl_secs.saturating_mul(1000) as i64;
        match &self.published.load().snapshot {
            Some(snapshot) => now_millis() - snapshot.captured_at_millis > ttl_ms,
            None => true,
        }
    }

    pub async fn embedding_health(&self) -> Option<HealthStatus> {
        let provider = self.provider.as_ref()?;
        Some(match provider.health_check().await {
            Ok(status) => status,
            Err(e) => HealthStatus::Unhealthy { error: e.to_string() },
        })
    }

    /// Drop all state, in memory and on disk.
    pub async fn clear(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        self.phase.send_replace(IndexPhase::Cleared);
        self.publish(IndexState::default());
        persist::remove(&Config::index_path(&self.root))?;
        info!("Cleared index for {}", self.root.display());
        Ok(())
    }

    /// Persist the published state under the root's state directory.
    pub async fn save(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let state = self.published.load_full();
        if state.snapshot.is_none() {
            return Err(IndexError::QueryBeforeReady {
                operation: "save",
                phase: self.phase(),
            });
        }
        let path = Config::index_path(&self.root);
        tokio::task::spawn_blocking(move || persist::save(&path, &state))
            .await
            .map_err(|e| IndexError::Persist(e.to_string()))?
    }
}

/// Bookkeeping for one build pass.
struct Pass {
    incremental: bool,
    start: Instant,
    reporter: ProgressReporter,
    cancel: CancellationToken,
}

impl Pass {
    fn begin(index: &CodeIndex, incremental: bool, options: &BuildOptions) -> Self {
        index.phase.send_replace(IndexPhase::Indexing { incremental });
        Self {
            incremental,
            start: Instant::now(),
            reporter: ProgressReporter::new(options.progress.clone()),
            cancel: options.cancel.clone(),
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(IndexError::Cancelled)
        } else {
            Ok(())
        }
    }
}
