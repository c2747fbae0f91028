use serde::Serialize;

use super::{ErrorReport, IndexStats};
use crate::graph::DependencyGraph;
use crate::semantic::EmbeddingCache;
use crate::snapshot::Snapshot;
use crate::symbol::SymbolIndex;

/// Index lifecycle:
/// `Empty -> Indexing -> Ready -> Indexing (incremental) -> Ready -> Cleared`,
/// with a build from `Cleared` starting over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "phase")]
pub enum IndexPhase {
    Empty,
    Indexing { incremental: bool },
    Ready,
    Cleared,
}

impl IndexPhase {
    /// Queries are answered from the published state while an incremental
    /// rebuild runs; a first build has nothing published yet.
    pub fn is_queryable(&self) -> bool {
        matches!(self, IndexPhase::Ready | IndexPhase::Indexing { incremental: true })
    }
}

impl std::fmt::Display for IndexPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexPhase::Empty => write!(f, "empty"),
            IndexPhase::Indexing { incremental: false } => write!(f, "indexing"),
            IndexPhase::Indexing { incremental: true } => write!(f, "indexing (incremental)"),
            IndexPhase::Ready => write!(f, "ready"),
            IndexPhase::Cleared => write!(f, "cleared"),
        }
    }
}

/// Everything a query reads. Published whole; never mutated once published.
#[derive(Debug, Clone, Default)]
pub struct IndexState {
    pub snapshot: Option<Snapshot>,
    pub symbols: SymbolIndex,
    pub graph: DependencyGraph,
    pub embeddings: EmbeddingCache,
    pub stats: IndexStats,
    /// Per-file failures of the pass that produced this state
    pub errors: ErrorReport,
}

impl IndexState {
    pub fn memory_bytes(&self) -> usize {
        self.embeddings.estimated_bytes(&self.symbols)
    }
}
