//! On-disk form of the published index.
//!
//! JSON with an `index_version`; a file written by another version is
//! ignored rather than migrated.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{IndexState, IndexStats};
use crate::error::{IndexError, Result};
use crate::graph::DependencyGraph;
use crate::semantic::{EmbeddingCache, StoredEmbedding};
use crate::snapshot::Snapshot;
use crate::symbol::{Symbol, SymbolIndex};

pub const INDEX_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    index_version: u32,
    snapshot: Option<Snapshot>,
    symbols: Vec<Symbol>,
    symbols_updated_millis: i64,
    graph: DependencyGraph,
    embeddings: Vec<StoredEmbedding>,
    stats: IndexStats,
}

/// Write `state` to `path`, replacing any previous file atomically.
pub fn save(path: &Path, state: &IndexState) -> Result<()> {
    let mut symbols: Vec<Symbol> = state.symbols.iter().cloned().collect();
    symbols.sort_by(|a, b| a.id.cmp(&b.id));

    let persisted = PersistedIndex {
        index_version: INDEX_VERSION,
        snapshot: state.snapshot.clone(),
        symbols,
        symbols_updated_millis: state.symbols.last_updated_millis(),
        graph: state.graph.clone(),
        embeddings: state.embeddings.to_stored(),
        stats: state.stats.clone(),
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| IndexError::io(dir, e))?;
    }
    let json = serde_json::to_vec(&persisted).map_err(|e| IndexError::Persist(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| IndexError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| IndexError::io(path, e))?;

    debug!(path = %path.display(), symbols = persisted.symbols.len(), "Saved index");
    Ok(())
}

/// Load a previously saved state. `Ok(None)` when there is no file or it
/// was written by a different index version.
pub fn load(path: &Path) -> Result<Option<IndexState>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(IndexError::io(path, e)),
    };

    #[derive(Deserialize)]
    struct VersionProbe {
        index_version: u32,
    }
    let probe: VersionProbe =
        serde_json::from_slice(&bytes).map_err(|e| IndexError::Persist(format!("{}: {}", path.display(), e)))?;
    if probe.index_version != INDEX_VERSION {
        warn!(
            "Ignoring index at {} (version {}, expected {})",
            path.display(),
            probe.index_version,
            INDEX_VERSION
        );
        return Ok(None);
    }

    let persisted: PersistedIndex =
        serde_json::from_slice(&bytes).map_err(|e| IndexError::Persist(format!("{}: {}", path.display(), e)))?;

    let symbols = SymbolIndex::from_symbols(persisted.symbols, persisted.symbols_updated_millis);
    let embeddings = EmbeddingCache::from_stored(&symbols, persisted.embeddings);

    Ok(Some(IndexState {
        snapshot: persisted.snapshot,
        symbols,
        graph: persisted.graph,
        embeddings,
        stats: persisted.stats,
        errors: Default::default(),
    }))
}

pub fn remove(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(IndexError::io(path, e)),
    }
}
