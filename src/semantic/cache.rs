//! Embedding storage keyed by symbol id.
//!
//! Every entry must correspond to a symbol in the [`SymbolIndex`] it is paired
//! with. Inserts check it; [`EmbeddingCache::purge_orphans`] repairs it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cosine_similarity;
use crate::error::{IndexError, Result};
use crate::symbol::{Symbol, SymbolIndex};

/// One symbol's vector.
///
/// The last-access time is atomic so searches over a shared, published
/// cache can record hits without a write lock.
#[derive(Debug)]
pub struct EmbeddingEntry {
    pub symbol_id: String,
    pub vector: Vec<f32>,
    last_accessed_millis: AtomicI64,
}

impl EmbeddingEntry {
    pub fn new(symbol_id: impl Into<String>, vector: Vec<f32>, now_millis: i64) -> Self {
        Self {
            symbol_id: symbol_id.into(),
            vector,
            last_accessed_millis: AtomicI64::new(now_millis),
        }
    }

    pub fn last_accessed_millis(&self) -> i64 {
        self.last_accessed_millis.load(Ordering::Relaxed)
    }

    pub fn touch(&self, now_millis: i64) {
        self.last_accessed_millis.fetch_max(now_millis, Ordering::Relaxed);
    }
}

/// Serialized form of an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub symbol_id: String,
    pub vector: Vec<f32>,
    pub last_accessed_millis: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticHit {
    pub symbol: Symbol,
    pub similarity: f32,
}

/// Cloning shares entries, so access times stay common to every copy.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingCache {
    entries: HashMap<String, Arc<EmbeddingEntry>>,
    dimension: Option<usize>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `vector` for `symbol_id`, which must exist in `symbols`.
    ///
    /// All vectors in one cache share a dimension; the first insert fixes it.
    pub fn insert(&mut self, symbols: &SymbolIndex, symbol_id: &str, vector: Vec<f32>, now_millis: i64) -> Result<()> {
        if !symbols.contains(symbol_id) {
            return Err(IndexError::EvictionInvariantViolation {
                symbol_id: symbol_id.to_string(),
            });
        }
        match self.dimension {
            Some(dim) if dim != vector.len() => {
                return Err(IndexError::Embedding(format!(
                    "vector for {} has dimension {}, expected {}",
                    symbol_id,
                    vector.len(),
                    dim
                )));
            }
            Some(_) => {}
            None => self.dimension = Some(vector.len()),
        }

        self.entries.insert(
            symbol_id.to_string(),
            Arc::new(EmbeddingEntry::new(symbol_id, vector, now_millis)),
        );
        Ok(())
    }

    pub fn get(&self, symbol_id: &str) -> Option<&EmbeddingEntry> {
        self.entries.get(symbol_id).map(Arc::as_ref)
    }

    pub fn contains(&self, symbol_id: &str) -> bool {
        self.entries.contains_key(symbol_id)
    }

    pub fn remove(&mut self, symbol_id: &str) -> bool {
        self.entries.remove(symbol_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn entries(&self) -> impl Iterator<Item = &EmbeddingEntry> {
        self.entries.values().map(Arc::as_ref)
    }

    /// Symbol payload plus `dimension * 4` bytes per vector.
    pub fn estimated_bytes(&self, symbols: &SymbolIndex) -> usize {
        let symbol_bytes: usize = symbols.iter().map(Symbol::estimated_bytes).sum();
        symbol_bytes + self.entries.len() * self.dimension.unwrap_or(0) * std::mem::size_of::<f32>()
    }

    /// Rank cached symbols by cosine similarity to `query`.
    ///
    /// Hits below `floor` and entries with undefined similarity are dropped.
    /// Returned entries have their access time bumped.
    pub fn search(
        &self,
        symbols: &SymbolIndex,
        query: &[f32],
        floor: f32,
        limit: usize,
        now_millis: i64,
    ) -> Vec<SemanticHit> {
        if limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(&EmbeddingEntry, f32)> = self
            .entries
            .values()
            .filter_map(|entry| {
                let similarity = cosine_similarity(query, &entry.vector)?;
                (similarity >= floor).then_some((entry.as_ref(), similarity))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.0.symbol_id.cmp(&b.0.symbol_id))
        });

        let mut hits = Vec::with_capacity(limit.min(scored.len()));
        for (entry, similarity) in scored {
            if hits.len() == limit {
                break;
            }
            let Some(symbol) = symbols.get(&entry.symbol_id) else {
                warn!(symbol_id = %entry.symbol_id, "Skipping embedding without a symbol");
                continue;
            };
            entry.touch(now_millis);
            hits.push(SemanticHit {
                symbol: symbol.clone(),
                similarity,
            });
        }
        hits
    }

    /// Drop entries whose symbol is gone. Returns the purged ids.
    pub fn purge_orphans(&mut self, symbols: &SymbolIndex) -> Vec<String> {
        let orphans: Vec<String> = self
            .entries
            .keys()
            .filter(|id| !symbols.contains(id))
            .cloned()
            .collect();

        for id in &orphans {
            self.entries.remove(id);
            let violation = IndexError::EvictionInvariantViolation { symbol_id: id.clone() };
            warn!("Purged cache entry: {}", violation);
        }
        if self.entries.is_empty() {
            self.dimension = None;
        }
        orphans
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dimension = None;
    }

    pub fn to_stored(&self) -> Vec<StoredEmbedding> {
        let mut stored: Vec<StoredEmbedding> = self
            .entries
            .values()
            .map(|e| StoredEmbedding {
                symbol_id: e.symbol_id.clone(),
                vector: e.vector.clone(),
                last_accessed_millis: e.last_accessed_millis(),
            })
            .collect();
        stored.sort_by(|a, b| a.symbol_id.cmp(&b.symbol_id));
        stored
    }

    /// Rebuild from persisted entries, skipping any that fail the insert checks.
    pub fn from_stored(symbols: &SymbolIndex, stored: Vec<StoredEmbedding>) -> Self {
        let mut cache = Self::new();
        for entry in stored {
            if let Err(e) = cache.insert(symbols, &entry.symbol_id, entry.vector, entry.last_accessed_millis) {
                warn!("Dropping persisted embedding: {}", e);
            }
        }
        cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::test_support::symbol;
    use crate::symbol::SymbolKind;

    fn symbols() -> SymbolIndex {
        let mut index = SymbolIndex::new();
        index.replace_file(
            "a.ts",
            vec![
                symbol("a.ts", "alpha", SymbolKind::Function, 1),
                symbol("a.ts", "beta", SymbolKind::Function, 5),
                symbol("a.ts", "gamma", SymbolKind::Function, 9),
            ],
            1,
        );
        index
    }

    #[test]
    fn test_insert_requires_symbol() {
        let index = symbols();
        let mut cache = EmbeddingCache::new();
        assert!(cache.insert(&index, "a.ts:alpha:1", vec![1.0, 0.0], 1).is_ok());
        let err = cache.insert(&index, "a.ts:missing:1", vec![1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, IndexError::EvictionInvariantViolation { .. }));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let index = symbols();
        let mut cache = EmbeddingCache::new();
        cache.insert(&index, "a.ts:alpha:1", vec![1.0, 0.0], 1).unwrap();
        let err = cache.insert(&index, "a.ts:beta:5", vec![1.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, IndexError::Embedding(_)));
        assert_eq!(cache.dimension(), Some(2));
    }

    #[test]
    fn test_search_floor_order_and_touch() {
        let index = symbols();
        let mut cache = EmbeddingCache::new();
        cache.insert(&index, "a.ts:alpha:1", vec![1.0, 0.0], 1).unwrap();
        cache.insert(&index, "a.ts:beta:5", vec![0.9, 0.1], 1).unwrap();
        cache.insert(&index, "a.ts:gamma:9", vec![0.0, 1.0], 1).unwrap();

        let hits = cache.search(&index, &[1.0, 0.0], 0.7, 10, 50);
        let names: Vec<&str> = hits.iter().map(|h| h.symbol.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert!(hits[0].similarity >= hits[1].similarity);
        assert_eq!(cache.get("a.ts:alpha:1").unwrap().last_accessed_millis(), 50);
        assert_eq!(cache.get("a.ts:gamma:9").unwrap().last_accessed_millis(), 1);

        assert_eq!(cache.search(&index, &[1.0, 0.0], 0.7, 1, 60).len(), 1);
        assert!(cache.search(&index, &[0.0, 0.0], 0.0, 10, 60).is_empty());
    }

    #[test]
    fn test_purge_orphans() {
        let mut index = symbols();
        let mut cache = EmbeddingCache::new();
        cache.insert(&index, "a.ts:alpha:1", vec![1.0], 1).unwrap();
        cache.insert(&index, "a.ts:beta:5", vec![1.0], 1).unwrap();

        index.remove_symbol("a.ts:beta:5");
        assert_eq!(cache.purge_orphans(&index), vec!["a.ts:beta:5"]);
        assert!(cache.entries().all(|e| index.contains(&e.symbol_id)));
    }

    #[test]
    fn test_estimated_bytes_counts_vectors() {
        let index = symbols();
        let mut cache = EmbeddingCache::new();
        let base = cache.estimated_bytes(&index);
        cache.insert(&index, "a.ts:alpha:1", vec![0.5; 8], 1).unwrap();
        assert_eq!(cache.estimated_bytes(&index), base + 32);
    }

    #[test]
    fn test_clones_share_access_times() {
        let index = symbols();
        let mut cache = EmbeddingCache::new();
        cache.insert(&index, "a.ts:alpha:1", vec![1.0, 0.0], 1).unwrap();
        let published = cache.clone();
        published.search(&index, &[1.0, 0.0], 0.5, 1, 99);
        assert_eq!(cache.get("a.ts:alpha:1").unwrap().last_accessed_millis(), 99);
    }
}
