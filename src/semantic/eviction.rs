//! Memory-bounded eviction over a symbol index and its embedding cache.
//!
//! A symbol and its embedding always leave together. Recency is the
//! embedding's last access, or the symbol's index time when it has none.

use tracing::info;

use super::EmbeddingCache;
use crate::metrics::EVICTED_SYMBOLS;
use crate::symbol::SymbolIndex;

const HIGH_WATER_RATIO: f64 = 0.8;
const EVICT_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    budget_bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub evicted: Vec<String>,
    pub bytes_before: usize,
    pub bytes_after: usize,
}

impl EvictionPolicy {
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    pub fn from_megabytes(max_memory_mb: usize) -> Self {
        Self::new(max_memory_mb.saturating_mul(1024 * 1024))
    }

    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    pub fn high_water_bytes(&self) -> usize {
        (self.budget_bytes as f64 * HIGH_WATER_RATIO) as usize
    }

    /// Evict the least recently used fifth of symbols, repeatedly, until the
    /// estimate is back under the high-water mark.
    pub fn enforce(&self, symbols: &mut SymbolIndex, cache: &mut EmbeddingCache) -> EvictionReport {
        let high_water = self.high_water_bytes();
        let bytes_before = cache.estimated_bytes(symbols);
        let mut report = EvictionReport {
            bytes_before,
            bytes_after: bytes_before,
            ..Default::default()
        };

        while report.bytes_after > high_water && !symbols.is_empty() {
            let mut by_age: Vec<(i64, String)> = symbols
                .iter()
                .map(|s| {
                    let accessed = cache
                        .get(&s.id)
                        .map_or(s.indexed_at_millis, |e| e.last_accessed_millis());
                    (accessed, s.id.clone())
                })
                .collect();
            by_age.sort();

            let count = ((by_age.len() as f64 * EVICT_FRACTION).ceil() as usize).max(1);
            for (_, id) in by_age.into_iter().take(count) {
                symbols.remove_symbol(&id);
                cache.remove(&id);
                report.evicted.push(id);
            }
            report.bytes_after = cache.estimated_bytes(symbols);
        }

        if !report.evicted.is_empty() {
            EVICTED_SYMBOLS.inc_by(report.evicted.len() as f64);
            info!(
                evicted = report.evicted.len(),
                bytes_before = report.bytes_before,
                bytes_after = report.bytes_after,
                budget = self.budget_bytes,
                "Evicted least recently used symbols"
            );
        }
        report
    }
}
