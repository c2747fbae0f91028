//! In-memory symbol index keyed by id, with name, file and kind lookups.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use super::{Symbol, SymbolKind};

/// Symbol storage with secondary indexes.
///
/// All mutation goes through [`SymbolIndex::replace_file`],
/// [`SymbolIndex::remove_file`] and [`SymbolIndex::remove_symbol`], which keep
/// the secondary maps in step with `symbols`.
#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
    symbols: HashMap<String, Symbol>,
    by_name: HashMap<String, BTreeSet<String>>,
    by_file: HashMap<String, BTreeSet<String>>,
    by_kind: HashMap<SymbolKind, BTreeSet<String>>,
    last_updated_millis: i64,
}

/// Summary counts for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolIndexStats {
    pub symbol_count: usize,
    pub file_count: usize,
    pub by_kind: BTreeMap<SymbolKind, usize>,
    pub last_updated_millis: i64,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an index from persisted symbols.
    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>, last_updated_millis: i64) -> Self {
        let mut index = Self::new();
        for symbol in symbols {
            index.insert(symbol);
        }
        index.last_updated_millis = last_updated_millis;
        index
    }

    /// Purge every symbol of `file_path`, then insert `symbols`.
    ///
    /// Returns the ids that were removed. Symbols whose id repeats within
    /// `symbols` keep their first occurrence.
    pub fn replace_file(&mut self, file_path: &str, symbols: Vec<Symbol>, now_millis: i64) -> Vec<String> {
        let removed = self.remove_file(file_path);

        let mut seen = BTreeSet::new();
        for symbol in symbols {
            debug_assert_eq!(symbol.file_path, file_path);
            if !seen.insert(symbol.id.clone()) {
                debug!("Duplicate symbol id {} in {}, keeping first", symbol.id, file_path);
                continue;
            }
            self.insert(symbol);
        }

        self.last_updated_millis = now_millis;
        removed
    }

    /// Remove every symbol of `file_path`, returning their ids.
    pub fn remove_file(&mut self, file_path: &str) -> Vec<String> {
        let Some(ids) = self.by_file.remove(file_path) else {
            return Vec::new();
        };
        let ids: Vec<String> = ids.into_iter().collect();
        for id in &ids {
            if let Some(symbol) = self.symbols.remove(id) {
                remove_from(&mut self.by_name, &symbol.name, id);
                remove_from(&mut self.by_kind, &symbol.kind, id);
            }
        }
        ids
    }

    pub fn remove_symbol(&mut self, id: &str) -> Option<Symbol> {
        let symbol = self.symbols.remove(id)?;
        remove_from(&mut self.by_name, &symbol.name, id);
        remove_from(&mut self.by_kind, &symbol.kind, id);
        remove_from(&mut self.by_file, &symbol.file_path, id);
        Some(symbol)
    }

    fn insert(&mut self, symbol: Symbol) {
        let id = symbol.id.clone();
        self.by_name
            .entry(symbol.name.clone())
            .or_default()
            .insert(id.clone());
        self.by_file
            .entry(symbol.file_path.clone())
            .or_default()
            .insert(id.clone());
        self.by_kind.entry(symbol.kind).or_default().insert(id.clone());
        self.symbols.insert(id, symbol);
    }

    pub fn get(&self, id: &str) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.symbols.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.symbols.keys()
    }

    pub fn find_by_name(&self, name: &str) -> Vec<&Symbol> {
        self.resolve(self.by_name.get(name))
    }

    /// Symbols of a file ordered by line.
    pub fn symbols_in_file(&self, file_path: &str) -> Vec<&Symbol> {
        let mut symbols = self.resolve(self.by_file.get(file_path));
        symbols.sort_by_key(|s| (s.start_line, s.end_line));
        symbols
    }

    pub fn symbols_by_kind(&self, kind: SymbolKind) -> Vec<&Symbol> {
        self.resolve(self.by_kind.get(&kind))
    }

    pub fn files(&self) -> impl Iterator<Item = &String> {
        self.by_file.keys()
    }

    pub fn has_file(&self, file_path: &str) -> bool {
        self.by_file.contains_key(file_path)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.by_file.len()
    }

    pub fn last_updated_millis(&self) -> i64 {
        self.last_updated_millis
    }

    pub fn stats(&self) -> SymbolIndexStats {
        SymbolIndexStats {
            symbol_count: self.len(),
            file_count: self.file_count(),
            by_kind: self
                .by_kind
                .iter()
                .map(|(kind, ids)| (*kind, ids.len()))
                .collect(),
            last_updated_millis: self.last_updated_millis,
        }
    }

    fn resolve(&self, ids: Option<&BTreeSet<String>>) -> Vec<&Symbol> {
        ids.map(|ids| ids.iter().filter_map(|id| self.symbols.get(id)).collect())
            .unwrap_or_default()
    }
}

fn remove_from<K>(map: &mut HashMap<K, BTreeSet<String>>, key: &K, id: &str)
where
    K: std::hash::Hash + Eq,
{
    if let Some(ids) = map.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            map.remove(key);
        }
    }
}
