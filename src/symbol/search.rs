//! Exact and fuzzy symbol search.
//!
//! Fuzzy relevance is a weighted blend of per-field nucleo scores (name 0.7,
//! kind 0.2, file path 0.1). Each field score is normalized against the
//! query's score on itself, so a perfect name match contributes the full 0.7.

use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32String};
use serde::Serialize;

use super::{Symbol, SymbolIndex, SymbolKind};
use crate::error::{IndexError, Result};

/// Minimum blended relevance for a fuzzy hit.
pub const FUZZY_THRESHOLD: f32 = 0.4;

const NAME_WEIGHT: f32 = 0.7;
const KIND_WEIGHT: f32 = 0.2;
const PATH_WEIGHT: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct SymbolQuery {
    pub text: String,
    /// Empty means every kind
    pub kinds: Vec<SymbolKind>,
    pub fuzzy: bool,
    pub case_sensitive: bool,
    pub limit: usize,
    /// Optional glob over the symbol's file path
    pub file_glob: Option<String>,
}

impl SymbolQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kinds: Vec::new(),
            fuzzy: true,
            case_sensitive: false,
            limit: 50,
            file_glob: None,
        }
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = SymbolKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn exact(mut self) -> Self {
        self.fuzzy = false;
        self
    }

    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn in_files(mut self, glob: impl Into<String>) -> Self {
        self.file_glob = Some(glob.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedSymbol {
    pub symbol: Symbol,
    pub score: f32,
}

/// Rank symbols of `index` against `query`, best first.
pub fn search(index: &SymbolIndex, query: &SymbolQuery) -> Result<Vec<RankedSymbol>> {
    let file_filter = query
        .file_glob
        .as_deref()
        .map(|g| glob::Pattern::new(g).map_err(|e| IndexError::invalid_pattern(g, e)))
        .transpose()?;

    let text = query.text.trim();
    if text.is_empty() || query.limit == 0 {
        return Ok(Vec::new());
    }

    let candidates = index.iter().filter(|s| {
        (query.kinds.is_empty() || query.kinds.contains(&s.kind))
            && file_filter
                .as_ref()
                .map_or(true, |p| p.matches(&s.file_path))
    });

    let mut ranked: Vec<RankedSymbol> = if query.fuzzy {
        let mut scorer = FuzzyScorer::new(text, query.case_sensitive);
        candidates
            .filter_map(|s| {
                let score = scorer.relevance(s);
                (score >= FUZZY_THRESHOLD).then(|| RankedSymbol {
                    symbol: s.clone(),
                    score,
                })
            })
            .collect()
    } else {
        let needle = fold(text, query.case_sensitive);
        candidates
            .filter_map(|s| {
                let name = fold(&s.name, query.case_sensitive);
                name.contains(&needle).then(|| RankedSymbol {
                    symbol: s.clone(),
                    score: needle.chars().count() as f32 / name.chars().count().max(1) as f32,
                })
            })
            .collect()
    };

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.symbol.name.cmp(&b.symbol.name))
            .then_with(|| a.symbol.file_path.cmp(&b.symbol.file_path))
            .then_with(|| a.symbol.start_line.cmp(&b.symbol.start_line))
    });
    ranked.truncate(query.limit);
    Ok(ranked)
}

fn fold(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}

struct FuzzyScorer {
    matcher: Matcher,
    pattern: Pattern,
    self_score: f32,
}

impl FuzzyScorer {
    fn new(query: &str, case_sensitive: bool) -> Self {
        let case = if case_sensitive {
            CaseMatching::Respect
        } else {
            CaseMatching::Ignore
        };
        let pattern = Pattern::new(query, case, Normalization::Smart, AtomKind::Fuzzy);
        let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);
        let own = Utf32String::from(query);
        let self_score = pattern
            .score(own.slice(..), &mut matcher)
            .unwrap_or(1)
            .max(1) as f32;

        Self {
            matcher,
            pattern,
            self_score,
        }
    }

    fn field(&mut self, haystack: &str) -> f32 {
        let haystack = Utf32String::from(haystack);
        self.pattern
            .score(haystack.slice(..), &mut self.matcher)
            .map(|s| (s as f32 / self.self_score).min(1.0))
            .unwrap_or(0.0)
    }

    fn relevance(&mut self, symbol: &Symbol) -> f32 {
        NAME_WEIGHT * self.field(&symbol.name)
            + KIND_WEIGHT * self.field(symbol.kind.as_str())
            + PATH_WEIGHT * self.field(&symbol.file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::symbol;
    use super::*;

    fn index() -> SymbolIndex {
        let mut index = SymbolIndex::new();
        index.replace_file(
            "src/users.ts",
            vec![
                symbol("src/users.ts", "getUser", SymbolKind::Function, 1),
                symbol("src/users.ts", "UserService", SymbolKind::Class, 10),
                symbol("src/users.ts", "userCache", SymbolKind::Variable, 30),
            ],
            1,
        );
        index.replace_file(
            "lib/orders.ts",
            vec![
                symbol("lib/orders.ts", "getOrder", SymbolKind::Function, 1),
                symbol("lib/orders.ts", "OrderRepo", SymbolKind::Class, 8),
            ],
            1,
        );
        index
    }

    #[test]
    fn test_exact_substring_is_case_insensitive_by_default() {
        let results = search(&index(), &SymbolQuery::new("user").exact()).unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.symbol.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"getUser"));
        assert!(names.contains(&"userCache"));

        let results = search(
            &index(),
            &SymbolQuery::new("user").exact().case_sensitive(true),
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol.name, "userCache");
    }

    #[test]
    fn test_exact_match_ranks_full_name_first() {
        let results = search(&index(), &SymbolQuery::new("getuser").exact()).unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fuzzy_finds_identical_name_first() {
        let results = search(&index(), &SymbolQuery::new("getOrder")).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].symbol.name, "getOrder");
        assert!(results[0].score >= NAME_WEIGHT);
        assert!(results.iter().all(|r| r.score >= FUZZY_THRESHOLD));
    }

    #[test]
    fn test_fuzzy_rejects_unrelated_names() {
        let results = search(&index(), &SymbolQuery::new("zzqx")).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_kind_filter_and_limit() {
        let results = search(
            &index(),
            &SymbolQuery::new("get").exact().kinds([SymbolKind::Function]).limit(1),
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol.kind, SymbolKind::Function);

        let results = search(
            &index(),
            &SymbolQuery::new("get").exact().kinds([SymbolKind::Class]),
        )
        .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_file_glob_filter() {
        let results = search(&index(), &SymbolQuery::new("get").exact().in_files("lib/**")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol.name, "getOrder");
    }

    #[test]
    fn test_invalid_glob_is_rejected() {
        let err = search(&index(), &SymbolQuery::new("get").in_files("src/[")).unwrap_err();
        assert!(matches!(err, IndexError::InvalidPattern { .. }));
    }
}
