//! Symbol records and the in-memory symbol index.

mod index;
mod search;
mod usages;

pub use crate::parser::SymbolKind;
pub use index::{SymbolIndex, SymbolIndexStats};
pub use search::{search, RankedSymbol, SymbolQuery, FUZZY_THRESHOLD};
pub use usages::{cross_references, find_usages, CrossReference, Usage, UsageKind, UsageScope};

use serde::{Deserialize, Serialize};

use crate::parser::SymbolFact;

/// A named code entity owned by the [`SymbolIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// `file:name:start_line`, stable across re-parses of an unchanged file
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub signature: Option<String>,
    /// Source lines `start_line..=end_line`
    pub content: String,
    /// `content` plus up to N lines on either side
    pub context_window: String,
    pub indexed_at_millis: i64,
}

impl Symbol {
    pub fn make_id(file_path: &str, name: &str, start_line: usize) -> String {
        format!("{}:{}:{}", file_path, name, start_line)
    }

    /// Build a symbol from a parser fact and the file's lines.
    pub fn from_fact(
        file_path: &str,
        fact: &SymbolFact,
        lines: &[&str],
        context_lines: usize,
        indexed_at_millis: i64,
    ) -> Self {
        let start = fact.start_line.max(1);
        let end = fact.end_line.max(start);

        Self {
            id: Self::make_id(file_path, &fact.name, start),
            name: fact.name.clone(),
            kind: fact.kind,
            file_path: file_path.to_string(),
            start_line: start,
            end_line: end,
            signature: fact.signature.clone(),
            content: slice_lines(lines, start, end),
            context_window: slice_lines(
                lines,
                start.saturating_sub(context_lines).max(1),
                end + context_lines,
            ),
            indexed_at_millis,
        }
    }

    /// Approximate heap footprint, used for the cache memory budget.
    pub fn estimated_bytes(&self) -> usize {
        const OVERHEAD: usize = 128;
        OVERHEAD
            + self.id.len()
            + self.name.len()
            + self.file_path.len()
            + self.signature.as_ref().map_or(0, |s| s.len())
            + self.content.len()
            + self.context_window.len()
    }

    /// Text handed to the embedding provider.
    pub fn embedding_text(&self) -> String {
        match &self.signature {
            Some(signature) => format!("{} {} {}\n{}", self.kind, self.name, signature, self.content),
            None => format!("{} {}\n{}", self.kind, self.name, self.content),
        }
    }
}

/// Lines `start..=end` (1-indexed), clamped to the file.
fn slice_lines(lines: &[&str], start: usize, end: usize) -> String {
    if lines.is_empty() || start > lines.len() {
        return String::new();
    }
    let end = end.min(lines.len());
    lines[start - 1..end].join("\n")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fact_slices_content_and_context() {
        let source = "a\nb\nfn target() {\n  body\n}\nc\nd\ne";
        let lines: Vec<&str> = source.lines().collect();
        let fact = SymbolFact {
            name: "target".to_string(),
            kind: SymbolKind::Function,
            start_line: 3,
            end_line: 5,
            signature: Some("fn target()".to_string()),
        };

        let symbol = Symbol::from_fact("src/lib.rs", &fact, &lines, 1, 42);
        assert_eq!(symbol.id, "src/lib.rs:target:3");
        assert_eq!(symbol.content, "fn target() {\n  body\n}");
        assert_eq!(symbol.context_window, "b\nfn target() {\n  body\n}\nc");

        let wide = Symbol::from_fact("src/lib.rs", &fact, &lines, 10, 42);
        assert_eq!(wide.context_window, source);
    }

    #[test]
    fn test_slice_lines_clamps() {
        let lines = vec!["one", "two"];
        assert_eq!(slice_lines(&lines, 2, 9), "two");
        assert_eq!(slice_lines(&lines, 3, 4), "");
    }

    #[test]
    fn test_embedding_text_includes_signature() {
        let mut s = test_support::symbol("a.ts", "load", SymbolKind::Function, 1);
        s.signature = Some("function load(id)".to_string());
        assert!(s.embedding_text().starts_with("function load function load(id)"));
    }
}
