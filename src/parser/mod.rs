//! Per-file parse boundary.
//!
//! The index consumes symbol, import and export facts through
//! [`SourceParser`] and never looks at syntax itself. [`TreeSitterParser`]
//! is the built-in implementation.

pub mod treesitter;

pub use treesitter::TreeSitterParser;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of a named code entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Variable,
    Import,
    Method,
    Property,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 7] = [
        SymbolKind::Function,
        SymbolKind::Class,
        SymbolKind::Interface,
        SymbolKind::Variable,
        SymbolKind::Import,
        SymbolKind::Method,
        SymbolKind::Property,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Variable => "variable",
            SymbolKind::Import => "import",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A symbol as reported by a parser. Lines are 1-indexed and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFact {
    pub name: String,
    pub kind: SymbolKind,
    pub start_line: usize,
    pub end_line: usize,
    pub signature: Option<String>,
}

/// One import statement: the raw specifier and the names it binds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFact {
    pub source: String,
    pub specifiers: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFact {
    pub name: String,
    pub line: usize,
}

/// Everything a parser extracts from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub symbols: Vec<SymbolFact>,
    pub imports: Vec<ImportFact>,
    pub exports: Vec<ExportFact>,
}

/// Turns file contents into facts. Must be a pure function of its inputs.
pub trait SourceParser: Send + Sync {
    fn parse(&self, path: &Path, content: &str) -> anyhow::Result<ParsedFile>;

    /// Whether `path` is a file this parser understands.
    fn supports(&self, path: &Path) -> bool;
}
