//! Tree-sitter backed [`SourceParser`].
//!
//! Each worker thread keeps its own [`ParserPool`]; tree-sitter parsers are
//! not `Sync`, the grammars are.

mod parser_pool;
mod python;
mod rust;
mod typescript;

pub use parser_pool::ParserPool;

use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::ffi::OsStr;
use std::path::Path;
use tracing::debug;
use tree_sitter::Node;

use super::{ExportFact, ImportFact, ParsedFile, SourceParser, SymbolFact, SymbolKind};

thread_local! {
    static POOL: RefCell<ParserPool> = RefCell::new(ParserPool::new());
}

/// Parser for TypeScript, JavaScript, Python and Rust sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterParser;

impl TreeSitterParser {
    pub fn new() -> Self {
        Self
    }

    fn language_for(path: &Path) -> Option<&'static str> {
        path.extension()
            .and_then(OsStr::to_str)
            .and_then(ParserPool::detect_language_from_extension)
    }
}

impl SourceParser for TreeSitterParser {
    fn parse(&self, path: &Path, content: &str) -> Result<ParsedFile> {
        let language = Self::language_for(path)
            .ok_or_else(|| anyhow!("Unsupported file type: {}", path.display()))?;

        let tree = POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            let parser = pool
                .get_parser(language)
                .ok_or_else(|| anyhow!("No parser available for language '{}'", language))?;
            parser
                .parse(content, None)
                .ok_or_else(|| anyhow!("Parser produced no tree for {}", path.display()))
        })?;

        if tree.root_node().has_error() {
            debug!("Syntax errors in {}, extracting what parsed", path.display());
        }

        let source = content.as_bytes();
        let facts = match language {
            "python" => python::extract(&tree, source),
            "rust" => rust::extract(&tree, source),
            _ => typescript::extract(&tree, source),
        };
        Ok(facts)
    }

    fn supports(&self, path: &Path) -> bool {
        Self::language_for(path).is_some()
    }
}

/// Accumulates facts while an extractor walks a tree.
struct FactBuilder<'s> {
    source: &'s [u8],
    facts: ParsedFile,
}

impl<'s> FactBuilder<'s> {
    fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            facts: ParsedFile::default(),
        }
    }

    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source).unwrap_or("")
    }

    fn field_text(&self, node: Node, field: &str) -> Option<&'s str> {
        node.child_by_field_name(field)
            .map(|n| self.text(n))
            .filter(|t| !t.is_empty())
    }

    fn symbol(&mut self, kind: SymbolKind, name: &str, node: Node, signature: Option<String>) {
        if name.is_empty() {
            return;
        }
        self.facts.symbols.push(SymbolFact {
            name: name.to_string(),
            kind,
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            signature,
        });
    }

    fn import(&mut self, source: String, specifiers: Vec<String>, node: Node) {
        for name in &specifiers {
            self.symbol(SymbolKind::Import, name, node, None);
        }
        self.facts.imports.push(ImportFact {
            source,
            specifiers,
            line: node.start_position().row + 1,
        });
    }

    fn export(&mut self, name: &str, node: Node) {
        if name.is_empty() {
            return;
        }
        self.facts.exports.push(ExportFact {
            name: name.to_string(),
            line: node.start_position().row + 1,
        });
    }

    /// Declaration header: everything before the body, whitespace collapsed.
    fn signature(&self, node: Node) -> Option<String> {
        let end = node
            .child_by_field_name("body")
            .map(|b| b.start_byte())
            .unwrap_or_else(|| node.end_byte());
        let header = std::str::from_utf8(self.source.get(node.start_byte()..end)?).ok()?;
        let collapsed = header.split_whitespace().collect::<Vec<_>>().join(" ");
        let collapsed = collapsed.trim_end_matches([';', '=', ':', '{']).trim_end();
        if collapsed.is_empty() {
            None
        } else {
            Some(collapsed.to_string())
        }
    }

    fn finish(mut self) -> ParsedFile {
        self.facts
            .symbols
            .sort_by(|a, b| (a.start_line, &a.name).cmp(&(b.start_line, &b.name)));
        self.facts
    }
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

fn strip_quotes(raw: &str) -> String {
    raw.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}
