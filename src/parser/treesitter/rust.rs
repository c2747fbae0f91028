//! Rust fact extraction.
//!
//! `mod foo;` declarations become relative imports so that module files link
//! up in the dependency graph; `use` paths are recorded as written.

use tree_sitter::{Node, Tree};

use super::{named_children, FactBuilder};
use crate::parser::{ParsedFile, SymbolKind};

pub(super) fn extract(tree: &Tree, source: &[u8]) -> ParsedFile {
    let mut builder = FactBuilder::new(source);
    for child in named_children(tree.root_node()) {
        walk(&mut builder, child, false);
    }
    builder.finish()
}

fn is_pub(node: Node) -> bool {
    named_children(node)
        .iter()
        .any(|c| c.kind() == "visibility_modifier")
}

fn walk(b: &mut FactBuilder, node: Node, in_impl: bool) {
    let kind = match node.kind() {
        "function_item" if in_impl => Some(SymbolKind::Method),
        "function_item" => Some(SymbolKind::Function),
        "function_signature_item" => Some(SymbolKind::Method),
        "struct_item" | "enum_item" | "union_item" => Some(SymbolKind::Class),
        "trait_item" | "type_item" => Some(SymbolKind::Interface),
        "const_item" | "static_item" => Some(SymbolKind::Variable),
        _ => None,
    };

    if let Some(kind) = kind {
        let name = b.field_text(node, "name").unwrap_or("");
        let signature = match kind {
            SymbolKind::Function | SymbolKind::Method => b.signature(node),
            _ => None,
        };
        b.symbol(kind, name, node, signature);
        if !in_impl && is_pub(node) {
            b.export(name, node);
        }
    }

    match node.kind() {
        "struct_item" => {
            if let Some(body) = node.child_by_field_name("body") {
                for field in named_children(body)
                    .into_iter()
                    .filter(|f| f.kind() == "field_declaration")
                {
                    let name = b.field_text(field, "name").unwrap_or("");
                    b.symbol(SymbolKind::Property, name, field, None);
                }
            }
        }
        "impl_item" | "trait_item" => {
            if let Some(body) = node.child_by_field_name("body") {
                for child in named_children(body) {
                    walk(b, child, true);
                }
            }
        }
        "mod_item" => match node.child_by_field_name("body") {
            Some(body) => {
                for child in named_children(body) {
                    walk(b, child, false);
                }
            }
            None => {
                if let Some(name) = b.field_text(node, "name") {
                    b.import(format!("./{}", name), vec![name.to_string()], node);
                }
            }
        },
        "use_declaration" => {
            if let Some(argument) = b.field_text(node, "argument") {
                let bindings = use_bindings(argument);
                b.import(argument.to_string(), bindings, node);
            }
        }
        _ => {}
    }
}

/// Local names bound by a `use` argument such as `a::{b, c as d}`.
fn use_bindings(argument: &str) -> Vec<String> {
    let inner = match (argument.find('{'), argument.rfind('}')) {
        (Some(open), Some(close)) if open < close => &argument[open + 1..close],
        _ => argument,
    };

    inner
        .split(',')
        .filter_map(|item| {
            let item = item.trim();
            let local = match item.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => item.rsplit("::").next().unwrap_or(item).trim(),
            };
            if local.is_empty() || local == "*" || local == "self" || local.contains('{') {
                None
            } else {
                Some(local.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{SourceParser, TreeSitterParser};
    use std::path::Path;

    #[test]
    fn test_use_bindings() {
        assert_eq!(use_bindings("std::collections::HashMap"), vec!["HashMap"]);
        assert_eq!(
            use_bindings("crate::graph::{DependencyGraph, Cycle as C, self}"),
            vec!["DependencyGraph", "C"]
        );
        assert!(use_bindings("super::*").is_empty());
    }

    #[test]
    fn test_rust_facts() {
        let source = r#"
mod graph;
use std::collections::HashMap;

pub struct Index {
    symbols: HashMap<String, usize>,
}

impl Index {
    pub fn new() -> Self {
        Self { symbols: HashMap::new() }
    }
}

pub trait Store {
    fn get(&self, key: &str) -> Option<usize>;
}

const LIMIT: usize = 10;

fn helper() {}
"#;
        let parsed = TreeSitterParser::new()
            .parse(Path::new("lib.rs"), source)
            .unwrap();

        let find = |name: &str| parsed.symbols.iter().find(|s| s.name == name).map(|s| s.kind);
        assert_eq!(find("Index"), Some(SymbolKind::Class));
        assert_eq!(find("symbols"), Some(SymbolKind::Property));
        assert_eq!(find("new"), Some(SymbolKind::Method));
        assert_eq!(find("Store"), Some(SymbolKind::Interface));
        assert_eq!(find("get"), Some(SymbolKind::Method));
        assert_eq!(find("LIMIT"), Some(SymbolKind::Variable));
        assert_eq!(find("helper"), Some(SymbolKind::Function));

        let sources: Vec<&str> = parsed.imports.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["./graph", "std::collections::HashMap"]);

        let exports: Vec<&str> = parsed.exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(exports, vec!["Index", "Store"]);
    }
}
