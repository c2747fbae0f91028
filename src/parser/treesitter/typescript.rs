//! TypeScript / JavaScript fact extraction.
//!
//! Top-level and class-level declarations become symbols; function bodies
//! are not descended except to find `require(...)` and dynamic `import(...)`.

use tree_sitter::{Node, Tree};

use super::{named_children, strip_quotes, FactBuilder};
use crate::parser::{ParsedFile, SymbolKind};

pub(super) fn extract(tree: &Tree, source: &[u8]) -> ParsedFile {
    let mut builder = FactBuilder::new(source);
    let root = tree.root_node();
    walk(&mut builder, root, false);
    collect_requires(&mut builder, root);
    builder.finish()
}

fn walk(b: &mut FactBuilder, node: Node, in_class: bool) {
    match node.kind() {
        "import_statement" => import_statement(b, node),
        "export_statement" => export_statement(b, node, in_class),
        "function_declaration" | "generator_function_declaration" => {
            declare(b, node, SymbolKind::Function);
        }
        "class_declaration" | "abstract_class_declaration" | "class" => {
            declare(b, node, SymbolKind::Class);
            if let Some(body) = node.child_by_field_name("body") {
                for child in named_children(body) {
                    walk(b, child, true);
                }
            }
        }
        "method_definition" | "method_signature" | "abstract_method_signature" if in_class => {
            declare(b, node, SymbolKind::Method);
        }
        "public_field_definition" | "field_definition" if in_class => {
            let name = b
                .field_text(node, "name")
                .or_else(|| b.field_text(node, "property"))
                .unwrap_or("");
            b.symbol(SymbolKind::Property, name, node, None);
        }
        "interface_declaration" | "type_alias_declaration" => {
            declare(b, node, SymbolKind::Interface);
        }
        "enum_declaration" => declare(b, node, SymbolKind::Class),
        "lexical_declaration" | "variable_declaration" => {
            for (name, kind) in declarators(b, node) {
                let signature = if kind == SymbolKind::Function {
                    b.signature(node)
                } else {
                    None
                };
                b.symbol(kind, &name, node, signature);
            }
        }
        "statement_block" | "arrow_function" | "function_expression" | "function" => {}
        _ => {
            for child in named_children(node) {
                walk(b, child, in_class);
            }
        }
    }
}

fn declare(b: &mut FactBuilder, node: Node, kind: SymbolKind) {
    let name = b.field_text(node, "name").unwrap_or("");
    let signature = match kind {
        SymbolKind::Function | SymbolKind::Method => b.signature(node),
        _ => None,
    };
    b.symbol(kind, name, node, signature);
}

/// `(name, kind)` for each simple declarator; function values make functions.
fn declarators(b: &FactBuilder, node: Node) -> Vec<(String, SymbolKind)> {
    named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "variable_declarator")
        .filter_map(|decl| {
            let name = decl.child_by_field_name("name")?;
            if name.kind() != "identifier" {
                return None;
            }
            let kind = match decl.child_by_field_name("value").map(|v| v.kind()) {
                Some("arrow_function" | "function_expression" | "function") => SymbolKind::Function,
                _ => SymbolKind::Variable,
            };
            Some((b.text(name).to_string(), kind))
        })
        .collect()
}

fn import_statement(b: &mut FactBuilder, node: Node) {
    let Some(source) = b.field_text(node, "source").map(strip_quotes) else {
        return;
    };

    let mut bindings = Vec::new();
    for clause in named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "import_clause")
    {
        for part in named_children(clause) {
            match part.kind() {
                "identifier" => bindings.push(b.text(part).to_string()),
                "namespace_import" => {
                    if let Some(id) = named_children(part)
                        .into_iter()
                        .find(|n| n.kind() == "identifier")
                    {
                        bindings.push(b.text(id).to_string());
                    }
                }
                "named_imports" => {
                    for spec in named_children(part)
                        .into_iter()
                        .filter(|n| n.kind() == "import_specifier")
                    {
                        let local = b
                            .field_text(spec, "alias")
                            .or_else(|| b.field_text(spec, "name"));
                        if let Some(local) = local {
                            bindings.push(local.to_string());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    b.import(source, bindings, node);
}

fn export_statement(b: &mut FactBuilder, node: Node, in_class: bool) {
    let mut clause_names = Vec::new();
    for clause in named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "export_clause")
    {
        for spec in named_children(clause)
            .into_iter()
            .filter(|n| n.kind() == "export_specifier")
        {
            let exported = b
                .field_text(spec, "alias")
                .or_else(|| b.field_text(spec, "name"));
            if let Some(name) = exported {
                clause_names.push(name.to_string());
            }
        }
    }

    // export { x } from './y' and export * from './y' are dependencies too
    if let Some(source) = b.field_text(node, "source").map(strip_quotes) {
        b.facts.imports.push(crate::parser::ImportFact {
            source,
            specifiers: clause_names.clone(),
            line: node.start_position().row + 1,
        });
    }

    for name in &clause_names {
        b.export(name, node);
    }

    let is_default = {
        let mut cursor = node.walk();
        let found = node.children(&mut cursor).any(|c| c.kind() == "default");
        found
    };

    if let Some(declaration) = node.child_by_field_name("declaration") {
        let names: Vec<String> = match declaration.kind() {
            "lexical_declaration" | "variable_declaration" => declarators(b, declaration)
                .into_iter()
                .map(|(name, _)| name)
                .collect(),
            _ => b
                .field_text(declaration, "name")
                .map(|n| vec![n.to_string()])
                .unwrap_or_default(),
        };
        for name in &names {
            b.export(name, node);
        }
        walk(b, declaration, in_class);
    } else if let Some(value) = node.child_by_field_name("value") {
        match value.kind() {
            "function_expression" | "function" => declare(b, value, SymbolKind::Function),
            "class" => walk(b, value, in_class),
            _ => {}
        }
    }

    if is_default {
        b.export("default", node);
    }
}

fn collect_requires(b: &mut FactBuilder, node: Node) {
    if node.kind() == "call_expression" {
        let callee = node.child_by_field_name("function");
        let is_loader = callee
            .map(|c| c.kind() == "import" || b.text(c) == "require")
            .unwrap_or(false);
        if is_loader {
            let first_arg = node
                .child_by_field_name("arguments")
                .and_then(|args| named_children(args).into_iter().next())
                .filter(|arg| arg.kind() == "string");
            if let Some(arg) = first_arg {
                let source = strip_quotes(b.text(arg));
                b.facts.imports.push(crate::parser::ImportFact {
                    source,
                    specifiers: Vec::new(),
                    line: node.start_position().row + 1,
                });
            }
        }
    }
    for child in named_children(node) {
        collect_requires(b, child);
    }
}
