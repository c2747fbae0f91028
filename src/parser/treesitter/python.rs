//! Python fact extraction.

use tree_sitter::{Node, Tree};

use super::{named_children, FactBuilder};
use crate::parser::{ParsedFile, SymbolKind};

pub(super) fn extract(tree: &Tree, source: &[u8]) -> ParsedFile {
    let mut builder = FactBuilder::new(source);
    for child in named_children(tree.root_node()) {
        walk(&mut builder, child, Scope::Module);
    }
    builder.finish()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    Module,
    Class,
}

fn walk(b: &mut FactBuilder, node: Node, scope: Scope) {
    match node.kind() {
        "function_definition" => {
            let kind = match scope {
                Scope::Module => SymbolKind::Function,
                Scope::Class => SymbolKind::Method,
            };
            let name = b.field_text(node, "name").unwrap_or("");
            let signature = b.signature(node);
            b.symbol(kind, name, node, signature);
            if scope == Scope::Module {
                export_public(b, name, node);
            }
        }
        "class_definition" => {
            let name = b.field_text(node, "name").unwrap_or("");
            b.symbol(SymbolKind::Class, name, node, None);
            if scope == Scope::Module {
                export_public(b, name, node);
            }
            if let Some(body) = node.child_by_field_name("body") {
                for child in named_children(body) {
                    walk(b, child, Scope::Class);
                }
            }
        }
        "import_statement" => import_statement(b, node),
        "import_from_statement" => import_from_statement(b, node),
        "expression_statement" => {
            for assignment in named_children(node)
                .into_iter()
                .filter(|n| n.kind() == "assignment")
            {
                let Some(left) = assignment.child_by_field_name("left") else {
                    continue;
                };
                if left.kind() != "identifier" {
                    continue;
                }
                let name = b.text(left);
                let kind = match scope {
                    Scope::Module => SymbolKind::Variable,
                    Scope::Class => SymbolKind::Property,
                };
                b.symbol(kind, name, node, None);
                if scope == Scope::Module {
                    export_public(b, name, node);
                }
            }
        }
        "decorated_definition" | "if_statement" | "try_statement" | "block" | "else_clause"
        | "except_clause" | "finally_clause" | "with_statement" => {
            for child in named_children(node) {
                walk(b, child, scope);
            }
        }
        _ => {}
    }
}

fn export_public(b: &mut FactBuilder, name: &str, node: Node) {
    if !name.starts_with('_') {
        b.export(name, node);
    }
}

/// `import a.b`, `import a.b as c`
fn import_statement(b: &mut FactBuilder, node: Node) {
    for target in named_children(node) {
        match target.kind() {
            "dotted_name" => {
                let module = b.text(target).to_string();
                let binding = module.split('.').next().unwrap_or_default().to_string();
                b.import(module, vec![binding], node);
            }
            "aliased_import" => {
                let module = b.field_text(target, "name").unwrap_or("").to_string();
                let alias = b.field_text(target, "alias").unwrap_or("").to_string();
                b.import(module, vec![alias], node);
            }
            _ => {}
        }
    }
}

/// `from .pkg import a, b as c`
fn import_from_statement(b: &mut FactBuilder, node: Node) {
    let Some(module) = b.field_text(node, "module_name") else {
        return;
    };
    let source = module_to_specifier(module);

    let mut bindings = Vec::new();
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        match name.kind() {
            "aliased_import" => {
                if let Some(alias) = b.field_text(name, "alias") {
                    bindings.push(alias.to_string());
                }
            }
            _ => bindings.push(b.text(name).to_string()),
        }
    }
    b.import(source, bindings, node);
}

/// Relative modules become path-like specifiers: `..pkg.mod` -> `../pkg/mod`.
fn module_to_specifier(module: &str) -> String {
    let dots = module.chars().take_while(|c| *c == '.').count();
    if dots == 0 {
        return module.to_string();
    }
    let rest = module[dots..].replace('.', "/");
    let prefix = if dots == 1 {
        "./".to_string()
    } else {
        "../".repeat(dots - 1)
    };
    if rest.is_empty() {
        format!("{}__init__", prefix)
    } else {
        format!("{}{}", prefix, rest)
    }
}
