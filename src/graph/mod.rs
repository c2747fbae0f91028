//! File-level dependency graph.
//!
//! Nodes are keyed by root-relative path. Only files that parsed get a node;
//! an edge to a file without a node is kept but skipped by every traversal.

mod analysis;
mod builder;
mod cycles;
mod reach;
mod resolve;
mod stats;

pub use analysis::{analyze, analyze_module, DependencyAnalysis, ModuleAnalysis};
pub use builder::GraphBuilder;
pub use cycles::{detect_cycles, Cycle, CycleSeverity, CycleType};
pub use reach::{find_unreachable, infer_entry_points};
pub use resolve::{normalize as normalize_path, ImportResolver, Resolution};
pub use stats::{statistics, GraphStatistics};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::parser::{ExportFact, ImportFact};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub file_path: String,
    pub imports: Vec<ImportFact>,
    pub exports: Vec<ExportFact>,
    /// Resolved internal targets
    pub dependencies: BTreeSet<String>,
    /// Bare module specifiers, recorded only when externals are included
    pub external_dependencies: BTreeSet<String>,
    /// Relative specifiers that matched no tracked file
    pub unresolved: Vec<String>,
    /// Derived: nodes whose `dependencies` contain this node
    #[serde(default)]
    pub dependents: BTreeSet<String>,
}

impl DependencyNode {
    pub fn new(file_path: impl Into<String>, imports: Vec<ImportFact>, exports: Vec<ExportFact>) -> Self {
        Self {
            file_path: file_path.into(),
            imports,
            exports,
            dependencies: BTreeSet::new(),
            external_dependencies: BTreeSet::new(),
            unresolved: Vec::new(),
            dependents: BTreeSet::new(),
        }
    }

    /// Nothing imports this file.
    pub fn is_entry_point(&self) -> bool {
        self.dependents.is_empty()
    }

    /// This file imports nothing internal.
    pub fn is_leaf(&self) -> bool {
        self.dependencies.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: BTreeMap<String, DependencyNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph from explicit edges, every endpoint becoming a node.
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut graph = Self::new();
        for (from, to) in edges {
            for path in [from, to] {
                graph
                    .nodes
                    .entry(path.to_string())
                    .or_insert_with(|| DependencyNode::new(path, Vec::new(), Vec::new()));
            }
            if let Some(node) = graph.nodes.get_mut(from) {
                node.dependencies.insert(to.to_string());
            }
        }
        graph.recompute_dependents();
        graph
    }

    pub fn get(&self, path: &str) -> Option<&DependencyNode> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Internal targets of `path` that are graph nodes.
    pub fn neighbors<'a>(&'a self, path: &str) -> impl Iterator<Item = &'a String> + 'a {
        self.nodes
            .get(path)
            .into_iter()
            .flat_map(|n| n.dependencies.iter())
            .filter(move |dep| self.nodes.contains_key(*dep))
    }

    /// Every `(from, to)` edge between graph nodes.
    pub fn edges(&self) -> impl Iterator<Item = (&String, &String)> + '_ {
        self.nodes
            .iter()
            .flat_map(move |(from, _)| self.neighbors(from).map(move |to| (from, to)))
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    pub fn entry_points(&self) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.is_entry_point())
            .map(|n| n.file_path.clone())
            .collect()
    }

    pub fn leaf_nodes(&self) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.is_leaf())
            .map(|n| n.file_path.clone())
            .collect()
    }

    /// Rebuild every `dependents` set from the current `dependencies`.
    pub fn recompute_dependents(&mut self) {
        let mut reverse: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (from, node) in &self.nodes {
            for to in &node.dependencies {
                if self.nodes.contains_key(to) {
                    reverse.entry(to.clone()).or_default().insert(from.clone());
                }
            }
        }
        for (path, node) in self.nodes.iter_mut() {
            node.dependents = reverse.remove(path).unwrap_or_default();
        }
    }

    pub fn to_export(&self) -> GraphExport {
        GraphExport {
            nodes: self
                .nodes
                .values()
                .map(|n| GraphExportNode {
                    id: n.file_path.clone(),
                    imports: n.imports.len(),
                    exports: n.exports.len(),
                    is_entry_point: n.is_entry_point(),
                    is_leaf: n.is_leaf(),
                })
                .collect(),
            edges: self
                .edges()
                .map(|(from, to)| GraphEdge {
                    from: from.clone(),
                    to: to.clone(),
                })
                .collect(),
        }
    }
}

/// Node/edge list for external visualization.
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<GraphExportNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphExportNode {
    pub id: String,
    pub imports: usize,
    pub exports: usize,
    pub is_entry_point: bool,
    pub is_leaf: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}
