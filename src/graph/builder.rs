use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::{DependencyGraph, DependencyNode, ImportResolver, Resolution};

/// Builds and incrementally maintains a [`DependencyGraph`].
///
/// Resolution runs against `known`, the set of tracked root-relative paths
/// from the current snapshot, so it never touches the filesystem.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    resolver: ImportResolver,
}

impl GraphBuilder {
    pub fn new(resolver: ImportResolver) -> Self {
        Self { resolver }
    }

    /// Full build from unresolved nodes (imports and exports filled in).
    pub fn build(&self, nodes: impl IntoIterator<Item = DependencyNode>, known: &HashSet<String>) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for mut node in nodes {
            self.resolve_node(&mut node, known);
            graph.nodes.insert(node.file_path.clone(), node);
        }
        graph.recompute_dependents();
        debug!(
            nodes = graph.len(),
            edges = graph.edge_count(),
            "Built dependency graph"
        );
        graph
    }

    /// Apply a change set to `graph`.
    ///
    /// `removed` drops nodes (deleted files, or files that no longer parse);
    /// `upserts` replace or add nodes. When the tracked file set itself
    /// changed, every node is re-resolved since a new or deleted file can
    /// change what an untouched import points at; otherwise only upserted
    /// nodes are.
    pub fn update(
        &self,
        graph: &mut DependencyGraph,
        upserts: Vec<DependencyNode>,
        removed: &[String],
        known: &HashSet<String>,
        file_set_changed: bool,
    ) {
        for path in removed {
            graph.nodes.remove(path);
        }

        let mut touched = BTreeSet::new();
        for node in upserts {
            touched.insert(node.file_path.clone());
            graph.nodes.insert(node.file_path.clone(), node);
        }

        let targets: Vec<String> = if file_set_changed {
            graph.nodes.keys().cloned().collect()
        } else {
            touched.into_iter().collect()
        };

        for path in &targets {
            if let Some(node) = graph.nodes.get_mut(path) {
                self.resolve_node(node, known);
            }
        }

        graph.recompute_dependents();
        debug!(
            re_resolved = targets.len(),
            removed = removed.len(),
            nodes = graph.len(),
            "Updated dependency graph"
        );
    }

    fn resolve_node(&self, node: &mut DependencyNode, known: &HashSet<String>) {
        node.dependencies.clear();
        node.external_dependencies.clear();
        node.unresolved.clear();

        for import in &node.imports {
            match self
                .resolver
                .resolve(&node.file_path, &import.source, |p| known.contains(p))
            {
                Resolution::Internal(path) => {
                    node.dependencies.insert(path);
                }
                Resolution::External(name) => {
                    if self.resolver.include_externals() {
                        node.external_dependencies.insert(name);
                    }
                }
                Resolution::Unresolved(spec) => node.unresolved.push(spec),
            }
        }
    }
}
