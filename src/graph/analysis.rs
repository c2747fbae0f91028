//! Whole-graph and per-file dependency reports.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::cycles::files_in_cycles;
use super::{
    detect_cycles, find_unreachable, infer_entry_points, statistics, Cycle, DependencyGraph,
    GraphStatistics,
};

#[derive(Debug, Clone, Serialize)]
pub struct DependencyAnalysis {
    pub entry_points: Vec<String>,
    pub leaf_nodes: Vec<String>,
    pub cycles: Vec<Cycle>,
    pub unreachable: Vec<String>,
    pub statistics: GraphStatistics,
}

/// Analyze `graph`. Reachability uses `entries`, or inferred entry points
/// when it is empty.
pub fn analyze(graph: &DependencyGraph, entries: &[String]) -> DependencyAnalysis {
    let entries = if entries.is_empty() {
        infer_entry_points(graph)
    } else {
        entries.to_vec()
    };

    DependencyAnalysis {
        entry_points: graph.entry_points(),
        leaf_nodes: graph.leaf_nodes(),
        cycles: detect_cycles(graph),
        unreachable: find_unreachable(graph, &entries),
        statistics: statistics(graph, &entries),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleAnalysis {
    pub file_path: String,
    pub internal_dependencies: Vec<String>,
    /// Bare specifiers imported by the file, whether or not externals are tracked
    pub external_dependencies: Vec<String>,
    pub dependents: Vec<String>,
    /// Relative specifiers that matched no file
    pub missing_imports: Vec<String>,
    /// Specifiers imported more than once
    pub duplicate_imports: Vec<String>,
    /// Cycles this file takes part in
    pub circular_dependencies: Vec<Cycle>,
}

pub fn analyze_module(graph: &DependencyGraph, file_path: &str) -> Option<ModuleAnalysis> {
    let node = graph.get(file_path)?;

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for import in &node.imports {
        *counts.entry(import.source.as_str()).or_default() += 1;
    }

    let external: BTreeSet<String> = node
        .imports
        .iter()
        .map(|i| i.source.as_str())
        .filter(|s| is_bare(s))
        .map(str::to_string)
        .collect();

    let cycles = detect_cycles(graph);
    let circular = if files_in_cycles(&cycles).contains(file_path) {
        cycles.into_iter().filter(|c| c.contains(file_path)).collect()
    } else {
        Vec::new()
    };

    Some(ModuleAnalysis {
        file_path: node.file_path.clone(),
        internal_dependencies: graph.neighbors(file_path).cloned().collect(),
        external_dependencies: external.into_iter().collect(),
        dependents: node.dependents.iter().cloned().collect(),
        missing_imports: node.unresolved.clone(),
        duplicate_imports: counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(s, _)| s.to_string())
            .collect(),
        circular_dependencies: circular,
    })
}

fn is_bare(specifier: &str) -> bool {
    !specifier.is_empty() && !specifier.starts_with('.') && !specifier.starts_with('/')
}
