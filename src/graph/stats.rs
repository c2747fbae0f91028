use std::collections::HashMap;

use serde::Serialize;

use super::{detect_cycles, find_unreachable, DependencyGraph};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStatistics {
    pub total_files: usize,
    pub total_dependencies: usize,
    pub average_dependencies: f64,
    /// Longest import chain, in edges
    pub max_dependency_depth: usize,
    pub circular_dependency_count: usize,
    pub unreachable_file_count: usize,
}

/// Aggregate figures for `graph`, with reachability measured from `entries`.
pub fn statistics(graph: &DependencyGraph, entries: &[String]) -> GraphStatistics {
    let total_files = graph.len();
    let total_dependencies = graph.edge_count();

    GraphStatistics {
        total_files,
        total_dependencies,
        average_dependencies: if total_files == 0 {
            0.0
        } else {
            total_dependencies as f64 / total_files as f64
        },
        max_dependency_depth: max_depth(graph),
        circular_dependency_count: detect_cycles(graph).len(),
        unreachable_file_count: find_unreachable(graph, entries).len(),
    }
}

#[derive(Clone, Copy)]
enum Depth {
    InProgress,
    Known(usize),
}

/// Longest path length over the graph. An edge back into the current path
/// contributes nothing, so cycles are cut rather than followed.
fn max_depth(graph: &DependencyGraph) -> usize {
    let mut memo: HashMap<&str, Depth> = HashMap::new();
    let mut best = 0;

    for root in graph.nodes.keys().map(String::as_str) {
        if memo.contains_key(root) {
            continue;
        }

        let mut stack: Vec<(&str, Vec<&str>, usize, usize)> = Vec::new();
        memo.insert(root, Depth::InProgress);
        stack.push((root, graph.neighbors(root).map(String::as_str).collect(), 0, 0));

        while let Some((node, neighbors, next, deepest)) = stack.last_mut() {
            let Some(&neighbor) = neighbors.get(*next) else {
                let depth = *deepest;
                memo.insert(*node, Depth::Known(depth));
                best = best.max(depth);
                stack.pop();
                if let Some((_, _, _, parent_deepest)) = stack.last_mut() {
                    *parent_deepest = (*parent_deepest).max(depth + 1);
                }
                continue;
            };
            *next += 1;

            match memo.get(neighbor) {
                Some(Depth::Known(d)) => *deepest = (*deepest).max(d + 1),
                Some(Depth::InProgress) => {}
                None => {
                    memo.insert(neighbor, Depth::InProgress);
                    let children = graph.neighbors(neighbor).map(String::as_str).collect();
                    stack.push((neighbor, children, 0, 0));
                }
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_statistics() {
        let graph = DependencyGraph::from_edges([("a", "b"), ("b", "c"), ("a", "c")]);
        let stats = statistics(&graph, &["a".to_string()]);
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_dependencies, 3);
        assert!((stats.average_dependencies - 1.0).abs() < f64::EPSILON);
        assert_eq!(stats.max_dependency_depth, 2);
        assert_eq!(stats.circular_dependency_count, 0);
        assert_eq!(stats.unreachable_file_count, 0);
    }

    #[test]
    fn test_empty_graph() {
        let stats = statistics(&DependencyGraph::new(), &[]);
        assert_eq!(stats, GraphStatistics::default());
    }

    #[test]
    fn test_depth_terminates_on_cycles() {
        let graph = DependencyGraph::from_edges([("a", "b"), ("b", "c"), ("c", "a")]);
        let stats = statistics(&graph, &[]);
        assert_eq!(stats.max_dependency_depth, 2);
        assert_eq!(stats.circular_dependency_count, 1);
        assert_eq!(stats.unreachable_file_count, 3);
    }
}
