//! Circular dependency detection.
//!
//! Depth-first search from every unvisited node, tracking the nodes on the
//! current path. A neighbor already on the path closes a cycle made of the
//! path from that neighbor onward. The same loop can be reached from several
//! roots, so cycles are deduplicated by their rotation starting at the
//! smallest path.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use super::DependencyGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleType {
    /// A file importing itself, or two files importing each other
    Direct,
    Indirect,
}

/// Files forming a loop, without repeating the first file at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    pub files: Vec<String>,
    pub severity: CycleSeverity,
    #[serde(rename = "type")]
    pub cycle_type: CycleType,
}

impl Cycle {
    fn new(files: Vec<String>) -> Self {
        let short = files.len() <= 2;
        Self {
            severity: if short {
                CycleSeverity::Error
            } else {
                CycleSeverity::Warning
            },
            cycle_type: if short {
                CycleType::Direct
            } else {
                CycleType::Indirect
            },
            files,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f == path)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Every distinct cycle in `graph`, in discovery order.
pub fn detect_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut cycles = Vec::new();

    for root in graph.nodes.keys().map(String::as_str) {
        if marks.contains_key(root) {
            continue;
        }

        // (node, its neighbors, next neighbor index)
        let mut stack: Vec<(&str, Vec<&str>, usize)> = Vec::new();
        let mut path: Vec<&str> = Vec::new();

        marks.insert(root, Mark::Visiting);
        path.push(root);
        stack.push((root, graph.neighbors(root).map(String::as_str).collect(), 0));

        while let Some((node, neighbors, next)) = stack.last_mut() {
            let Some(&neighbor) = neighbors.get(*next) else {
                marks.insert(*node, Mark::Done);
                path.pop();
                stack.pop();
                continue;
            };
            *next += 1;

            match marks.get(neighbor) {
                Some(Mark::Visiting) => {
                    if let Some(start) = path.iter().position(|p| *p == neighbor) {
                        let files: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                        if seen.insert(canonical(&files)) {
                            cycles.push(Cycle::new(files));
                        }
                    }
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(neighbor, Mark::Visiting);
                    path.push(neighbor);
                    let next_neighbors = graph.neighbors(neighbor).map(String::as_str).collect();
                    stack.push((neighbor, next_neighbors, 0));
                }
            }
        }
    }

    cycles
}

/// Rotation of `files` starting at its smallest element.
fn canonical(files: &[String]) -> Vec<String> {
    let Some(min_pos) = files
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };
    files[min_pos..]
        .iter()
        .chain(files[..min_pos].iter())
        .cloned()
        .collect()
}

/// Files that take part in at least one cycle.
pub fn files_in_cycles(cycles: &[Cycle]) -> BTreeSet<String> {
    cycles.iter().flat_map(|c| c.files.iter().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_node_cycle_is_one_warning() {
        let graph = DependencyGraph::from_edges([("A", "B"), ("B", "C"), ("C", "A")]);
        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].files, vec!["A", "B", "C"]);
        assert_eq!(cycles[0].severity, CycleSeverity::Warning);
        assert_eq!(cycles[0].cycle_type, CycleType::Indirect);
    }

    #[test]
    fn test_two_node_cycle_is_error() {
        let graph = DependencyGraph::from_edges([("A", "B"), ("B", "A")]);
        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
        assert_eq!(cycles[0].severity, CycleSeverity::Error);
        assert_eq!(cycles[0].cycle_type, CycleType::Direct);
    }

    #[test]
    fn test_self_import() {
        let graph = DependencyGraph::from_edges([("A", "A")]);
        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].files, vec!["A"]);
        assert_eq!(cycles[0].severity, CycleSeverity::Error);
    }

    #[test]
    fn test_acyclic_graph() {
        let graph = DependencyGraph::from_edges([("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
        assert!(detect_cycles(&graph).is_empty());
    }

    #[test]
    fn test_cycle_reached_from_two_roots_reported_once() {
        // X and Y both lead into the B <-> C loop
        let graph = DependencyGraph::from_edges([("X", "B"), ("Y", "C"), ("B", "C"), ("C", "B")]);
        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(files_in_cycles(&cycles).len(), 2);
    }

    #[test]
    fn test_canonical_rotation() {
        let files = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(canonical(&files), vec!["a", "b", "c"]);
    }
}
