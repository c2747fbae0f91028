//! Reachability from entry points.

use std::collections::{BTreeSet, HashSet, VecDeque};

use super::DependencyGraph;

const ENTRY_STEMS: &[&str] = &["index", "main", "app", "server"];
const ENTRY_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "py", "rs"];

/// Files not reachable from any of `entries`, sorted.
///
/// Entries that are not graph nodes are ignored. An empty entry list makes
/// every file unreachable.
pub fn find_unreachable(graph: &DependencyGraph, entries: &[String]) -> Vec<String> {
    let reachable = reachable_from(graph, entries);
    graph
        .nodes
        .keys()
        .filter(|path| !reachable.contains(path.as_str()))
        .cloned()
        .collect()
}

pub(crate) fn reachable_from<'a>(graph: &'a DependencyGraph, entries: &[String]) -> HashSet<&'a str> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    for entry in entries {
        if let Some((key, _)) = graph.nodes.get_key_value(entry.as_str()) {
            if seen.insert(key.as_str()) {
                queue.push_back(key.as_str());
            }
        }
    }

    while let Some(path) = queue.pop_front() {
        for next in graph.neighbors(path) {
            if seen.insert(next.as_str()) {
                queue.push_back(next.as_str());
            }
        }
    }
    seen
}

/// Default entry points when the caller names none: files nothing imports,
/// plus conventionally named files such as `index.ts` or `main.rs`.
pub fn infer_entry_points(graph: &DependencyGraph) -> Vec<String> {
    let mut entries: BTreeSet<String> = graph.entry_points().into_iter().collect();
    entries.extend(
        graph
            .nodes
            .keys()
            .filter(|path| is_conventional_entry(path))
            .cloned(),
    );
    entries.into_iter().collect()
}

fn is_conventional_entry(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => ENTRY_STEMS.contains(&stem) && ENTRY_EXTENSIONS.contains(&ext),
        None => false,
    }
}
