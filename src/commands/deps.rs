//! Dependency graph reports.

use anyhow::{Context, Result};

use super::{ensure_fresh, open_index};
use crate::graph::{CycleSeverity, DependencyAnalysis, ModuleAnalysis};

/// Run the deps command.
///
/// # Arguments
///
/// * `entries` - Entry point files; inferred when empty
/// * `graph` - Print the whole graph as JSON
/// * `module` - Print the analysis of a single file
pub async fn run(entries: &[String], graph: bool, module: Option<&str>) -> Result<()> {
    let index = ensure_fresh(open_index()?).await?;

    if graph {
        let export = index.graph_export()?;
        let json = serde_json::to_string_pretty(&export).context("Failed to serialize dependency graph")?;
        println!("{}", json);
        return Ok(());
    }

    if let Some(file) = module {
        match index.module_analysis(file)? {
            Some(analysis) => print_module(&analysis),
            None => println!("{} is not in the dependency graph", file),
        }
        return Ok(());
    }

    let analysis = index.analyze_dependencies(entries)?;
    print_analysis(&analysis);
    Ok(())
}

fn print_analysis(analysis: &DependencyAnalysis) {
    let stats = &analysis.statistics;
    println!("Dependency Graph");
    println!("================\n");
    println!("  Files:               {}", stats.total_files);
    println!("  Dependencies:        {}", stats.total_dependencies);
    println!("  Average per file:    {:.2}", stats.average_dependencies);
    println!("  Max depth:           {}", stats.max_dependency_depth);
    println!("  Circular:            {}", stats.circular_dependency_count);
    println!("  Unreachable:         {}", stats.unreachable_file_count);
    println!();

    print_list("Entry points", &analysis.entry_points);
    print_list("Leaf files", &analysis.leaf_nodes);
    print_list("Unreachable files", &analysis.unreachable);

    if !analysis.cycles.is_empty() {
        println!("Cycles ({}):", analysis.cycles.len());
        for cycle in &analysis.cycles {
            let label = match cycle.severity {
                CycleSeverity::Error => "error",
                CycleSeverity::Warning => "warning",
            };
            println!("  [{}] {} -> {}", label, cycle.files.join(" -> "), cycle.files[0]);
        }
    }
}

fn print_module(analysis: &ModuleAnalysis) {
    println!("{}", analysis.file_path);
    print_list("Internal dependencies", &analysis.internal_dependencies);
    print_list("External dependencies", &analysis.external_dependencies);
    print_list("Dependents", &analysis.dependents);
    print_list("Missing imports", &analysis.missing_imports);
    print_list("Duplicate imports", &analysis.duplicate_imports);
    for cycle in &analysis.circular_dependencies {
        println!("  cycle: {}", cycle.files.join(" -> "));
    }
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{} ({}):", label, items.len());
    for item in items {
        println!("  {}", item);
    }
    println!();
}
