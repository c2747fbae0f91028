//! Status command implementation.
//!
//! Shows the persisted index for the current directory: snapshot, symbol and
//! graph counts, memory use and process metrics. Never builds anything.

use anyhow::Result;
use chrono::{Local, TimeZone};

use super::open_index;
use crate::metrics::{gather_metrics, MetricSnapshot};

/// Run the status command.
///
/// # Arguments
/// * `prometheus` - If true, output in Prometheus text format
pub async fn run(prometheus: bool) -> Result<()> {
    // Opening publishes the persisted state, which sets the index gauges.
    let index = open_index()?;

    if prometheus {
        print!("{}", gather_metrics());
        return Ok(());
    }

    println!("Project root: {}", index.root().display());
    println!("Phase:        {}", index.phase());
    println!();

    let snapshot = index.snapshot_stats();
    if !snapshot.exists {
        println!("No index yet. Run 'codeindex index' to build one.");
        return Ok(());
    }

    println!("Snapshot:");
    if let Some(captured) = snapshot.captured_at_millis {
        println!("  Captured:     {}", format_millis(captured));
    }
    println!("  Files:        {}", snapshot.file_count);
    println!("  Total size:   {} bytes", snapshot.total_size);
    if let Some(tag) = &snapshot.version_tag {
        println!("  Version tag:  {}", tag);
    }
    println!("  Stale:        {}", index.is_stale());
    println!();

    let stats = index.stats();
    println!("Index Contents:");
    println!("  Indexed files:  {}", stats.files_indexed);
    println!("  Symbols:        {}", stats.total_symbols);
    println!("  Memory usage:   {:.2} MB", stats.memory_usage_mb);
    for (kind, count) in &index.symbol_stats().by_kind {
        println!("    {:<12} {}", kind.as_str(), count);
    }
    println!("  Last updated:   {}", format_millis(stats.last_updated_millis));
    println!();

    println!("Last Build:");
    println!(
        "  Changes:        {} added, {} modified, {} deleted",
        stats.changes.added, stats.changes.modified, stats.changes.deleted
    );
    println!("  Skipped files:  {}", stats.files_skipped);
    println!(
        "  Embeddings:     {} generated, {} failed",
        stats.embeddings_generated, stats.embeddings_failed
    );
    println!("  Evicted:        {}", stats.symbols_evicted);
    println!();

    let metrics = MetricSnapshot::capture();
    println!("Process Metrics:");
    println!("  Indexed files gauge:   {:.0}", metrics.indexed_files);
    println!("  Indexed symbols gauge: {:.0}", metrics.indexed_symbols);

    let report = index.last_error_report();
    if report.has_errors() {
        println!();
        report.print_summary();
    }

    Ok(())
}

fn format_millis(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}
