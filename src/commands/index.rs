//! Index command implementation.
//!
//! Builds the index for the current directory, or applies the changes since
//! the persisted one, and saves the result. Ctrl-C cancels the build and
//! leaves the persisted index untouched.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{open_index, with_embeddings};
use crate::index::{progress_channel, BuildOptions, BuildPhase, ProgressReceiver};

/// Run the index command.
///
/// # Arguments
///
/// * `force` - Rebuild from scratch instead of applying changes
pub async fn run(force: bool) -> Result<()> {
    let index = with_embeddings(open_index()?).await?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling...");
            ctrl_c.cancel();
        }
    });

    let (sender, receiver) = progress_channel();
    let renderer = tokio::spawn(render_progress(receiver));

    let options = BuildOptions {
        force,
        ..Default::default()
    }
    .with_cancel(cancel)
    .with_progress(sender);
    let result = index.build(options).await;
    if renderer.await.is_err() {
        warn!("Progress renderer panicked");
    }
    let stats = result?;
    index.save().await?;

    println!("Project root: {}", index.root().display());
    let changed = stats.changes.added + stats.changes.modified + stats.changes.deleted;
    if changed > 0 || !stats.incremental {
        println!(
            "Indexed {} files ({} symbols, {} embeddings) in {:.2}s",
            stats.files_indexed,
            stats.total_symbols,
            stats.embeddings_generated,
            stats.duration_ms as f64 / 1000.0
        );
        println!(
            "Changes: {} added, {} modified, {} deleted, {} unchanged",
            stats.changes.added, stats.changes.modified, stats.changes.deleted, stats.changes.unchanged
        );
        if stats.incremental {
            println!("(incremental update)");
        }
    } else {
        println!("Index is up to date. No files need indexing.");
    }

    if stats.symbols_evicted > 0 {
        println!("Evicted {} symbols to stay within the memory budget", stats.symbols_evicted);
    }
    let report = index.last_error_report();
    if report.has_errors() {
        report.print_summary();
    }

    Ok(())
}

/// Draw one bar per build phase until the build drops its sender.
async fn render_progress(mut receiver: ProgressReceiver) {
    let mut bar: Option<(BuildPhase, ProgressBar)> = None;

    while let Some(event) = receiver.recv().await {
        match event.phase {
            BuildPhase::Complete | BuildPhase::Cancelled => {
                if let Some((_, pb)) = bar.take() {
                    pb.finish_and_clear();
                }
            }
            phase => {
                let same_phase = matches!(&bar, Some((current, _)) if *current == phase);
                if !same_phase {
                    if let Some((_, pb)) = bar.take() {
                        pb.finish_and_clear();
                    }
                    bar = Some((phase, create_bar(phase, event.total)));
                }
                if let Some((_, pb)) = &bar {
                    pb.set_length(event.total as u64);
                    pb.set_position(event.current as u64);
                }
            }
        }
    }

    if let Some((_, pb)) = bar {
        pb.finish_and_clear();
    }
}

fn create_bar(phase: BuildPhase, total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] {:<10} [{{bar:40.cyan/blue}}] {{pos}}/{{len}}",
            phase
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}
