//! Command implementations behind the CLI.
//!
//! Every command works on the current directory's index. Queries refresh an
//! index that is missing or older than `indexer.index_ttl_secs` before
//! answering, then persist the refreshed state.

pub mod clear;
pub mod deps;
pub mod index;
pub mod search;
pub mod status;
pub mod symbols;
pub mod usages;

use anyhow::{Context, Result};
use std::env;

use crate::embeddings::create_provider;
use crate::index::{BuildOptions, CodeIndex};
use crate::Config;

/// Open the persisted index for the current directory, without an
/// embedding provider.
pub(crate) fn open_index() -> Result<CodeIndex> {
    let root = env::current_dir()?;
    let config = Config::load(&root)?;
    CodeIndex::open(&root, config).with_context(|| format!("Failed to open index for {}", root.display()))
}

/// Attach the configured embedding provider, which may load a local model.
pub(crate) async fn with_embeddings(index: CodeIndex) -> Result<CodeIndex> {
    if index.has_embedding_provider() {
        return Ok(index);
    }
    let provider = create_provider(&index.config().embeddings).await?;
    Ok(index.with_embedding_provider(provider))
}

/// Refresh a missing or stale index and persist it.
pub(crate) async fn ensure_fresh(index: CodeIndex) -> Result<CodeIndex> {
    if !index.is_stale() {
        return Ok(index);
    }

    let index = with_embeddings(index).await?;
    let stats = index.build(BuildOptions::default()).await?;
    if stats.changes.added + stats.changes.modified + stats.changes.deleted > 0 {
        eprintln!(
            "Indexed {} files ({} symbols) in {:.2}s",
            stats.files_indexed,
            stats.total_symbols,
            stats.duration_ms as f64 / 1000.0
        );
    }
    index.save().await?;
    Ok(index)
}
