//! Batched embedding generation for newly indexed symbols.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::embeddings::EmbeddingProvider;
use crate::error::{IndexError, Result};

/// Text to embed for one symbol.
#[derive(Debug, Clone)]
pub struct EmbeddingJob {
    pub symbol_id: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct EmbeddingOutcome {
    pub vectors: Vec<(String, Vec<f32>)>,
    /// Symbol ids the provider could not embed
    pub failed: Vec<String>,
}

pub struct EmbeddingBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    max_concurrent_batches: usize,
}

impl EmbeddingBuilder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize, max_concurrent_batches: usize) -> Self {
        let batch_size = batch_size.clamp(1, provider.max_batch_size().max(1));
        Self {
            provider,
            batch_size,
            max_concurrent_batches: max_concurrent_batches.max(1),
        }
    }

    /// Embed `jobs` in concurrent batches.
    ///
    /// A batch that fails as a whole is retried one item at a time, so a
    /// single bad input only loses its own vector. `on_progress` receives
    /// `(done, total)` after each batch.
    pub async fn run(
        &self,
        jobs: Vec<EmbeddingJob>,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<EmbeddingOutcome> {
        let total = jobs.len();
        let mut outcome = EmbeddingOutcome::default();
        if total == 0 {
            return Ok(outcome);
        }

        let start = Instant::now();
        let batches: Vec<Vec<EmbeddingJob>> = jobs.chunks(self.batch_size).map(<[EmbeddingJob]>::to_vec).collect();
        let batch_count = batches.len();

        let mut results = stream::iter(batches)
            .map(|batch| self.embed_batch(batch))
            .buffer_unordered(self.max_concurrent_batches);

        let mut done = 0;
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Err(IndexError::Cancelled),
                next = results.next() => next,
            };
            let Some(batch) = next else { break };

            done += batch.vectors.len() + batch.failed.len();
            outcome.vectors.extend(batch.vectors);
            outcome.failed.extend(batch.failed);
            on_progress(done, total);
        }

        info!(
            provider = self.provider.provider_name(),
            embedded = outcome.vectors.len(),
            failed = outcome.failed.len(),
            batches = batch_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generated embeddings"
        );
        Ok(outcome)
    }

    async fn embed_batch(&self, batch: Vec<EmbeddingJob>) -> EmbeddingOutcome {
        let texts: Vec<String> = batch.iter().map(|j| j.text.clone()).collect();

        match self.provider.embed(&texts).await {
            Ok(vectors) if vectors.len() == batch.len() => EmbeddingOutcome {
                vectors: batch.into_iter().map(|j| j.symbol_id).zip(vectors).collect(),
                failed: Vec::new(),
            },
            Ok(vectors) => {
                warn!(
                    expected = batch.len(),
                    received = vectors.len(),
                    "Embedding batch returned the wrong number of vectors, retrying items individually"
                );
                self.embed_individually(batch).await
            }
            Err(e) => {
                warn!("Embedding batch of {} failed, retrying items individually: {}", batch.len(), e);
                self.embed_individually(batch).await
            }
        }
    }

    async fn embed_individually(&self, batch: Vec<EmbeddingJob>) -> EmbeddingOutcome {
        let mut outcome = EmbeddingOutcome::default();
        for job in batch {
            match self.provider.embed(std::slice::from_ref(&job.text)).await {
                Ok(mut vectors) if vectors.len() == 1 => {
                    outcome.vectors.push((job.symbol_id, vectors.remove(0)));
                }
                Ok(_) => outcome.failed.push(job.symbol_id),
                Err(e) => {
                    debug!(symbol_id = %job.symbol_id, "Embedding failed: {}", e);
                    outcome.failed.push(job.symbol_id);
                }
            }
        }
        outcome
    }
}
