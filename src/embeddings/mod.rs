//! Embedding providers.
//!
//! The index only talks to [`EmbeddingProvider`]; which implementation backs
//! it is decided once from configuration.

mod fastembed_provider;
mod mock;
mod openai_provider;
mod provider;

pub use fastembed_provider::FastEmbedProvider;
pub use mock::MockEmbedder;
pub use openai_provider::OpenAIProvider;
pub use provider::{EmbeddingProvider, HealthStatus};

use anyhow::Result;
use std::sync::Arc;

use crate::config::{EmbeddingProviderKind, EmbeddingsConfig};

/// Create the configured provider.
///
/// Local models are downloaded on first use, so this can take a while.
pub async fn create_provider(config: &EmbeddingsConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderKind::FastEmbed => {
            let model = config.model.clone();
            let batch_size = config.batch_size;
            let provider = tokio::task::spawn_blocking(move || FastEmbedProvider::new(&model, batch_size))
                .await??;
            Ok(Arc::new(provider))
        }
        EmbeddingProviderKind::OpenAI => {
            let provider = OpenAIProvider::new(&config.openai, config.batch_size)?;
            Ok(Arc::new(provider))
        }
    }
}
