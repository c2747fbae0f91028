//! Semantic search cache: embeddings per symbol, cosine ranking and
//! memory-bounded eviction.

mod builder;
mod cache;
mod eviction;
mod similarity;

pub use builder::{EmbeddingBuilder, EmbeddingJob, EmbeddingOutcome};
pub use cache::{EmbeddingCache, EmbeddingEntry, SemanticHit, StoredEmbedding};
pub use eviction::{EvictionPolicy, EvictionReport};
pub use similarity::cosine_similarity;
