use anyhow::Result;
use async_trait::async_trait;

/// Core trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts, one vector per input in order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a single query
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>>;

    /// Dimension of the vectors this provider produces
    fn embedding_dimension(&self) -> usize;

    /// Provider name for logging and metrics
    fn provider_name(&self) -> &'static str;

    /// Largest batch a single `embed` call should receive
    fn max_batch_size(&self) -> usize;

    /// Check if provider is healthy and ready
    async fn health_check(&self) -> Result<HealthStatus>;
}

/// Health status for provider monitoring
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded { reason: String },
    Unhealthy { error: String },
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded { reason } => write!(f, "degraded ({})", reason),
            Self::Unhealthy { error } => write!(f, "unhealthy ({})", error),
        }
    }
}
