use anyhow::{anyhow, Context, Result};
use async_openai::{config::OpenAIConfig as AsyncOpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::provider::{EmbeddingProvider, HealthStatus};
use crate::config::OpenAIConfig;
use crate::metrics::{EMBEDDING_LATENCY, EMBEDDING_REQUESTS};

/// OpenAI caps a single embeddings request at this many inputs
const MAX_API_BATCH: usize = 2048;
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Token bucket over requests
struct RateLimiter {
    state: Mutex<(f64, Instant)>,
    max_tokens: f64,
    refill_rate: f64,
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            state: Mutex::new((max_tokens, Instant::now())),
            max_tokens,
            refill_rate,
        }
    }

    async fn acquire(&self, count: usize) {
        let count = (count as f64).min(self.max_tokens);
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let (tokens, last_refill) = &mut *state;
                *tokens = (*tokens + last_refill.elapsed().as_secs_f64() * self.refill_rate).min(self.max_tokens);
                *last_refill = Instant::now();

                if *tokens >= count {
                    *tokens -= count;
                    return;
                }
                (count - *tokens) / self.refill_rate
            };
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
        }
    }
}

/// Remote embeddings through the OpenAI API
pub struct OpenAIProvider {
    client: Client<AsyncOpenAIConfig>,
    config: OpenAIConfig,
    batch_size: usize,
    rate_limiter: Arc<RateLimiter>,
}

impl OpenAIProvider {
    /// Create a provider, reading the API key from `config.api_key_env`.
    pub fn new(config: &OpenAIConfig, batch_size: usize) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("OpenAI API key not found in ${}", config.api_key_env))?;

        let mut openai_config = AsyncOpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        // 3500 requests per minute
        let rate_limiter = Arc::new(RateLimiter::new(3500.0, 3500.0 / 60.0));

        info!("Initialized OpenAI provider with model: {}", config.model);

        Ok(Self {
            client: Client::with_config(openai_config),
            config: config.clone(),
            batch_size: batch_size.clamp(1, MAX_API_BATCH),
            rate_limiter,
        })
    }

    fn model_dimension(model_name: &str) -> usize {
        match model_name {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        }
    }

    async fn request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.config.model)
            .input(input)
            .build()
            .context("Failed to build OpenAI request")?;

        let mut attempt = 0;
        let mut backoff = self.config.initial_backoff_ms;
        loop {
            self.rate_limiter.acquire(1).await;
            match self.client.embeddings().create(request.clone()).await {
                Ok(response) => {
                    let mut data = response.data;
                    data.sort_by_key(|d| d.index);
                    return Ok(data.into_iter().map(|d| d.embedding).collect());
                }
                Err(e) if attempt >= self.config.max_retries => {
                    return Err(anyhow!(e)).context("Max retries exceeded");
                }
                Err(e) => {
                    warn!("OpenAI request failed (attempt {}): {}", attempt + 1, e);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    backoff = ((backoff as f64 * BACKOFF_MULTIPLIER) as u64).min(self.config.max_backoff_ms);
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        EMBEDDING_REQUESTS.inc();
        let start = Instant::now();

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.request(batch.to_vec()).await?);
            debug!("Embedded {} texts via OpenAI", batch.len());
        }

        EMBEDDING_LATENCY.observe(start.elapsed().as_secs_f64());
        Ok(embeddings)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No embedding returned"))
    }

    fn embedding_dimension(&self) -> usize {
        Self::model_dimension(&self.config.model)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        match self.embed_query("test").await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) if e.to_string().contains("rate_limit") => Ok(HealthStatus::Degraded {
                reason: "Rate limited".to_string(),
            }),
            Err(e) => Ok(HealthStatus::Unhealthy {
                error: e.to_string(),
            }),
        }
    }
}
