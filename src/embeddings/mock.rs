use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::provider::{EmbeddingProvider, HealthStatus};

/// Deterministic offline embedder.
///
/// Each identifier word (camelCase and snake_case are split) is hashed into
/// a bucket, so texts sharing words get high cosine similarity. Used by
/// tests and benchmarks.
pub struct MockEmbedder {
    dimension: usize,
    delay: Option<Duration>,
    fail_marker: Option<String>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            delay: None,
            fail_marker: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep this long on every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail any call whose input contains `marker`.
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Number of `embed`/`embed_query` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn text_to_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in words(text) {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in vector.iter_mut() {
                *v /= magnitude;
            }
        }
        vector
    }

    async fn before_call(&self, texts: &[&str]) -> Result<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(marker) = &self.fail_marker {
            if texts.iter().any(|t| t.contains(marker.as_str())) {
                bail!("mock embedder refused input containing '{}'", marker);
            }
        }
        Ok(())
    }
}

/// Lowercased identifier words of `text`.
fn words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        let mut current = String::new();
        let mut prev_lower = false;
        for c in token.chars() {
            if c.is_uppercase() && prev_lower && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            current.extend(c.to_lowercase());
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let borrowed: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.before_call(&borrowed).await?;
        Ok(texts.iter().map(|t| self.text_to_vector(t)).collect())
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.before_call(&[query]).await?;
        Ok(self.text_to_vector(query))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn max_batch_size(&self) -> usize {
        1000
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        Ok(HealthStatus::Healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_words_split_identifiers() {
        assert_eq!(words("formatDate(user_id)"), vec!["format", "date", "user", "id"]);
        assert_eq!(words("HTTPServer"), vec!["httpserver"]);
    }

    #[tokio::test]
    async fn test_mock_embedder_deterministic() {
        let embedder = MockEmbedder::new(64);
        let vec1 = embedder.embed_query("test text").await.unwrap();
        let vec2 = embedder.embed_query("test text").await.unwrap();
        assert_eq!(vec1, vec2, "Same text should produce same vector");
        assert_eq!(embedder.calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_embedder_normalized() {
        let embedder = MockEmbedder::new(64);
        let vec = embedder.embed_query("parse the config file").await.unwrap();
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5, "Vector should be normalized");
    }

    #[tokio::test]
    async fn test_shared_words_are_similar() {
        let embedder = MockEmbedder::new(256);
        let a = embedder.text_to_vector("function formatDate");
        let b = embedder.text_to_vector("format date");
        let c = embedder.text_to_vector("connect database pool");
        assert!(cosine(&a, &b) > cosine(&a, &c));
    }

    #[tokio::test]
    async fn test_failing_marker() {
        let embedder = MockEmbedder::new(8).failing_on("BROKEN");
        assert!(embedder.embed(&["ok".to_string(), "BROKEN".to_string()]).await.is_err());
        assert!(embedder.embed(&["ok".to_string()]).await.is_ok());
    }
}
