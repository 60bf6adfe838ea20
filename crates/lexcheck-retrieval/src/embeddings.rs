//! Embedding providers
//!
//! Two providers are available:
//! - [`HttpEmbeddingProvider`]: an OpenAI-compatible `/embeddings` endpoint
//! - [`HashingEmbedder`]: a deterministic feature-hashing embedder that needs
//!   no model and no network, used for offline runs and reproducible tests

use async_trait::async_trait;
use lexcheck_core::retry::{retry_with_backoff, RetryPolicy};
use lexcheck_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Trait for turning text into a fixed-length vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of the produced vectors
    fn dimensions(&self) -> usize;

    /// Provider name (for logging)
    fn name(&self) -> &str;
}

/// Embedding provider selection (for config files)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum EmbeddingConfig {
    /// Local feature-hashing embedder
    Hashing {
        #[serde(default = "default_hashing_dimensions")]
        dimensions: usize,
    },

    /// OpenAI-compatible HTTP endpoint
    Http {
        #[serde(default = "default_base_url")]
        base_url: String,
        #[serde(default = "default_embedding_model")]
        model: String,
        dimensions: usize,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
        #[serde(default)]
        retry: RetryPolicy,
    },
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::Hashing {
            dimensions: default_hashing_dimensions(),
        }
    }
}

impl EmbeddingConfig {
    /// Construct the configured provider
    pub fn build(&self, api_key: Option<String>) -> Result<Arc<dyn EmbeddingProvider>> {
        match self {
            Self::Hashing { dimensions } => Ok(Arc::new(HashingEmbedder::new(*dimensions)?)),
            Self::Http {
                base_url,
                model,
                dimensions,
                timeout_ms,
                retry,
            } => {
                let provider = HttpEmbeddingProvider::new(
                    base_url.clone(),
                    model.clone(),
                    *dimensions,
                    api_key,
                    Duration::from_millis(*timeout_ms),
                    retry.clone(),
                )?;
                Ok(Arc::new(provider))
            }
        }
    }
}

fn default_hashing_dimensions() -> usize {
    512
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_timeout_ms() -> u64 {
    15_000
}

// =============================================================================
// Hashing embedder
// =============================================================================

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "this", "to", "was", "with",
];

/// Deterministic bag-of-words embedder using signed feature hashing.
///
/// Lowercased word unigrams (weight 1.0) and bigrams (weight 0.5) are hashed
/// into `dimensions` buckets; the result is L2-normalized. Identical text
/// always yields the identical vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create a new hashing embedder
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::config("embedding dimensions must be greater than zero"));
        }
        Ok(Self { dimensions })
    }

    /// Embed synchronously
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
            .collect();

        for token in &tokens {
            self.accumulate(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, bigram.as_bytes(), 0.5);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

// =============================================================================
// HTTP embedding provider
// =============================================================================

/// OpenAI-compatible embedding endpoint
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    http: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl HttpEmbeddingProvider {
    /// Create a new provider
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
        api_key: Option<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            dimensions,
            api_key,
            retry,
        })
    }

    async fn send_once(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let mut request = self.http.post(url).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response: EmbeddingResponse = request.send().await?.error_for_status()?.json().await?;
        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::retrieval("embedding response contained no data"))?;

        if embedding.len() != self.dimensions {
            return Err(Error::retrieval(format!(
                "embedding has {} dimensions, expected {}",
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        retry_with_backoff(&self.retry, "embedding", || self.send_once(text)).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
