//! Semantic retrieval of candidate provisions for a sentence

use crate::embeddings::EmbeddingProvider;
use crate::index::ProvisionIndex;
use async_trait::async_trait;
use lexcheck_core::{Error, ProvisionCandidate, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Namespace of the legal corpus to search
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Candidates returned per sentence
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity for a candidate to be returned
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

fn default_namespace() -> String {
    "constitution".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_min_score() -> f64 {
    0.30
}

/// Trait for components that find candidate provisions for a piece of text
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `k` candidates, ordered by descending similarity
    async fn retrieve(&self, text: &str, k: usize) -> Result<Vec<ProvisionCandidate>>;

    /// Namespace being searched
    fn namespace(&self) -> &str;
}

/// Embeds the query and searches one namespace of a [`ProvisionIndex`]
pub struct SemanticRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn ProvisionIndex>,
    namespace: String,
}

impl SemanticRetriever {
    /// Create a new retriever
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn ProvisionIndex>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl Retriever for SemanticRetriever {
    async fn retrieve(&self, text: &str, k: usize) -> Result<Vec<ProvisionCandidate>> {
        if k == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| {
                Error::retrieval(format!("embedding via {} failed: {}", self.embedder.name(), e))
            })?;

        let hits = self
            .index
            .query(&self.namespace, &vector, k)
            .await
            .map_err(|e| match e {
                Error::Retrieval(_) => e,
                other => {
                    Error::retrieval(format!("index {} query failed: {}", self.index.name(), other))
                }
            })?;

        debug!(namespace = %self.namespace, hits = hits.len(), "Retrieved candidates");

        Ok(hits
            .into_iter()
            .map(|hit| ProvisionCandidate::new(hit.metadata, hit.score, hit.id))
            .collect())
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}
