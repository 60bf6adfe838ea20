//! Namespace-isolated provision index
//!
//! Provisions are stored as embedding vectors under a namespace (one namespace
//! per legal corpus). A query only ever sees vectors from the namespace it
//! names. Scores are cosine similarities clamped to `[0, 1]`; hits below the
//! configured minimum score are dropped before ranking.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use lexcheck_core::{Error, Provision, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// A single vector-search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    /// Vector identifier
    pub id: String,

    /// Similarity in `[0, 1]`
    pub score: f64,

    /// Provision stored alongside the vector
    pub metadata: Provision,
}

/// Trait for vector indexes holding provisions
#[async_trait]
pub trait ProvisionIndex: Send + Sync {
    /// Return up to `top_k` hits from `namespace`, highest score first
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<IndexHit>>;

    /// Index name (for logging)
    fn name(&self) -> &str;
}

#[derive(Debug, Clone)]
struct IndexedVector {
    id: String,
    vector: Vec<f32>,
    provision: Provision,
}

/// In-process provision index with brute-force cosine search
#[derive(Debug, Clone)]
pub struct InMemoryProvisionIndex {
    namespaces: HashMap<String, Vec<IndexedVector>>,
    min_score: f64,
}

impl InMemoryProvisionIndex {
    /// Create an empty index
    pub fn new(min_score: f64) -> Self {
        Self {
            namespaces: HashMap::new(),
            min_score: min_score.clamp(0.0, 1.0),
        }
    }

    /// Embed every provision and store it under `namespace`
    pub async fn build(
        namespace: &str,
        provisions: &[Provision],
        embedder: &dyn EmbeddingProvider,
        min_score: f64,
    ) -> Result<Self> {
        let mut index = Self::new(min_score);
        index.add_provisions(namespace, provisions, embedder).await?;
        Ok(index)
    }

    /// Embed and add provisions to `namespace`
    pub async fn add_provisions(
        &mut self,
        namespace: &str,
        provisions: &[Provision],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<()> {
        for provision in provisions {
            let vector = embedder.embed(&embedding_text(provision)).await?;
            self.insert(namespace, vector_id(namespace, &provision.id), vector, provision.clone())?;
        }

        info!(
            namespace = %namespace,
            provisions = provisions.len(),
            embedder = %embedder.name(),
            "Indexed provisions"
        );
        Ok(())
    }

    /// Insert a pre-computed vector
    pub fn insert(
        &mut self,
        namespace: &str,
        id: impl Into<String>,
        vector: Vec<f32>,
        provision: Provision,
    ) -> Result<()> {
        let entries = self.namespaces.entry(namespace.to_string()).or_default();

        if let Some(first) = entries.first() {
            if first.vector.len() != vector.len() {
                return Err(Error::retrieval(format!(
                    "vector has {} dimensions, namespace '{}' uses {}",
                    vector.len(),
                    namespace,
                    first.vector.len()
                )));
            }
        }

        entries.push(IndexedVector {
            id: id.into(),
            vector,
            provision,
        });
        Ok(())
    }

    /// Number of vectors stored under `namespace`
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces.get(namespace).map_or(0, Vec::len)
    }

    /// Whether `namespace` holds no vectors
    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// Known namespaces, sorted
    pub fn namespaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.namespaces.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Minimum score a hit must reach
    pub fn min_score(&self) -> f64 {
        self.min_score
    }
}

#[async_trait]
impl ProvisionIndex for InMemoryProvisionIndex {
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<IndexHit>> {
        let Some(entries) = self.namespaces.get(namespace) else {
            debug!(namespace = %namespace, "Query against unknown namespace");
            return Ok(Vec::new());
        };

        let mut hits = Vec::new();
        for entry in entries {
            if entry.vector.len() != vector.len() {
                return Err(Error::retrieval(format!(
                    "query has {} dimensions, index uses {}",
                    vector.len(),
                    entry.vector.len()
                )));
            }

            let score = cosine_similarity(vector, &entry.vector);
            if score >= self.min_score {
                hits.push(IndexHit {
                    id: entry.id.clone(),
                    score,
                    metadata: entry.provision.clone(),
                });
            }
        }

        // Ties fall back to id order so rankings are reproducible
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(top_k);
        Ok(hits)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// Cosine similarity clamped to `[0, 1]`; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

fn vector_id(namespace: &str, provision_id: &str) -> String {
    format!("{}/{}", namespace, provision_id)
}

fn embedding_text(provision: &Provision) -> String {
    if provision.heading.is_empty() {
        provision.text.clone()
    } else {
        format!("{}. {}", provision.heading, provision.text)
    }
}

// =============================================================================
// Corpus files
// =============================================================================

/// A legal corpus: provisions that share a namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionCorpus {
    /// Namespace the provisions are indexed under
    pub namespace: String,

    /// Provisions in document order
    pub provisions: Vec<Provision>,
}

impl ProvisionCorpus {
    /// Parse a corpus from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let corpus: Self = serde_json::from_str(json)?;
        corpus.validate()?;
        Ok(corpus)
    }

    /// Load a corpus from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Check for empty namespaces, empty provision text and duplicate ids
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(Error::config("corpus namespace must not be empty"));
        }

        let mut seen = std::collections::HashSet::new();
        for provision in &self.provisions {
            if provision.text.trim().is_empty() {
                return Err(Error::config(format!("provision '{}' has no text", provision.id)));
            }
            if !seen.insert(provision.id.as_str()) {
                return Err(Error::config(format!("duplicate provision id '{}'", provision.id)));
            }
        }
        Ok(())
    }

    /// Embed the corpus into a fresh in-memory index
    pub async fn into_index(
        &self,
        embedder: &dyn EmbeddingProvider,
        min_score: f64,
    ) -> Result<InMemoryProvisionIndex> {
        InMemoryProvisionIndex::build(&self.namespace, &self.provisions, embedder, min_score).await
    }
}
