//! LexCheck Retrieval
//!
//! Finds the legal provisions most similar to a document sentence.
//!
//! This crate provides:
//! - Embedding providers (HTTP endpoint and a deterministic local embedder)
//! - A namespace-isolated vector index with cosine scoring
//! - Corpus loading from JSON
//! - The [`Retriever`] seam used by the analysis engine

pub mod embeddings;
pub mod index;
pub mod retriever;

pub use embeddings::{EmbeddingConfig, EmbeddingProvider, HashingEmbedder, HttpEmbeddingProvider};
pub use index::{
    cosine_similarity, InMemoryProvisionIndex, IndexHit, ProvisionCorpus, ProvisionIndex,
};
pub use retriever::{RetrievalConfig, Retriever, SemanticRetriever};
