//! LexCheck Core
//!
//! Core types, traits, and utilities shared across LexCheck components.
//!
//! This crate provides:
//! - The data model (sentences, provisions, candidates, mappings)
//! - Error types and result handling
//! - Sentence segmentation with character-level provenance
//! - The completion interface used by the LLM-backed strategies
//! - Bounded retry with backoff for external calls

pub mod adapters;
pub mod error;
pub mod llm;
pub mod retry;
pub mod segment;
pub mod types;

pub use adapters::{OpenAiClient, OpenAiConfig};
pub use error::{Error, Result};
pub use llm::{ChatMessage, CompletionClient, CompletionRequest, CompletionResponse, ResponseFormat};
pub use retry::RetryPolicy;
pub use segment::{Granularity, Segmenter, SegmenterConfig};
pub use types::{
    AlternateMatch, ComplianceMapping, Decision, DocumentMeta, Provenance, Provision,
    ProvisionCandidate, Sentence, SentenceRef, SnippetLocation, StrategyKind,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::llm::{CompletionClient, CompletionRequest, CompletionResponse};
    pub use crate::segment::{Segmenter, SegmenterConfig};
    pub use crate::types::{
        ComplianceMapping, Decision, DocumentMeta, Provision, ProvisionCandidate, Sentence,
        StrategyKind,
    };
}
