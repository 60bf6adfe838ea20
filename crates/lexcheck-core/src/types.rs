//! Core types for LexCheck
//!
//! Offsets are Unicode scalar (char) offsets into the text they were taken
//! from: the input document for [`Sentence`] and the authoritative corpus for
//! [`Provision`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A sentence (or paragraph) of the input document with its provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    /// Stable identifier derived from the sequence (`s-0001`)
    pub id: String,

    /// Position in segmentation order (0-based)
    pub sequence: usize,

    /// Trimmed sentence text, exactly as it appears in the source
    pub text: String,

    /// Inclusive start offset in the source text
    pub start_char: usize,

    /// Exclusive end offset in the source text
    pub end_char: usize,

    /// Estimated page (1-based), see `Segmenter` for the approximation used
    pub page: usize,

    /// Paragraph index (1-based)
    pub paragraph: usize,

    /// Line number of the first character (1-based)
    pub line: usize,
}

impl Sentence {
    /// Build the identifier used for a sentence at `sequence`
    pub fn id_for(sequence: usize) -> String {
        format!("s-{:04}", sequence + 1)
    }

    /// Length of the sentence in chars
    pub fn char_len(&self) -> usize {
        self.end_char - self.start_char
    }
}

/// An indexed unit of the authoritative corpus (e.g. one constitutional article)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provision {
    /// Stable provision identifier (e.g. `article-21`)
    pub id: String,

    /// Article or section number as printed in the corpus
    pub article_number: String,

    /// Article heading
    #[serde(default)]
    pub heading: String,

    /// Part identifier (e.g. `III`)
    #[serde(default)]
    pub part: String,

    /// Part name (e.g. `Fundamental Rights`)
    #[serde(default)]
    pub part_name: String,

    /// Full provision text
    pub text: String,

    /// Start offset of the provision in the corpus
    #[serde(default)]
    pub start_char: usize,

    /// End offset of the provision in the corpus
    #[serde(default)]
    pub end_char: usize,
}

impl Provision {
    /// Human-readable reference, e.g. `Article 21 (Protection of life)`
    pub fn reference(&self) -> String {
        if self.heading.is_empty() {
            format!("Article {}", self.article_number)
        } else {
            format!("Article {} ({})", self.article_number, self.heading)
        }
    }
}

/// A provision returned by retrieval for one sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionCandidate {
    /// The matched provision
    pub provision: Provision,

    /// Cosine similarity clamped to [0, 1]
    pub similarity: f64,

    /// Identifier of the vector that produced the hit
    pub vector_id: String,
}

impl ProvisionCandidate {
    /// Create a new candidate, clamping the similarity into [0, 1]
    pub fn new(provision: Provision, similarity: f64, vector_id: impl Into<String>) -> Self {
        Self {
            provision,
            similarity: clamp_unit(similarity),
            vector_id: vector_id.into(),
        }
    }
}

/// Compliance verdict for a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    /// Fully aligned with the provision
    Yes,
    /// Contradicts or violates the provision
    No,
    /// Ambiguous or partial alignment
    Partial,
}

impl Decision {
    /// All allowed decisions
    pub const ALL: [Decision; 3] = [Decision::Yes, Decision::No, Decision::Partial];

    /// Wire label (`YES`, `NO`, `PARTIAL`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::Partial => "PARTIAL",
        }
    }

    /// Parse a wire label, ignoring case and surrounding whitespace
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(label))
    }

    /// Word used by templated rationales
    pub fn alignment_word(&self) -> &'static str {
        match self {
            Self::Yes => "alignment",
            Self::No => "contradiction",
            Self::Partial => "partial alignment",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which strategy produced a verdict or rationale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// LLM-backed strategy
    Llm,
    /// Deterministic similarity-threshold strategy
    Heuristic,
    /// Templated text
    Template,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Llm => "llm",
            Self::Heuristic => "heuristic",
            Self::Template => "template",
        };
        f.write_str(s)
    }
}

/// Metadata supplied by the document-ingestion collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    /// Document name
    pub name: String,

    /// Size in bytes
    #[serde(default)]
    pub size: u64,

    /// MIME type
    #[serde(default)]
    pub mime_type: String,

    /// Identifier of the uploader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader_id: Option<String>,

    /// Where the document was fetched from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<String>,

    /// Ingestion timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DocumentMeta {
    /// Create metadata for a named document
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set size
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Set MIME type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Set source location
    pub fn with_source_location(mut self, location: impl Into<String>) -> Self {
        self.source_location = Some(location.into());
        self
    }
}

/// Reference back to the sentence a mapping was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceRef {
    pub sentence_id: String,
    pub sequence: usize,
    pub text: String,
}

/// Location of the analysed snippet in the input document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetLocation {
    pub start_char: usize,
    pub end_char: usize,
    /// Estimated page, see `page_is_estimate`
    pub page: usize,
    pub paragraph: usize,
    pub line: usize,
    /// Pages are derived from a fixed chars-per-page constant
    pub page_is_estimate: bool,
}

impl From<&Sentence> for SnippetLocation {
    fn from(sentence: &Sentence) -> Self {
        Self {
            start_char: sentence.start_char,
            end_char: sentence.end_char,
            page: sentence.page,
            paragraph: sentence.paragraph,
            line: sentence.line,
            page_is_estimate: true,
        }
    }
}

/// Retrieval and timing facts recorded for later audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Raw similarity returned by the index for the primary match
    pub retrieval_score: f64,

    /// Exact query text sent to the retriever
    pub query_used: String,

    /// When the mapping was built
    pub timestamp: DateTime<Utc>,

    /// Vector identifier of the primary match
    pub vector_id: String,

    /// Index namespace that was queried
    pub namespace: String,
}

/// A ranked runner-up provision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternateMatch {
    pub provision: Provision,
    pub similarity: f64,
}

/// One input sentence linked to its best-matching provision plus a verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceMapping {
    /// Identifier derived from the sentence sequence (`map-0001`)
    pub mapping_id: String,

    pub sentence_ref: SentenceRef,

    pub snippet_location: SnippetLocation,

    /// Top-1 retrieval candidate
    pub provision_match: Provision,

    pub decision: Decision,

    /// Confidence in the decision, 0-100
    pub confidence: u8,

    /// Similarity of the primary match, 0-1
    pub similarity_score: f64,

    pub rationale: String,

    pub provenance: Provenance,

    /// Remaining candidates, ranked by similarity
    pub alternate_matches: Vec<AlternateMatch>,

    /// Strategy that produced the decision
    pub classification_strategy: StrategyKind,

    /// Strategy that produced the rationale
    pub rationale_strategy: StrategyKind,
}

impl ComplianceMapping {
    /// Build the mapping identifier for a sentence sequence
    pub fn id_for(sequence: usize) -> String {
        format!("map-{:04}", sequence + 1)
    }
}

/// Clamp a score into [0, 1], mapping NaN to 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
