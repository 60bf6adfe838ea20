//! LexCheck Classifiers
//!
//! Decides how a document sentence relates to a retrieved provision and
//! explains the decision.
//!
//! Every stage has two strategies:
//! - Primary: a structured-output LLM call (temperature 0, schema-validated)
//! - Secondary: a deterministic rule (similarity thresholds, templated text)
//!
//! The fallback compositions never fail; a broken or slow primary only
//! degrades output quality.

pub mod classifier;
pub mod config;
pub mod fallback;
pub mod heuristic;
pub mod llm;
pub mod rationale;

pub use classifier::{Verdict, VerdictClassifier};
pub use config::{ClassifierConfig, HeuristicThresholds};
pub use fallback::FallbackVerdictClassifier;
pub use heuristic::HeuristicVerdictClassifier;
pub use llm::{parse_verdict, LlmVerdictClassifier};
pub use rationale::{
    FallbackRationaleGenerator, LlmRationaleGenerator, Rationale, RationaleGenerator,
    TemplateRationaleGenerator,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{Verdict, VerdictClassifier};
    pub use crate::fallback::FallbackVerdictClassifier;
    pub use crate::heuristic::HeuristicVerdictClassifier;
    pub use crate::rationale::{FallbackRationaleGenerator, RationaleGenerator};
}
