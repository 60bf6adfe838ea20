//! LexCheck Engine
//!
//! Wires segmentation, retrieval, classification and reporting into one
//! analysis run.
//!
//! This crate provides:
//! - [`AnalysisConfig`]: the YAML-backed configuration of every stage
//! - [`MappingAggregator`]: one sentence to at most one compliance mapping
//! - [`BatchOrchestrator`]: capped, batched, cancellable fan-out over sentences
//! - [`ComplianceAnalyzer`]: document text in, [`lexcheck_report::Report`] out

pub mod aggregator;
pub mod analyzer;
pub mod config;
pub mod orchestrator;

pub use aggregator::{MappingAggregator, MappingOutcome};
pub use analyzer::{Analysis, ComplianceAnalyzer, ComplianceAnalyzerBuilder};
pub use config::{AnalysisConfig, BatchConfig, ReportConfig};
pub use orchestrator::{BatchOrchestrator, FailedSentence, OrchestratorRun};

pub use tokio_util::sync::CancellationToken;
