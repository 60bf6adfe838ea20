//! Pipeline counters
//!
//! [`PipelineMetrics`] keeps per-run atomic counters for the report metadata
//! and mirrors every update onto the global `metrics` facade, so a process
//! that installs a recorder (e.g. Prometheus) sees the same numbers.

use ::metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const SENTENCES_TOTAL: &str = "lexcheck_sentences_total";
pub const MAPPINGS_TOTAL: &str = "lexcheck_mappings_total";
pub const SENTENCE_FAILURES_TOTAL: &str = "lexcheck_sentence_failures_total";
pub const UNMATCHED_TOTAL: &str = "lexcheck_unmatched_total";
pub const TRUNCATED_TOTAL: &str = "lexcheck_truncated_total";
pub const FALLBACKS_TOTAL: &str = "lexcheck_fallbacks_total";
/// Counted per mapping by the orchestrator, labelled by stage
pub const FALLBACK_MAPPINGS_TOTAL: &str = "lexcheck_fallback_mappings_total";
pub const BATCH_LATENCY_MS: &str = "lexcheck_batch_latency_ms";

/// Register descriptions for all LexCheck metrics
pub fn describe_metrics() {
    describe_counter!(SENTENCES_TOTAL, "Sentences submitted for analysis");
    describe_counter!(MAPPINGS_TOTAL, "Compliance mappings produced");
    describe_counter!(SENTENCE_FAILURES_TOTAL, "Sentences dropped after an error");
    describe_counter!(UNMATCHED_TOTAL, "Sentences with no candidate provision");
    describe_counter!(TRUNCATED_TOTAL, "Sentences beyond the analysis cap");
    describe_counter!(FALLBACKS_TOTAL, "Primary strategy failures answered by the fallback");
    describe_counter!(
        FALLBACK_MAPPINGS_TOTAL,
        "Mappings whose verdict or rationale came from a fallback strategy"
    );
    describe_histogram!(BATCH_LATENCY_MS, Unit::Milliseconds, "Wall-clock time per batch");
}

/// Per-run pipeline counters
#[derive(Clone, Default)]
pub struct PipelineMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    sentences: AtomicU64,
    truncated: AtomicU64,
    mappings: AtomicU64,
    unmatched: AtomicU64,
    failures: AtomicU64,
    classification_fallbacks: AtomicU64,
    rationale_fallbacks: AtomicU64,
    batches: AtomicU64,
    batch_latency_ms: AtomicU64,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record sentences accepted for analysis
    pub fn record_sentences(&self, count: u64) {
        self.inner.sentences.fetch_add(count, Ordering::Relaxed);
        counter!(SENTENCES_TOTAL).increment(count);
    }

    /// Record sentences cut off by the cap
    pub fn record_truncated(&self, count: u64) {
        self.inner.truncated.fetch_add(count, Ordering::Relaxed);
        counter!(TRUNCATED_TOTAL).increment(count);
    }

    /// Record a produced mapping
    pub fn record_mapping(&self) {
        self.inner.mappings.fetch_add(1, Ordering::Relaxed);
        counter!(MAPPINGS_TOTAL).increment(1);
    }

    /// Record a sentence without candidates
    pub fn record_unmatched(&self) {
        self.inner.unmatched.fetch_add(1, Ordering::Relaxed);
        counter!(UNMATCHED_TOTAL).increment(1);
    }

    /// Record a dropped sentence
    pub fn record_failure(&self) {
        self.inner.failures.fetch_add(1, Ordering::Relaxed);
        counter!(SENTENCE_FAILURES_TOTAL).increment(1);
    }

    /// Record a mapping whose verdict came from the fallback strategy
    pub fn record_classification_fallback(&self) {
        self.inner.classification_fallbacks.fetch_add(1, Ordering::Relaxed);
        counter!(FALLBACK_MAPPINGS_TOTAL, "stage" => "classification").increment(1);
    }

    /// Record a mapping whose rationale came from the template
    pub fn record_rationale_fallback(&self) {
        self.inner.rationale_fallbacks.fetch_add(1, Ordering::Relaxed);
        counter!(FALLBACK_MAPPINGS_TOTAL, "stage" => "rationale").increment(1);
    }

    /// Record a completed batch
    pub fn record_batch(&self, latency_ms: u64) {
        self.inner.batches.fetch_add(1, Ordering::Relaxed);
        self.inner.batch_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        histogram!(BATCH_LATENCY_MS).record(latency_ms as f64);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sentences: self.inner.sentences.load(Ordering::Relaxed),
            truncated: self.inner.truncated.load(Ordering::Relaxed),
            mappings: self.inner.mappings.load(Ordering::Relaxed),
            unmatched: self.inner.unmatched.load(Ordering::Relaxed),
            failures: self.inner.failures.load(Ordering::Relaxed),
            classification_fallbacks: self.inner.classification_fallbacks.load(Ordering::Relaxed),
            rationale_fallbacks: self.inner.rationale_fallbacks.load(Ordering::Relaxed),
            batches: self.inner.batches.load(Ordering::Relaxed),
            batch_latency_ms: self.inner.batch_latency_ms.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub sentences: u64,
    pub truncated: u64,
    pub mappings: u64,
    pub unmatched: u64,
    pub failures: u64,
    pub classification_fallbacks: u64,
    pub rationale_fallbacks: u64,
    pub batches: u64,
    pub batch_latency_ms: u64,
}

impl MetricsSnapshot {
    /// Average wall-clock time per batch
    pub fn avg_batch_latency_ms(&self) -> u64 {
        if self.batches == 0 {
            0
        } else {
            self.batch_latency_ms / self.batches
        }
    }

    /// Share of mappings whose verdict came from the fallback
    pub fn fallback_rate(&self) -> f64 {
        if self.mappings == 0 {
            0.0
        } else {
            self.classification_fallbacks as f64 / self.mappings as f64
        }
    }
}
