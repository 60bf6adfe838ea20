//! Batch orchestration
//!
//! Sentences are capped, split into fixed-size batches and mapped
//! concurrently within a batch. Batches run one after another with a fixed
//! pause in between to stay under provider rate limits.
//!
//! A failing sentence is logged and dropped; it never aborts the run.
//! Cancellation is checked before every batch and during the pause.

use crate::aggregator::{MappingAggregator, MappingOutcome};
use crate::config::BatchConfig;
use futures::future::join_all;
use lexcheck_core::{ComplianceMapping, Result, Sentence, StrategyKind};
use lexcheck_telemetry::PipelineMetrics;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A sentence that was dropped after an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSentence {
    pub sentence_id: String,
    pub error: String,
}

/// Result of one orchestrated run
#[derive(Debug, Default)]
pub struct OrchestratorRun {
    /// Mappings sorted by sentence sequence
    pub mappings: Vec<ComplianceMapping>,

    /// Sentences that went through the aggregator
    pub analyzed: usize,

    /// Sentences beyond the cap
    pub truncated: usize,

    /// Sentences without any candidate
    pub unmatched: usize,

    pub failed: Vec<FailedSentence>,

    /// Mappings whose verdict came from the heuristic while an LLM was configured
    pub classification_fallbacks: usize,

    /// Mappings whose rationale came from the template while an LLM was configured
    pub rationale_fallbacks: usize,

    /// The run stopped early
    pub cancelled: bool,
}

/// Runs the aggregator over a document's sentences in batches
pub struct BatchOrchestrator {
    aggregator: MappingAggregator,
    config: BatchConfig,
}

impl BatchOrchestrator {
    /// Create an orchestrator
    pub fn new(aggregator: MappingAggregator, config: BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { aggregator, config })
    }

    pub fn aggregator(&self) -> &MappingAggregator {
        &self.aggregator
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Map every sentence up to the cap
    pub async fn run(
        &self,
        sentences: &[Sentence],
        cancel: &CancellationToken,
        metrics: &PipelineMetrics,
    ) -> OrchestratorRun {
        let cap = sentences.len().min(self.config.max_sentences);
        let (accepted, rest) = sentences.split_at(cap);

        let mut run = OrchestratorRun {
            truncated: rest.len(),
            ..Default::default()
        };

        if !rest.is_empty() {
            warn!(
                total = sentences.len(),
                max_sentences = self.config.max_sentences,
                truncated = rest.len(),
                "Sentence cap reached, remaining sentences are not analysed"
            );
            metrics.record_truncated(rest.len() as u64);
        }
        metrics.record_sentences(accepted.len() as u64);

        let llm_classification = self.aggregator.classification_strategy() == StrategyKind::Llm;
        let llm_rationale = self.aggregator.rationale_strategy() == StrategyKind::Llm;
        let delay = Duration::from_millis(self.config.inter_batch_delay_ms);

        for (index, batch) in accepted.chunks(self.config.batch_size).enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if cancel.is_cancelled() {
                info!(batch = index, mapped = run.mappings.len(), "Analysis cancelled");
                run.cancelled = true;
                break;
            }

            let started = Instant::now();
            let outcomes = join_all(batch.iter().map(|s| self.aggregator.outcome(s))).await;
            let elapsed = started.elapsed().as_millis() as u64;
            metrics.record_batch(elapsed);
            debug!(batch = index, size = batch.len(), latency_ms = elapsed, "Batch complete");

            run.analyzed += batch.len();
            for (sentence, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    MappingOutcome::Mapped(mapping) => {
                        if llm_classification
                            && mapping.classification_strategy != StrategyKind::Llm
                        {
                            run.classification_fallbacks += 1;
                            metrics.record_classification_fallback();
                        }
                        if llm_rationale && mapping.rationale_strategy != StrategyKind::Llm {
                            run.rationale_fallbacks += 1;
                            metrics.record_rationale_fallback();
                        }
                        metrics.record_mapping();
                        run.mappings.push(mapping);
                    }
                    MappingOutcome::Unmatched => {
                        metrics.record_unmatched();
                        run.unmatched += 1;
                    }
                    MappingOutcome::Failed(e) => {
                        warn!(sentence = %sentence.id, error = %e, "Sentence dropped");
                        metrics.record_failure();
                        run.failed.push(FailedSentence {
                            sentence_id: sentence.id.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        run.mappings.sort_by_key(|m| m.sentence_ref.sequence);
        run
    }
}

