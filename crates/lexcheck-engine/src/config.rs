//! Analysis configuration
//!
//! One YAML document configures the whole pipeline:
//!
//! ```yaml
//! segmenter:
//!   min_sentence_chars: 10
//! retrieval:
//!   namespace: constitution
//!   top_k: 5
//! classifier:
//!   llm_enabled: false
//! batch:
//!   batch_size: 5
//!   inter_batch_delay_ms: 1000
//!   max_sentences: 100
//! embedding:
//!   provider: hashing
//! ```
//!
//! Every field has a default, so an empty document is a valid config.

use lexcheck_classifiers::ClassifierConfig;
use lexcheck_core::{Error, OpenAiConfig, Result, SegmenterConfig};
use lexcheck_retrieval::{EmbeddingConfig, RetrievalConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    /// Completion endpoint used by classification, rationale and summary
    #[serde(default)]
    pub llm: OpenAiConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

impl AnalysisConfig {
    /// Load configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Invalid analysis config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.segmenter.chars_per_page == 0 {
            return Err(Error::config("segmenter.chars_per_page must be greater than zero"));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_score) {
            return Err(Error::config("retrieval.min_score must be within [0, 1]"));
        }
        if self.retrieval.namespace.trim().is_empty() {
            return Err(Error::config("retrieval.namespace must not be empty"));
        }
        if self.report.summary_timeout_ms == 0 {
            return Err(Error::config("report.summary_timeout_ms must be greater than zero"));
        }
        self.batch.validate()?;
        self.classifier.validate()?;
        if self.classifier.llm_enabled {
            self.validate_llm_deadlines()?;
        }
        Ok(())
    }

    /// Every LLM stage deadline must cover the client's full retry budget
    fn validate_llm_deadlines(&self) -> Result<()> {
        let budget = self.llm.retry_budget();
        let stages = [
            ("classifier.classify_timeout_ms", self.classifier.classify_timeout_ms),
            ("classifier.rationale_timeout_ms", self.classifier.rationale_timeout_ms),
            ("report.summary_timeout_ms", self.report.summary_timeout_ms),
        ];

        for (name, timeout_ms) in stages {
            if Duration::from_millis(timeout_ms) < budget {
                return Err(Error::config(format!(
                    "{} ({}ms) is shorter than the llm retry budget ({}ms = {} attempts of {}ms \
                     plus backoff); raise it or lower llm.timeout_ms / llm.retry.max_retries",
                    name,
                    timeout_ms,
                    budget.as_millis(),
                    self.llm.retry.max_retries + 1,
                    self.llm.timeout_ms
                )));
            }
        }
        Ok(())
    }
}

/// Batching and cost limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Sentences processed concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches (rate limiting); 0 disables it
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,

    /// Sentences beyond this cap are never analysed
    #[serde(default = "default_max_sentences")]
    pub max_sentences: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            max_sentences: default_max_sentences(),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("batch.batch_size must be greater than zero"));
        }
        if self.max_sentences == 0 {
            return Err(Error::config("batch.max_sentences must be greater than zero"));
        }
        Ok(())
    }
}

/// Report assembly settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Deadline for the summarization call, client retries included
    #[serde(default = "default_summary_timeout_ms")]
    pub summary_timeout_ms: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            summary_timeout_ms: default_summary_timeout_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    5
}

fn default_inter_batch_delay_ms() -> u64 {
    1000
}

fn default_max_sentences() -> usize {
    100
}

fn default_summary_timeout_ms() -> u64 {
    45_000
}
