//! Configuration for verdict classification and rationale generation

use lexcheck_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the classification strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Use the LLM as the primary strategy; when false only the
    /// deterministic strategies run
    #[serde(default = "default_true")]
    pub llm_enabled: bool,

    /// Deadline for one LLM classification call, client retries included
    #[serde(default = "default_classify_timeout_ms")]
    pub classify_timeout_ms: u64,

    /// Deadline for one LLM rationale call, client retries included
    #[serde(default = "default_rationale_timeout_ms")]
    pub rationale_timeout_ms: u64,

    /// Token cap for generated rationales
    #[serde(default = "default_rationale_max_tokens")]
    pub rationale_max_tokens: u32,

    /// Similarity thresholds of the heuristic strategy
    #[serde(default)]
    pub heuristic: HeuristicThresholds,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            llm_enabled: true,
            classify_timeout_ms: default_classify_timeout_ms(),
            rationale_timeout_ms: default_rationale_timeout_ms(),
            rationale_max_tokens: default_rationale_max_tokens(),
            heuristic: HeuristicThresholds::default(),
        }
    }
}

impl ClassifierConfig {
    /// Load configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Invalid classifier config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject zero timeouts and inconsistent thresholds
    pub fn validate(&self) -> Result<()> {
        if self.classify_timeout_ms == 0 || self.rationale_timeout_ms == 0 {
            return Err(Error::config("classifier timeouts must be greater than zero"));
        }
        self.heuristic.validate()
    }
}

/// Similarity thresholds for the heuristic classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicThresholds {
    /// Minimum similarity for YES
    #[serde(default = "default_yes_threshold")]
    pub yes: f64,

    /// Minimum similarity for PARTIAL
    #[serde(default = "default_partial_threshold")]
    pub partial: f64,
}

impl Default for HeuristicThresholds {
    fn default() -> Self {
        Self {
            yes: default_yes_threshold(),
            partial: default_partial_threshold(),
        }
    }
}

impl HeuristicThresholds {
    /// Thresholds must lie in `[0, 1]` with `partial <= yes`
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.yes) || !in_unit(self.partial) {
            return Err(Error::config("heuristic thresholds must be within [0, 1]"));
        }
        if self.partial > self.yes {
            return Err(Error::config(format!(
                "partial threshold {} exceeds yes threshold {}",
                self.partial, self.yes
            )));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_classify_timeout_ms() -> u64 {
    35_000
}

fn default_rationale_timeout_ms() -> u64 {
    35_000
}

fn default_rationale_max_tokens() -> u32 {
    200
}

fn default_yes_threshold() -> f64 {
    0.85
}

fn default_partial_threshold() -> f64 {
    0.70
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClassifierConfig::default();
        assert!(config.llm_enabled);
        assert_eq!(config.heuristic.yes, 0.85);
        assert_eq!(config.heuristic.partial, 0.70);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
llm_enabled: false
heuristic:
  yes: 0.9
"#;
        let config = ClassifierConfig::from_yaml(yaml).unwrap();
        assert!(!config.llm_enabled);
        assert_eq!(config.heuristic.yes, 0.9);
        assert_eq!(config.heuristic.partial, 0.70);
        assert_eq!(config.classify_timeout_ms, 35_000);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let yaml = "heuristic:\n  yes: 0.6\n  partial: 0.8\n";
        assert!(ClassifierConfig::from_yaml(yaml).is_err());

        let yaml = "heuristic:\n  yes: 1.5\n";
        assert!(ClassifierConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classifier.yaml");
        std::fs::write(&path, "classify_timeout_ms: 500\n").unwrap();

        let config = ClassifierConfig::from_file(&path).unwrap();
        assert_eq!(config.classify_timeout_ms, 500);
    }
}
