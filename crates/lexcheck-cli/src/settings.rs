//! Layered configuration
//!
//! Precedence, lowest first:
//! 1. Built-in defaults
//! 2. YAML file (`--config`, optional)
//! 3. `LEXCHECK__*` environment variables, `__` separating sections
//!    (e.g. `LEXCHECK__BATCH__MAX_SENTENCES=50`)
//! 4. Command-line flags

use crate::Cli;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use lexcheck_engine::AnalysisConfig;
use std::path::Path;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "LEXCHECK";

/// Load the analysis configuration for a CLI invocation
pub fn load(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = load_layers(cli.config.as_deref(), Environment::with_prefix(ENV_PREFIX))?;
    apply_overrides(&mut config, cli);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Merge the YAML file and environment over the defaults
fn load_layers(path: Option<&Path>, env: Environment) -> Result<AnalysisConfig> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
    }

    let layered = builder
        .add_source(
            env.prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to read configuration")?;

    layered
        .try_deserialize::<AnalysisConfig>()
        .context("failed to parse configuration")
}

/// Apply command-line flags
fn apply_overrides(config: &mut AnalysisConfig, cli: &Cli) {
    if cli.no_llm {
        config.classifier.llm_enabled = false;
    }
    if let Some(namespace) = &cli.namespace {
        config.retrieval.namespace = namespace.clone();
    }
    if let Some(top_k) = cli.top_k {
        config.retrieval.top_k = top_k;
    }
    if let Some(max) = cli.max_sentences {
        config.batch.max_sentences = max;
    }
    if let Some(size) = cli.batch_size {
        config.batch.batch_size = size;
    }
    if let Some(delay) = cli.batch_delay_ms {
        config.batch.inter_batch_delay_ms = delay;
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["lexcheck", "doc.txt", "--corpus", "corpus.json"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_layers(None, env(&[])).unwrap();
        assert_eq!(config.batch.batch_size, 5);
        assert_eq!(config.retrieval.namespace, "constitution");
        assert!(config.classifier.llm_enabled);
    }

    #[test]
    fn test_file_then_env_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexcheck.yaml");
        std::fs::write(
            &path,
            "retrieval:\n  namespace: labour-code\n  top_k: 3\nbatch:\n  max_sentences: 40\n",
        )
        .unwrap();

        let mut config = load_layers(
            Some(&path),
            env(&[("LEXCHECK__BATCH__MAX_SENTENCES", "60"), ("LEXCHECK__RETRIEVAL__TOP_K", "4")]),
        )
        .unwrap();
        assert_eq!(config.retrieval.namespace, "labour-code");
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.batch.max_sentences, 60);

        apply_overrides(&mut config, &cli(&["--max-sentences", "10", "--no-llm"]));
        assert_eq!(config.batch.max_sentences, 10);
        assert_eq!(config.retrieval.top_k, 4);
        assert!(!config.classifier.llm_enabled);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_layers(Some(&dir.path().join("absent.yaml")), env(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let result = load(&cli(&["--batch-size", "0"]));
        assert!(result.is_err());
    }
}
