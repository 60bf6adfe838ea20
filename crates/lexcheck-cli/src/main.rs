//! LexCheck CLI
//!
//! Analyses a document against a legal corpus and writes the compliance
//! report as JSON, plus an optional markdown digest and audit trail.
//!
//! ```text
//! lexcheck policy.txt --corpus constitution.json -o report.json --digest report.md
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use lexcheck_core::DocumentMeta;
use lexcheck_engine::{CancellationToken, ComplianceAnalyzer};
use lexcheck_report::render_markdown;
use lexcheck_retrieval::ProvisionCorpus;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{info, warn};

mod settings;

#[derive(Parser, Debug)]
#[command(name = "lexcheck")]
#[command(
    about = "Map a document's sentences to legal provisions and report compliance",
    long_about = None
)]
pub struct Cli {
    /// Document to analyse (plain text or markdown)
    pub document: PathBuf,

    /// Provision corpus (JSON: {"namespace": .., "provisions": [..]})
    #[arg(long)]
    pub corpus: PathBuf,

    /// Configuration file path (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a markdown digest of the report
    #[arg(long)]
    pub digest: Option<PathBuf>,

    /// Write the hash-chained audit trail as JSON
    #[arg(long)]
    pub audit: Option<PathBuf>,

    /// Document name recorded in the report (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,

    /// API key for the completion and embedding endpoints
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Use only the deterministic strategies
    #[arg(long)]
    pub no_llm: bool,

    /// Corpus namespace to search
    #[arg(long)]
    pub namespace: Option<String>,

    /// Candidates retrieved per sentence
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Maximum sentences analysed
    #[arg(long)]
    pub max_sentences: Option<usize>,

    /// Sentences per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Pause between batches in milliseconds
    #[arg(long)]
    pub batch_delay_ms: Option<u64>,

    /// Completion model
    #[arg(long)]
    pub model: Option<String>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    pub metrics: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);
    let metrics_handle = if cli.metrics { Some(init_metrics()?) } else { None };

    let config = settings::load(&cli)?;
    info!(
        namespace = %config.retrieval.namespace,
        llm = config.classifier.llm_enabled,
        max_sentences = config.batch.max_sentences,
        "Configuration loaded"
    );

    let corpus = ProvisionCorpus::from_file(&cli.corpus)
        .with_context(|| format!("failed to load corpus {}", cli.corpus.display()))?;
    let text = std::fs::read_to_string(&cli.document)
        .with_context(|| format!("failed to read document {}", cli.document.display()))?;
    let meta = document_meta(&cli.document, cli.name.as_deref(), text.len() as u64);

    let analyzer = ComplianceAnalyzer::from_corpus(config, &corpus, cli.api_key.clone()).await?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let analysis = analyzer.analyze_with_cancel(&text, meta, cancel).await?;
    let report = &analysis.report;

    let json = report.to_json()?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{}", json),
    }

    if let Some(path) = &cli.digest {
        std::fs::write(path, render_markdown(report))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "Digest written");
    }

    if let Some(path) = &cli.audit {
        let trail = serde_json::to_string_pretty(&analysis.audit_trail)?;
        std::fs::write(path, trail).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), events = analysis.audit_trail.len(), "Audit trail written");
    }

    if let Some(handle) = metrics_handle {
        eprintln!("{}", handle.render());
    }

    info!(
        overall = %report.summary.overall_compliance,
        mappings = report.summary.total_snippets,
        violations = report.violations.len(),
        "Done"
    );
    Ok(())
}

/// Cancel the run on Ctrl+C; the partial report is still written
async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        warn!("Interrupt received, finishing current batch");
        cancel.cancel();
    }
}

/// Describe the input file
fn document_meta(path: &Path, name: Option<&str>, size: u64) -> DocumentMeta {
    let name = name.map(str::to_string).unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    });
    let mime_type = match path.extension().and_then(|e| e.to_str()) {
        Some("md") | Some("markdown") => "text/markdown",
        _ => "text/plain",
    };

    DocumentMeta::new(name)
        .with_size(size)
        .with_mime_type(mime_type)
        .with_source_location(path.display().to_string())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("lexcheck=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexcheck=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Install the Prometheus recorder and register metric descriptions
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;
    lexcheck_telemetry::describe_metrics();

    info!("Metrics recorder installed");
    Ok(handle)
}
