//! LexCheck Telemetry
//!
//! Provenance and metrics for LexCheck runs.
//!
//! Provides:
//! - A hash-chained audit trail of mappings and reports
//! - Per-run pipeline counters mirrored onto the `metrics` facade

pub mod audit;
pub mod metrics;

pub use audit::{AuditEvent, AuditEventKind, AuditTrail};
pub use metrics::{describe_metrics, MetricsSnapshot, PipelineMetrics};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::audit::{AuditEvent, AuditEventKind, AuditTrail};
    pub use crate::metrics::PipelineMetrics;
}
