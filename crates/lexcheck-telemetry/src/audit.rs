//! Hash-chained provenance trail
//!
//! Every mapping and the final report are recorded as events whose hash
//! covers the previous event's hash. Editing, reordering or dropping an
//! event breaks [`AuditTrail::verify`].

use chrono::{DateTime, SecondsFormat, Utc};
use lexcheck_core::ComplianceMapping;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

/// Audit trail with hash-chained events for tamper detection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditTrail {
    events: Vec<AuditEvent>,
}

impl AuditTrail {
    /// Create a new audit trail
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event, chaining it to the current head
    pub fn add_event(&mut self, event: AuditEvent) -> &AuditEvent {
        let mut event = event;
        event.previous_hash = self.head_hash().map(str::to_string);
        event.hash = Some(compute_hash(&event));

        self.events.push(event);
        let index = self.events.len() - 1;
        &self.events[index]
    }

    /// Record a created mapping
    pub fn record_mapping(&mut self, mapping: &ComplianceMapping) {
        let data = serde_json::json!({
            "sentenceId": mapping.sentence_ref.sentence_id,
            "provisionId": mapping.provision_match.id,
            "decision": mapping.decision,
            "confidence": mapping.confidence,
            "similarity": mapping.similarity_score,
            "vectorId": mapping.provenance.vector_id,
            "namespace": mapping.provenance.namespace,
            "classificationStrategy": mapping.classification_strategy,
            "rationaleStrategy": mapping.rationale_strategy,
        });
        self.add_event(
            AuditEvent::new(AuditEventKind::MappingCreated, &mapping.mapping_id).with_data(data),
        );
    }

    /// Verify the integrity of the chain
    pub fn verify(&self) -> bool {
        let mut prev_hash: Option<&str> = None;

        for event in &self.events {
            if event.previous_hash.as_deref() != prev_hash {
                warn!(event = %event.event_id, subject = %event.subject, "Audit chain link broken");
                return false;
            }

            let computed = compute_hash(event);
            if event.hash.as_deref() != Some(computed.as_str()) {
                warn!(
                    event = %event.event_id,
                    subject = %event.subject,
                    "Audit event hash mismatch"
                );
                return false;
            }

            prev_hash = event.hash.as_deref();
        }

        true
    }

    /// Hash of the latest event
    pub fn head_hash(&self) -> Option<&str> {
        self.events.last().and_then(|e| e.hash.as_deref())
    }

    /// Get all events
    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the trail is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn compute_hash(event: &AuditEvent) -> String {
    let mut hasher = Sha256::new();

    hasher.update(event.event_id.as_bytes());
    hasher.update(event.kind.as_str().as_bytes());
    hasher.update(event.subject.as_bytes());
    if let Some(data) = &event.data {
        hasher.update(data.to_string().as_bytes());
    }
    hasher.update(
        event
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Nanos, true)
            .as_bytes(),
    );
    if let Some(prev) = &event.previous_hash {
        hasher.update(prev.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}

/// Category of a provenance event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// Analysis started for a document
    AnalysisStarted,
    /// A sentence was mapped to a provision
    MappingCreated,
    /// A sentence was dropped after an error
    SentenceFailed,
    /// The final report was assembled
    ReportBuilt,
}

impl AuditEventKind {
    /// Wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalysisStarted => "analysis_started",
            Self::MappingCreated => "mapping_created",
            Self::SentenceFailed => "sentence_failed",
            Self::ReportBuilt => "report_built",
        }
    }
}

/// A single event in the trail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Unique event id
    pub event_id: Uuid,

    /// Event category
    pub kind: AuditEventKind,

    /// What the event is about (mapping id, sentence id, document name)
    pub subject: String,

    /// Event payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    pub timestamp: DateTime<Utc>,

    /// Hash of this event
    pub hash: Option<String>,

    /// Hash of previous event (for chaining)
    pub previous_hash: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event
    pub fn new(kind: AuditEventKind, subject: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            subject: subject.into(),
            data: None,
            timestamp: Utc::now(),
            hash: None,
            previous_hash: None,
        }
    }

    /// Set event data
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_trail() {
        let mut trail = AuditTrail::new();
        assert!(trail.head_hash().is_none());

        trail.add_event(AuditEvent::new(AuditEventKind::AnalysisStarted, "lease.txt"));
        trail.add_event(AuditEvent::new(AuditEventKind::ReportBuilt, "lease.txt"));

        assert!(trail.verify());
        assert_eq!(trail.len(), 2);
        assert_eq!(trail.events()[1].previous_hash, trail.events()[0].hash);
        assert_eq!(trail.head_hash(), trail.events()[1].hash.as_deref());
    }

    #[test]
    fn test_tamper_detection() {
        let mut trail = AuditTrail::new();

        trail.add_event(AuditEvent::new(AuditEventKind::MappingCreated, "map-0001"));
        trail.add_event(AuditEvent::new(AuditEventKind::MappingCreated, "map-0002"));

        trail.events[0].subject = "map-9999".to_string();
        assert!(!trail.verify());
    }

    #[test]
    fn test_tampered_payload_detected() {
        let mut trail = AuditTrail::new();
        trail.add_event(
            AuditEvent::new(AuditEventKind::MappingCreated, "map-0001")
                .with_data(serde_json::json!({"decision": "NO"})),
        );

        trail.events[0].data = Some(serde_json::json!({"decision": "YES"}));
        assert!(!trail.verify());
    }

    #[test]
    fn test_dropped_event_detected() {
        let mut trail = AuditTrail::new();
        trail.add_event(AuditEvent::new(AuditEventKind::MappingCreated, "map-0001"));
        trail.add_event(AuditEvent::new(AuditEventKind::MappingCreated, "map-0002"));
        trail.add_event(AuditEvent::new(AuditEventKind::ReportBuilt, "doc"));

        trail.events.remove(1);
        assert!(!trail.verify());
    }
}
