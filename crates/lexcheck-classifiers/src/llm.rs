//! LLM-backed verdict classification
//!
//! One structured-output request per (sentence, provision) pair, at
//! temperature 0. The model must answer with a single JSON object:
//!
//! ```json
//! {"decision": "YES" | "NO" | "PARTIAL", "confidence": 0-100}
//! ```
//!
//! Anything else is rejected as [`Error::Classification`].

use crate::classifier::{Verdict, VerdictClassifier};
use async_trait::async_trait;
use lexcheck_core::llm::parse_json_payload;
use lexcheck_core::{
    CompletionClient, CompletionRequest, Decision, Error, ProvisionCandidate, Result, Sentence,
    StrategyKind,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a legal compliance analyst. You compare one sentence from a \
document against one provision of a legal corpus and decide whether the sentence aligns with \
(YES), contradicts (NO) or only partly aligns with (PARTIAL) the provision. Respond with a JSON \
object of the form {\"decision\": \"YES|NO|PARTIAL\", \"confidence\": <integer 0-100>} and \
nothing else.";

/// Classifier that asks a completion model for the verdict
pub struct LlmVerdictClassifier {
    client: Arc<dyn CompletionClient>,
}

impl LlmVerdictClassifier {
    /// Create a new LLM classifier
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    fn build_request(sentence: &Sentence, candidate: &ProvisionCandidate) -> CompletionRequest {
        let provision = &candidate.provision;
        let user = format!(
            "Document sentence:\n\"{}\"\n\nProvision {} [{}]:\n\"{}\"\n\n\
             Classify the sentence against the provision.",
            sentence.text,
            provision.reference(),
            provision.id,
            provision.text
        );

        CompletionRequest::new()
            .system(SYSTEM_PROMPT)
            .user(user)
            .json()
            .with_max_tokens(60)
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    decision: String,
    confidence: f64,
}

/// Validate a raw model answer against the verdict schema
pub fn parse_verdict(content: &str) -> Result<Verdict> {
    let raw: RawVerdict = parse_json_payload(content)
        .map_err(|e| Error::classification(format!("malformed verdict: {}", e)))?;

    let decision = Decision::parse(&raw.decision).ok_or_else(|| {
        Error::classification(format!("decision '{}' is not YES, NO or PARTIAL", raw.decision))
    })?;

    if !raw.confidence.is_finite() || !(0.0..=100.0).contains(&raw.confidence) {
        return Err(Error::classification(format!(
            "confidence {} is outside [0, 100]",
            raw.confidence
        )));
    }

    Ok(Verdict::new(decision, raw.confidence.round() as u8, StrategyKind::Llm))
}

#[async_trait]
impl VerdictClassifier for LlmVerdictClassifier {
    async fn classify(
        &self,
        sentence: &Sentence,
        candidate: &ProvisionCandidate,
    ) -> Result<Verdict> {
        let request = Self::build_request(sentence, candidate);
        let response = self.client.complete(&request).await?;

        let verdict = parse_verdict(&response.content)?;
        debug!(
            sentence = %sentence.id,
            provision = %candidate.provision.id,
            decision = %verdict.decision,
            confidence = verdict.confidence,
            latency_ms = response.latency_ms,
            "LLM verdict"
        );
        Ok(verdict)
    }

    fn name(&self) -> &str {
        self.client.name()
    }

    fn strategy(&self) -> StrategyKind {
        StrategyKind::Llm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexcheck_core::ResponseFormat;

    #[test]
    fn test_parse_valid_verdict() {
        let verdict = parse_verdict(r#"{"decision": "partial", "confidence": 72.4}"#).unwrap();
        assert_eq!(verdict.decision, Decision::Partial);
        assert_eq!(verdict.confidence, 72);
        assert_eq!(verdict.strategy, StrategyKind::Llm);
    }

    #[test]
    fn test_parse_fenced_verdict() {
        let verdict =
            parse_verdict("```json\n{\"decision\":\"YES\",\"confidence\":91}\n```").unwrap();
        assert_eq!(verdict.decision, Decision::Yes);
    }

    #[test]
    fn test_parse_rejects_unknown_decision() {
        let result = parse_verdict(r#"{"decision": "MAYBE", "confidence": 50}"#);
        assert!(matches!(result, Err(Error::Classification(_))));
    }

    #[test]
    fn test_parse_rejects_out_of_range_confidence() {
        assert!(parse_verdict(r#"{"decision": "NO", "confidence": 140}"#).is_err());
        assert!(parse_verdict(r#"{"decision": "NO", "confidence": -1}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_fields_and_prose() {
        assert!(parse_verdict(r#"{"decision": "NO"}"#).is_err());
        assert!(parse_verdict(r#"{"decision": "NO", "confidence": "high"}"#).is_err());
        assert!(matches!(
            parse_verdict("The sentence complies."),
            Err(Error::Classification(_))
        ));
    }

    #[test]
    fn test_request_is_deterministic_json() {
        let sentence = Sentence {
            id: "s-0001".into(),
            sequence: 0,
            text: "Workers may be detained without charge.".into(),
            start_char: 0,
            end_char: 39,
            page: 1,
            paragraph: 1,
            line: 1,
        };
        let candidate = ProvisionCandidate::new(
            lexcheck_core::Provision {
                id: "article-21".into(),
                article_number: "21".into(),
                heading: "Protection of life".into(),
                part: String::new(),
                part_name: String::new(),
                text: "No person shall be deprived of personal liberty.".into(),
                start_char: 0,
                end_char: 0,
            },
            0.8,
            "v1",
        );

        let request = LlmVerdictClassifier::build_request(&sentence, &candidate);
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.response_format, ResponseFormat::Json);
        assert!(request.messages[1].content.contains("article-21"));
        assert!(request.messages[1].content.contains("detained without charge"));
    }
}
