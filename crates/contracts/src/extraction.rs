//! Wire types for the two language-service calls.
//!
//! The analysis prompts instruct the model to answer with bare JSON using
//! camelCase keys; these types mirror that schema exactly. `parse` strips
//! markdown code fences first because models add them despite instructions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PromiseKind {
    Explicit,
    Implicit,
    #[default]
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    #[serde(other)]
    Unrated,
}

impl Severity {
    /// Only clear contradictions may break a promise; minor or unrated
    /// inconsistencies never do.
    pub fn breaks_promises(self) -> bool {
        matches!(self, Self::Medium | Self::High)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPromise {
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: PromiseKind,
    #[serde(default)]
    pub target_citizen: Option<String>,
    #[serde(default)]
    pub deadline_turn: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContradictionFinding {
    pub description: String,
    #[serde(default)]
    pub speech_quote: Option<String>,
    #[serde(default)]
    pub contradicting_action: Option<String>,
    pub severity: Severity,
}

/// First-call answer: promises made in the speech plus contradictions
/// against prior commitments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionPayload {
    #[serde(default)]
    pub promises: Vec<ExtractedPromise>,
    #[serde(default)]
    pub contradictions: Vec<ContradictionFinding>,
}

impl ExtractionPayload {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(strip_code_fences(raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CitizenReaction {
    pub citizen_name: String,
    pub dialogue: String,
    #[serde(default)]
    pub tone: Option<String>,
    pub approval_delta: i64,
}

/// Second-call answer: one in-character reaction per citizen.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReactionsPayload {
    #[serde(default)]
    pub reactions: Vec<CitizenReaction>,
}

impl ReactionsPayload {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(strip_code_fences(raw))
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let mut cleaned = raw.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_extraction_with_code_fences() {
        let raw = r#"```json
        {
          "promises": [
            {"text": "the forest stays", "type": "implicit", "targetCitizen": "Mia", "deadlineTurn": null}
          ],
          "contradictions": [
            {"description": "promised jobs, closed the refinery", "speechQuote": "jobs for all", "contradictingAction": "demolished the oil refinery", "severity": "high"}
          ]
        }
        ```"#;

        let payload = ExtractionPayload::parse(raw).expect("parse");
        assert_eq!(payload.promises.len(), 1);
        assert_eq!(payload.promises[0].kind, PromiseKind::Implicit);
        assert_eq!(payload.promises[0].target_citizen.as_deref(), Some("Mia"));
        assert_eq!(payload.contradictions[0].severity, Severity::High);
    }

    #[test]
    fn unknown_severity_is_unrated_and_never_breaking() {
        let raw = r#"{"contradictions": [{"description": "vague", "severity": "catastrophic"}]}"#;
        let payload = ExtractionPayload::parse(raw).expect("parse");
        assert_eq!(payload.contradictions[0].severity, Severity::Unrated);
        assert!(!payload.contradictions[0].severity.breaks_promises());
    }

    #[test]
    fn reactions_payload_requires_valid_json() {
        assert!(ReactionsPayload::parse("not json at all").is_err());

        let raw = r#"{"reactions": [{"citizenName": "Karl", "dialogue": "Fine words.", "tone": "suspicious", "approvalDelta": -3}]}"#;
        let payload = ReactionsPayload::parse(raw).expect("parse");
        assert_eq!(payload.reactions[0].citizen_name, "Karl");
        assert_eq!(payload.reactions[0].approval_delta, -3);
    }

    #[test]
    fn missing_reactions_field_defaults_to_empty() {
        let payload = ReactionsPayload::parse("{}").expect("parse");
        assert!(payload.reactions.is_empty());
    }
}
