//! Core types shared by the core and runtime crates.
//!
//! The serialized shape of [`Verdict`] is the service boundary contract:
//! `status` is one of `SUCCESS`, `REFUSED`, `ERROR`, and `logs` is a list of
//! `{agent, msg}` entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five analysis stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Language,
    Legal,
    Risk,
    Ethics,
    Confidence,
}

impl StageKind {
    /// All stages in the order the coordinator runs them.
    pub const PIPELINE: [StageKind; 5] = [
        StageKind::Language,
        StageKind::Legal,
        StageKind::Risk,
        StageKind::Ethics,
        StageKind::Confidence,
    ];

    /// Label used for audit log entries.
    pub fn agent_name(&self) -> &'static str {
        match self {
            StageKind::Language => "Language",
            StageKind::Legal => "Legal",
            StageKind::Risk => "Risk",
            StageKind::Ethics => "Ethics",
            StageKind::Confidence => "Confidence",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.agent_name())
    }
}

/// The normalized situation handed to every stage after Language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    text: String,
    language: String,
}

impl Query {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Language the text is in: the working language, or "Unknown" when
    /// translation was needed but did not happen.
    pub fn language(&self) -> &str {
        &self.language
    }
}

/// One audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub agent: String,
    pub msg: String,
}

impl AuditEntry {
    pub fn new(agent: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            msg: msg.into(),
        }
    }

    pub fn stage(stage: StageKind, msg: impl Into<String>) -> Self {
        Self::new(stage.agent_name(), msg)
    }
}

/// Ordered, append-only record of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: StageKind, msg: impl Into<String>) {
        self.entries.push(AuditEntry::stage(stage, msg));
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Agent labels in order, mostly useful in assertions.
    pub fn agents(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.agent.as_str()).collect()
    }

    pub fn into_entries(self) -> Vec<AuditEntry> {
        self.entries
    }
}

/// Terminal output of one deliberation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Success { response: String, logs: AuditLog },
    Refused { reason: String, logs: AuditLog },
    Error { reason: String, logs: AuditLog },
}

impl Verdict {
    pub fn status(&self) -> &'static str {
        match self {
            Verdict::Success { .. } => "SUCCESS",
            Verdict::Refused { .. } => "REFUSED",
            Verdict::Error { .. } => "ERROR",
        }
    }

    pub fn logs(&self) -> &AuditLog {
        match self {
            Verdict::Success { logs, .. }
            | Verdict::Refused { logs, .. }
            | Verdict::Error { logs, .. } => logs,
        }
    }

    /// Refusal or error reason; `None` on success.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Success { .. } => None,
            Verdict::Refused { reason, .. } | Verdict::Error { reason, .. } => Some(reason),
        }
    }

    pub fn response(&self) -> Option<&str> {
        match self {
            Verdict::Success { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success { .. })
    }

    pub fn is_refused(&self) -> bool {
        matches!(self, Verdict::Refused { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error { .. })
    }
}

/// States of the deliberation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliberationState {
    Start,
    Translated,
    LegalDone,
    RiskDone,
    EthicsChecked,
    ConfidenceChecked,
    RefusedEthics,
    RefusedConfidence,
    Success,
    Error,
}

impl DeliberationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliberationState::RefusedEthics
                | DeliberationState::RefusedConfidence
                | DeliberationState::Success
                | DeliberationState::Error
        )
    }

    /// The stage whose completion moves the machine out of this state.
    pub fn next_stage(&self) -> Option<StageKind> {
        match self {
            DeliberationState::Start => Some(StageKind::Language),
            DeliberationState::Translated => Some(StageKind::Legal),
            DeliberationState::LegalDone => Some(StageKind::Risk),
            DeliberationState::RiskDone => Some(StageKind::Ethics),
            DeliberationState::EthicsChecked => Some(StageKind::Confidence),
            _ => None,
        }
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: DeliberationState) -> bool {
        use DeliberationState::*;
        if next == Error {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Start, Translated)
                | (Translated, LegalDone)
                | (LegalDone, RiskDone)
                | (RiskDone, EthicsChecked)
                | (EthicsChecked, RefusedEthics)
                | (EthicsChecked, ConfidenceChecked)
                | (ConfidenceChecked, RefusedConfidence)
                | (ConfidenceChecked, Success)
        )
    }
}

impl fmt::Display for DeliberationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeliberationState::Start => "START",
            DeliberationState::Translated => "TRANSLATED",
            DeliberationState::LegalDone => "LEGAL_DONE",
            DeliberationState::RiskDone => "RISK_DONE",
            DeliberationState::EthicsChecked => "ETHICS_CHECKED",
            DeliberationState::ConfidenceChecked => "CONFIDENCE_CHECKED",
            DeliberationState::RefusedEthics => "REFUSED_ETHICS",
            DeliberationState::RefusedConfidence => "REFUSED_CONFIDENCE",
            DeliberationState::Success => "SUCCESS",
            DeliberationState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_wire_format() {
        let mut logs = AuditLog::new();
        logs.record(StageKind::Legal, "File an FIR");
        let verdict = Verdict::Success {
            response: "File an FIR".to_string(),
            logs,
        };

        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["response"], "File an FIR");
        assert_eq!(json["logs"][0]["agent"], "Legal");
        assert_eq!(json["logs"][0]["msg"], "File an FIR");
    }

    #[test]
    fn test_refused_and_error_carry_reason() {
        let refused = Verdict::Refused {
            reason: "Violence".to_string(),
            logs: AuditLog::new(),
        };
        let json = serde_json::to_value(&refused).unwrap();
        assert_eq!(json["status"], "REFUSED");
        assert_eq!(json["reason"], "Violence");
        assert!(json.get("response").is_none());

        let error: Verdict =
            serde_json::from_str(r#"{"status":"ERROR","reason":"boom","logs":[]}"#).unwrap();
        assert!(error.is_error());
        assert_eq!(error.reason(), Some("boom"));
    }

    #[test]
    fn test_state_transitions() {
        use DeliberationState::*;
        assert!(Start.can_transition_to(Translated));
        assert!(EthicsChecked.can_transition_to(RefusedEthics));
        assert!(!Start.can_transition_to(LegalDone));
        assert!(!LegalDone.can_transition_to(EthicsChecked));
        assert!(RiskDone.can_transition_to(Error));
        assert!(!Success.can_transition_to(Error));
        assert_eq!(EthicsChecked.next_stage(), Some(StageKind::Confidence));
        assert_eq!(Success.next_stage(), None);
    }

    #[test]
    fn test_pipeline_order() {
        let names: Vec<_> = StageKind::PIPELINE.iter().map(|s| s.agent_name()).collect();
        assert_eq!(names, ["Language", "Legal", "Risk", "Ethics", "Confidence"]);
    }
}
