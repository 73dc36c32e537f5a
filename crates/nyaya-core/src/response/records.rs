//! Typed records for each structured stage output.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::StageKind;

/// A record decoded from one stage's structured output.
pub trait StageRecord: for<'de> Deserialize<'de> {
    /// The stage whose output this record describes.
    const STAGE: StageKind;
}

/// Legal classification and advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalRecord {
    #[serde(default)]
    pub sections: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    pub advice: String,
}

impl StageRecord for LegalRecord {
    const STAGE: StageKind = StageKind::Legal;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        };
        f.write_str(name)
    }
}

/// Risks of the situation and of the proposed advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRecord {
    #[serde(default)]
    pub risks: Vec<String>,
    pub severity: Severity,
    #[serde(default)]
    pub concerns: String,
}

impl StageRecord for RiskRecord {
    const STAGE: StageKind = StageKind::Risk;
}

/// Safety determination. Absent fields stay `None` so gating can tell
/// "said no" apart from "said nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthicsRecord {
    #[serde(default)]
    pub is_safe: Option<bool>,
    #[serde(default)]
    pub veto: Option<bool>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl EthicsRecord {
    /// Missing `veto` reads as `false`.
    pub fn vetoed(&self) -> bool {
        self.veto.unwrap_or(false)
    }
}

impl StageRecord for EthicsRecord {
    const STAGE: StageKind = StageKind::Ethics;
}

/// Confidence assessment, score 0 to 100.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceRecord {
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub missing_info: Vec<String>,
    #[serde(default)]
    pub refusal_triggered: Option<bool>,
}

impl ConfidenceRecord {
    /// Missing `score` reads as `0`.
    pub fn score_or_zero(&self) -> u8 {
        self.score.unwrap_or(0)
    }

    /// Missing `refusal_triggered` reads as `false`.
    pub fn refusal_requested(&self) -> bool {
        self.refusal_triggered.unwrap_or(false)
    }
}

impl StageRecord for ConfidenceRecord {
    const STAGE: StageKind = StageKind::Confidence;
}
