//! Gating: turns parsed Ethics and Confidence output into gate decisions.
//!
//! The gates apply strict, non-configurable policy rules:
//! 1. Ethics refuses only on a successfully parsed `veto: true`
//! 2. Confidence refuses only on a successfully parsed record with
//!    `refusal_triggered: true` or `score < 40`
//! 3. Output that fails to parse never refuses (fail open)
//!
//! Thresholds are policy, not per-request tuning.

use serde::{Deserialize, Serialize};

use crate::response::{ConfidenceRecord, EthicsRecord, ParsedOutput};

/// Scores strictly below this refuse.
pub const CONFIDENCE_THRESHOLD: u8 = 40;

/// Refusal reason when a veto carries no reason of its own.
pub const DEFAULT_VETO_REASON: &str = "Safety Violation";

/// Refusal reason for the confidence gate.
pub const LOW_CONFIDENCE_REASON: &str = "Low Confidence / Insufficient Information";

/// Decision of one gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateResult {
    /// Parsed, and the gate is not triggered.
    Clear,

    /// Parsed, and the gate refuses.
    Triggered { reason: String },

    /// Output could not be parsed; treated as not triggered.
    NoSignal,
}

impl GateResult {
    pub fn is_triggered(&self) -> bool {
        matches!(self, GateResult::Triggered { .. })
    }

    /// True for both `Clear` and `NoSignal`.
    pub fn allows(&self) -> bool {
        !self.is_triggered()
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            GateResult::Triggered { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Ethics veto gate.
pub fn ethics_gate(output: &ParsedOutput<EthicsRecord>) -> GateResult {
    let Some(record) = output.record() else {
        return GateResult::NoSignal;
    };

    if !record.vetoed() {
        return GateResult::Clear;
    }

    let reason = record
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_VETO_REASON);

    GateResult::Triggered {
        reason: reason.to_string(),
    }
}

/// Confidence gate.
pub fn confidence_gate(output: &ParsedOutput<ConfidenceRecord>) -> GateResult {
    let Some(record) = output.record() else {
        return GateResult::NoSignal;
    };

    if record.refusal_requested() || record.score_or_zero() < CONFIDENCE_THRESHOLD {
        GateResult::Triggered {
            reason: LOW_CONFIDENCE_REASON.to_string(),
        }
    } else {
        GateResult::Clear
    }
}
