//! Decoding raw stage text into typed records.

use serde::{Deserialize, Serialize};

use super::records::StageRecord;
use super::schema::validate_stage_output;

/// Outcome of decoding one stage's raw text.
///
/// Exactly one of the two: a schema-valid record, or the untouched raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedOutput<T> {
    Parsed { record: T },
    Fallback { raw: String },
}

impl<T> ParsedOutput<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParsedOutput::Parsed { .. })
    }

    pub fn record(&self) -> Option<&T> {
        match self {
            ParsedOutput::Parsed { record } => Some(record),
            ParsedOutput::Fallback { .. } => None,
        }
    }

    pub fn into_record(self) -> Option<T> {
        match self {
            ParsedOutput::Parsed { record } => Some(record),
            ParsedOutput::Fallback { .. } => None,
        }
    }

    /// The raw text, when decoding failed.
    pub fn fallback_raw(&self) -> Option<&str> {
        match self {
            ParsedOutput::Parsed { .. } => None,
            ParsedOutput::Fallback { raw } => Some(raw),
        }
    }
}

/// Decode `raw` as the record type for its stage.
///
/// Never fails. Malformed JSON, schema violations and type mismatches all
/// produce [`ParsedOutput::Fallback`] holding `raw` exactly as given.
pub fn parse<T: StageRecord>(raw: &str) -> ParsedOutput<T> {
    match decode::<T>(raw) {
        Ok(record) => ParsedOutput::Parsed { record },
        Err(reason) => {
            tracing::debug!(stage = %T::STAGE, reason = %reason, "Stage output fell back to raw text");
            ParsedOutput::Fallback {
                raw: raw.to_string(),
            }
        }
    }
}

fn decode<T: StageRecord>(raw: &str) -> Result<T, String> {
    let payload = strip_code_fence(raw.trim());
    let value: serde_json::Value = serde_json::from_str(payload).map_err(|e| e.to_string())?;
    validate_stage_output(T::STAGE, &value).map_err(|errors| errors.join("; "))?;
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Unwrap a single Markdown code fence (```` ```json ... ``` ````) around the payload.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::records::{ConfidenceRecord, EthicsRecord, LegalRecord, RiskRecord, Severity};
    use proptest::prelude::*;

    #[test]
    fn test_parse_legal() {
        let raw = r#"{"sections": ["Section 378", "Section 379"], "reasoning": "Movable property taken", "advice": "File an FIR"}"#;
        let record = parse::<LegalRecord>(raw).into_record().unwrap();
        assert_eq!(record.sections, ["Section 378", "Section 379"]);
        assert_eq!(record.advice, "File an FIR");
    }

    #[test]
    fn test_parse_risk() {
        let raw = r#"{"risks": ["Retaliation"], "severity": "High", "concerns": "Threats"}"#;
        let record = parse::<RiskRecord>(raw).into_record().unwrap();
        assert_eq!(record.severity, Severity::High);
        assert_eq!(record.risks, ["Retaliation"]);
    }

    #[test]
    fn test_parse_partial_ethics() {
        let record = parse::<EthicsRecord>(r#"{"veto": true, "reason": "Violence"}"#)
            .into_record()
            .unwrap();
        assert!(record.vetoed());
        assert_eq!(record.is_safe, None);
        assert_eq!(record.reason.as_deref(), Some("Violence"));

        let record = parse::<EthicsRecord>("{}").into_record().unwrap();
        assert!(!record.vetoed());
    }

    #[test]
    fn test_parse_partial_confidence() {
        let record = parse::<ConfidenceRecord>(r#"{"refusal_triggered": false}"#)
            .into_record()
            .unwrap();
        assert_eq!(record.score_or_zero(), 0);
        assert!(!record.refusal_requested());
    }

    #[test]
    fn test_code_fence_is_unwrapped() {
        let raw = "```json\n{\"veto\": false, \"is_safe\": true, \"reason\": \"\"}\n```";
        assert!(parse::<EthicsRecord>(raw).is_parsed());
    }

    #[test]
    fn test_malformed_keeps_raw() {
        let raw = "Sure! Here is my analysis: {veto: yes}";
        let parsed = parse::<EthicsRecord>(raw);
        assert_eq!(parsed.fallback_raw(), Some(raw));
    }

    #[test]
    fn test_missing_required_field_falls_back() {
        let raw = r#"{"sections": [], "reasoning": "none"}"#;
        assert_eq!(parse::<LegalRecord>(raw).fallback_raw(), Some(raw));
    }

    #[test]
    fn test_wrong_type_falls_back() {
        let raw = r#"{"score": "eighty", "refusal_triggered": false}"#;
        assert!(!parse::<ConfidenceRecord>(raw).is_parsed());

        let raw = r#"{"risks": "many", "severity": "Low"}"#;
        assert!(!parse::<RiskRecord>(raw).is_parsed());
    }

    #[test]
    fn test_empty_output_falls_back() {
        assert_eq!(parse::<EthicsRecord>("").fallback_raw(), Some(""));
    }

    proptest! {
        #[test]
        fn prop_non_json_round_trips_as_fallback(raw in "[a-zA-Z ,.!?:]{0,80}") {
            let parsed = parse::<EthicsRecord>(&raw);
            prop_assert_eq!(parsed.fallback_raw(), Some(raw.as_str()));
        }

        #[test]
        fn prop_valid_confidence_parses(
            score in 0u8..=100,
            refusal in any::<bool>(),
            missing in prop::collection::vec("[a-z ]{1,12}", 0..4),
        ) {
            let raw = serde_json::json!({
                "score": score,
                "reasoning": "checked",
                "missing_info": missing.clone(),
                "refusal_triggered": refusal,
            })
            .to_string();

            let record = parse::<ConfidenceRecord>(&raw).into_record().unwrap();
            prop_assert_eq!(record.score, Some(score));
            prop_assert_eq!(record.refusal_triggered, Some(refusal));
            prop_assert_eq!(record.missing_info, missing);
        }
    }
}
