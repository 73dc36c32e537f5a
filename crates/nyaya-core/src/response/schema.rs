//! JSON Schema validation for stage outputs.
//!
//! Schemas live in `schemas/*.schema.json` at the repository root and are
//! embedded at compile time. Each is compiled once on first use.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

use crate::types::StageKind;

const LEGAL_SCHEMA_JSON: &str = include_str!("../../../../schemas/legal.schema.json");
const RISK_SCHEMA_JSON: &str = include_str!("../../../../schemas/risk.schema.json");
const ETHICS_SCHEMA_JSON: &str = include_str!("../../../../schemas/ethics.schema.json");
const CONFIDENCE_SCHEMA_JSON: &str = include_str!("../../../../schemas/confidence.schema.json");

type CompiledSchemas = BTreeMap<StageKind, Result<jsonschema::Validator, String>>;

static COMPILED_SCHEMAS: OnceLock<CompiledSchemas> = OnceLock::new();

/// Errors from schema lookup.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),

    #[error("Stage {0} has plain-text output and no schema")]
    NoSchema(StageKind),
}

/// Raw schema text for a stage. Language output is plain text.
pub fn schema_source(stage: StageKind) -> Option<&'static str> {
    match stage {
        StageKind::Legal => Some(LEGAL_SCHEMA_JSON),
        StageKind::Risk => Some(RISK_SCHEMA_JSON),
        StageKind::Ethics => Some(ETHICS_SCHEMA_JSON),
        StageKind::Confidence => Some(CONFIDENCE_SCHEMA_JSON),
        StageKind::Language => None,
    }
}

fn compile(source: &str) -> Result<jsonschema::Validator, String> {
    let schema_value: serde_json::Value =
        serde_json::from_str(source).map_err(|e| format!("Invalid schema JSON: {}", e))?;
    jsonschema::options()
        .build(&schema_value)
        .map_err(|e| format!("Failed to compile schema: {}", e))
}

fn get_validator(stage: StageKind) -> Result<&'static jsonschema::Validator, SchemaError> {
    let compiled = COMPILED_SCHEMAS.get_or_init(|| {
        StageKind::PIPELINE
            .iter()
            .filter_map(|kind| schema_source(*kind).map(|src| (*kind, compile(src))))
            .collect()
    });

    match compiled.get(&stage) {
        Some(Ok(v)) => Ok(v),
        Some(Err(e)) => Err(SchemaError::LoadError(e.clone())),
        None => Err(SchemaError::NoSchema(stage)),
    }
}

/// Validate a decoded stage payload against that stage's schema.
///
/// Returns every violation as `"<message> at <path>"`.
pub fn validate_stage_output(stage: StageKind, value: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator(stage).map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
