//! Structured stage output.
//!
//! Stages answer with JSON described by `schemas/*.schema.json`. This module
//! validates and decodes that JSON into typed records, falling back to the raw
//! text whenever decoding fails. The Language stage answers in plain text and
//! has no record.

mod parser;
mod records;
mod schema;

pub use parser::{parse, ParsedOutput};
pub use records::{ConfidenceRecord, EthicsRecord, LegalRecord, RiskRecord, Severity, StageRecord};
pub use schema::{schema_source, validate_stage_output, SchemaError};
