//! # nyaya-core
//!
//! Deterministic core of the Nyaya legal triage pipeline.
//!
//! This crate holds everything in the pipeline that does not talk to a
//! language model:
//! - **Retrieval**: TF-IDF indexes over statute, evidence-rule and case-law corpora
//! - **Response parsing**: schema-checked decoding of stage output with raw-text fallback
//! - **Gating**: the Ethics veto and Confidence refusal rules
//! - **Types**: stages, audit log, verdict, and the deliberation state machine
//!
//! ## Key Guarantees
//!
//! 1. **No LLM calls**: retrieval, parsing and gating are pure functions
//! 2. **Never raises on bad output**: undecodable stage text becomes a fallback value
//! 3. **Fail open**: only an explicit, parsed veto or refusal blocks a request
//! 4. **Read-only indexes**: built once, safe to share across concurrent runs
//!
//! ## Example
//!
//! ```rust,ignore
//! use nyaya_core::{CorpusKind, CorpusLibrary, CorpusSpec, ethics_gate, parse};
//!
//! let library = CorpusLibrary::load(&[CorpusSpec::new(CorpusKind::Statutes, "data/ipc.csv")]);
//! if let Some(index) = library.index(CorpusKind::Statutes) {
//!     for hit in index.search("someone stole my bike", 5) {
//!         println!("{}: {:.2}", hit.document.key, hit.score);
//!     }
//! }
//!
//! let gate = ethics_gate(&parse(r#"{"veto": true, "reason": "Violence"}"#));
//! assert!(gate.is_triggered());
//! ```

pub mod gating;
pub mod response;
pub mod retrieval;
pub mod types;

// Re-export main types at crate root
pub use gating::{
    confidence_gate, ethics_gate, GateResult, CONFIDENCE_THRESHOLD, DEFAULT_VETO_REASON,
    LOW_CONFIDENCE_REASON,
};
pub use response::{
    parse, ConfidenceRecord, EthicsRecord, LegalRecord, ParsedOutput, RiskRecord, Severity,
    StageRecord,
};
pub use retrieval::{
    ColumnMapping, Corpus, CorpusDocument, CorpusError, CorpusKind, CorpusLibrary, CorpusSpec,
    IndexBuildError, SearchResult, TextIndex, DEFAULT_TOP_K, RELEVANCE_THRESHOLD,
};
pub use types::{AuditEntry, AuditLog, DeliberationState, Query, StageKind, Verdict};
