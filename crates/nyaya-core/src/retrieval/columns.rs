//! Which corpus column is the key and which is the searchable content.
//!
//! Production configuration names both fields explicitly. [`ColumnMapping::suggest`]
//! is a setup assist for unfamiliar datasets: it guesses from header names once,
//! at load time, and never runs per query.

use serde::{Deserialize, Serialize};

use super::corpus::CorpusKind;

/// Explicit key/content field names for one corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub key_field: String,
    pub content_field: String,
}

/// Positional column used when no header matches a content pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentFallback {
    Second,
    Last,
}

struct ColumnHints {
    key_patterns: &'static [&'static str],
    content_patterns: &'static [&'static str],
    content_fallback: ContentFallback,
}

const STATUTE_HINTS: ColumnHints = ColumnHints {
    key_patterns: &["section"],
    content_patterns: &["desc", "offense", "detail", "provision"],
    content_fallback: ContentFallback::Second,
};

const EVIDENCE_HINTS: ColumnHints = ColumnHints {
    key_patterns: &["section"],
    content_patterns: &["desc", "provision", "detail"],
    content_fallback: ContentFallback::Second,
};

const CASE_LAW_HINTS: ColumnHints = ColumnHints {
    key_patterns: &["section", "case", "pet", "diary"],
    content_patterns: &["judg", "headnote", "order", "desc", "detail"],
    content_fallback: ContentFallback::Last,
};

fn hints_for(kind: CorpusKind) -> &'static ColumnHints {
    match kind {
        CorpusKind::Statutes => &STATUTE_HINTS,
        CorpusKind::EvidenceRules => &EVIDENCE_HINTS,
        CorpusKind::CaseLaw => &CASE_LAW_HINTS,
    }
}

fn find_column<'a>(columns: &'a [String], patterns: &[&str]) -> Option<&'a String> {
    columns.iter().find(|c| {
        let lower = c.to_lowercase();
        patterns.iter().any(|p| lower.contains(p))
    })
}

impl ColumnMapping {
    pub fn new(key_field: impl Into<String>, content_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            content_field: content_field.into(),
        }
    }

    /// Guess a mapping from header names.
    ///
    /// Patterns are case-insensitive substrings. Without a match the key is the
    /// first column and the content is the second (or last, for case law).
    /// Returns `None` only when there are no columns at all.
    pub fn suggest(columns: &[String], kind: CorpusKind) -> Option<Self> {
        let first = columns.first()?;
        let hints = hints_for(kind);

        let key = find_column(columns, hints.key_patterns).unwrap_or(first);
        let content = find_column(columns, hints.content_patterns).unwrap_or_else(|| {
            match hints.content_fallback {
                ContentFallback::Second => columns.get(1).unwrap_or(first),
                ContentFallback::Last => columns.last().unwrap_or(first),
            }
        });

        Some(Self::new(key.clone(), content.clone()))
    }

    /// Check that both fields exist among `columns`.
    pub fn missing_fields(&self, columns: &[String]) -> Vec<&str> {
        [self.key_field.as_str(), self.content_field.as_str()]
            .into_iter()
            .filter(|field| !columns.iter().any(|c| c == field))
            .collect()
    }
}
