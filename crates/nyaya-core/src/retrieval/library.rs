//! The set of corpus indexes the legal stage consults.
//!
//! Loading never fails as a whole: a corpus that is absent, malformed, or
//! unmappable is logged once here and simply has no index.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::columns::ColumnMapping;
use super::corpus::{Corpus, CorpusKind};
use super::index::{IndexBuildError, SearchResult, TextIndex};

/// Where a corpus lives and which columns to index.
///
/// Leaving a field unset falls back to [`ColumnMapping::suggest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSpec {
    pub kind: CorpusKind,
    pub path: PathBuf,
    #[serde(default)]
    pub key_field: Option<String>,
    #[serde(default)]
    pub content_field: Option<String>,
}

impl CorpusSpec {
    pub fn new(kind: CorpusKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            key_field: None,
            content_field: None,
        }
    }

    pub fn with_mapping(mut self, mapping: ColumnMapping) -> Self {
        self.key_field = Some(mapping.key_field);
        self.content_field = Some(mapping.content_field);
        self
    }

    /// Explicit fields win; whatever is missing is guessed from the headers.
    pub fn resolve_mapping(&self, corpus: &Corpus) -> Option<ColumnMapping> {
        if let (Some(key), Some(content)) = (&self.key_field, &self.content_field) {
            return Some(ColumnMapping::new(key.clone(), content.clone()));
        }
        let suggested = ColumnMapping::suggest(corpus.columns(), self.kind)?;
        Some(ColumnMapping::new(
            self.key_field.clone().unwrap_or(suggested.key_field),
            self.content_field.clone().unwrap_or(suggested.content_field),
        ))
    }

    /// Load the corpus and fit its index.
    pub fn build(&self) -> Result<TextIndex, IndexBuildError> {
        let corpus = Corpus::load(&self.path)?;
        let mapping = self
            .resolve_mapping(&corpus)
            .ok_or_else(|| IndexBuildError::MissingColumns(vec!["<any>".to_string()]))?;
        TextIndex::build(&corpus, &mapping)
    }
}

/// Read-only indexes keyed by corpus kind.
#[derive(Debug, Clone, Default)]
pub struct CorpusLibrary {
    indexes: BTreeMap<CorpusKind, Arc<TextIndex>>,
}

impl CorpusLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every index it can. Failures are logged and skipped.
    pub fn load(specs: &[CorpusSpec]) -> Self {
        let mut library = Self::new();
        for spec in specs {
            match spec.build() {
                Ok(index) => {
                    info!(
                        corpus = %spec.kind,
                        path = %spec.path.display(),
                        rows = index.len(),
                        vocabulary = index.vocabulary_size(),
                        key_field = %index.mapping().key_field,
                        content_field = %index.mapping().content_field,
                        "Corpus index built"
                    );
                    library.insert(spec.kind, index);
                }
                Err(e) => {
                    warn!(
                        corpus = %spec.kind,
                        path = %spec.path.display(),
                        error = %e,
                        "Corpus index unavailable"
                    );
                }
            }
        }
        library
    }

    /// Add or replace an index. Replacement swaps the whole instance.
    pub fn insert(&mut self, kind: CorpusKind, index: TextIndex) {
        self.indexes.insert(kind, Arc::new(index));
    }

    pub fn index(&self, kind: CorpusKind) -> Option<&TextIndex> {
        self.indexes.get(&kind).map(Arc::as_ref)
    }

    pub fn available(&self) -> Vec<CorpusKind> {
        self.indexes.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Search every available index, in [`CorpusKind::ALL`] order.
    ///
    /// Corpora without an index, or without a match, are left out.
    pub fn search_all(&self, query: &str, k: usize) -> Vec<(CorpusKind, Vec<SearchResult>)> {
        CorpusKind::ALL
            .iter()
            .filter_map(|kind| {
                let results = self.index(*kind)?.search(query, k);
                (!results.is_empty()).then_some((*kind, results))
            })
            .collect()
    }
}
