//! TF-IDF text index with cosine-similarity search.
//!
//! Weights follow the classic smoothed formulation:
//! `idf(t) = ln((1 + n) / (1 + df(t))) + 1`, raw term counts for `tf`, and
//! every vector L2-normalized so cosine similarity is a plain dot product.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use super::columns::ColumnMapping;
use super::corpus::{Corpus, CorpusError, Row};
use super::tokenize::tokenize;

/// Results scoring below this are never returned.
pub const RELEVANCE_THRESHOLD: f64 = 0.1;

/// Default number of results per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Vocabulary cap, keeping the terms with the highest document frequency.
pub const MAX_VOCABULARY: usize = 5000;

/// Errors that leave an index unavailable.
#[derive(Error, Debug)]
pub enum IndexBuildError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error("Corpus has no column(s): {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Content field '{0}' contains no usable text")]
    EmptyVocabulary(String),
}

/// One retrievable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    /// Position in the source corpus.
    pub row: usize,
    pub key: String,
    pub content: String,
    /// Every column of the row, including key and content.
    pub fields: Row,
}

/// A document with its similarity to the query, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: CorpusDocument,
    pub score: f64,
}

/// Sparse vector: `(term id, weight)` sorted by term id.
type SparseVector = Vec<(usize, f64)>;

/// A fitted TF-IDF index over one corpus.
///
/// Immutable once built; share it behind an `Arc` for concurrent reads.
#[derive(Debug, Clone)]
pub struct TextIndex {
    mapping: ColumnMapping,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<SparseVector>,
    documents: Vec<CorpusDocument>,
}

impl TextIndex {
    /// Fit the index over `mapping.content_field`.
    ///
    /// Either every row is vectorized or the build fails; there is no
    /// partial index. Empty cells become empty vectors that never match.
    pub fn build(corpus: &Corpus, mapping: &ColumnMapping) -> Result<Self, IndexBuildError> {
        let missing = mapping.missing_fields(corpus.columns());
        if !missing.is_empty() {
            return Err(IndexBuildError::MissingColumns(
                missing.into_iter().map(str::to_string).collect(),
            ));
        }

        let documents: Vec<CorpusDocument> = corpus
            .rows()
            .iter()
            .enumerate()
            .map(|(row, fields)| CorpusDocument {
                row,
                key: cell(fields, &mapping.key_field),
                content: cell(fields, &mapping.content_field),
                fields: fields.clone(),
            })
            .collect();

        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(&d.content)).collect();

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for terms in &tokenized {
            let mut seen: Vec<&str> = terms.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(IndexBuildError::EmptyVocabulary(mapping.content_field.clone()));
        }

        // Highest document frequency first, alphabetical among equals.
        let mut ranked: Vec<(&str, usize)> = document_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(MAX_VOCABULARY);

        let n_docs = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(ranked.len());
        let mut idf = Vec::with_capacity(ranked.len());
        for (id, (term, df)) in ranked.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), id);
            idf.push(((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0);
        }

        let vectors = tokenized
            .iter()
            .map(|terms| weigh(terms, &vocabulary, &idf))
            .collect();

        Ok(Self {
            mapping: mapping.clone(),
            vocabulary,
            idf,
            vectors,
            documents,
        })
    }

    /// Top-`k` documents by cosine similarity, each scoring at least
    /// [`RELEVANCE_THRESHOLD`].
    ///
    /// Ordered by descending score, ties in corpus row order. Returns fewer
    /// than `k` results rather than padding with weak matches.
    pub fn search(&self, query: &str, k: usize) -> Vec<SearchResult> {
        if k == 0 {
            return Vec::new();
        }

        let query_vector: HashMap<usize, f64> =
            weigh(&tokenize(query), &self.vocabulary, &self.idf)
                .into_iter()
                .collect();
        if query_vector.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row, vector)| {
                let dot: f64 = vector
                    .iter()
                    .filter_map(|(term, weight)| query_vector.get(term).map(|q| q * weight))
                    .sum();
                (row, dot.min(1.0))
            })
            .filter(|(_, score)| *score >= RELEVANCE_THRESHOLD)
            .collect();

        // Stable sort keeps row order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(row, score)| SearchResult {
                document: self.documents[row].clone(),
                score,
            })
            .collect()
    }

    /// Number of indexed documents; always the corpus row count.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }
}

fn cell(fields: &Row, column: &str) -> String {
    fields.get(column).cloned().unwrap_or_default()
}

/// Raw counts times idf, L2-normalized. Out-of-vocabulary terms are ignored.
fn weigh(terms: &[String], vocabulary: &HashMap<String, usize>, idf: &[f64]) -> SparseVector {
    let mut counts: HashMap<usize, f64> = HashMap::new();
    for term in terms {
        if let Some(&id) = vocabulary.get(term) {
            *counts.entry(id).or_insert(0.0) += 1.0;
        }
    }

    let mut vector: SparseVector = counts
        .into_iter()
        .map(|(id, count)| (id, count * idf[id]))
        .collect();
    vector.sort_unstable_by_key(|(id, _)| *id);

    let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, weight) in vector.iter_mut() {
            *weight /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn statutes() -> Corpus {
        let csv = "Section,Description\n\
                   378,Theft: dishonestly taking movable property out of possession\n\
                   379,Punishment for theft of movable property\n\
                   302,Punishment for murder\n\
                   420,Cheating and dishonestly inducing delivery of property\n\
                   499,Defamation by words spoken or written\n";
        Corpus::from_csv_reader(csv.as_bytes()).unwrap()
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping::new("Section", "Description")
    }

    #[test]
    fn test_index_size_matches_corpus() {
        let index = TextIndex::build(&statutes(), &mapping()).unwrap();
        assert_eq!(index.len(), 5);
        assert!(index.vocabulary_size() > 0);
    }

    #[test]
    fn test_theft_query_ranks_theft_sections() {
        let index = TextIndex::build(&statutes(), &mapping()).unwrap();
        let results = index.search("someone committed theft of my property", DEFAULT_TOP_K);

        assert!(!results.is_empty());
        let keys: Vec<_> = results.iter().map(|r| r.document.key.as_str()).collect();
        assert!(keys[..2].contains(&"378"));
        assert!(keys[..2].contains(&"379"));
        assert!(!keys.contains(&"499"));
    }

    #[test]
    fn test_unknown_terms_return_nothing() {
        let index = TextIndex::build(&statutes(), &mapping()).unwrap();
        assert!(index.search("zebra xylophone", 5).is_empty());
        assert!(index.search("", 5).is_empty());
    }

    #[test]
    fn test_k_limits_results() {
        let index = TextIndex::build(&statutes(), &mapping()).unwrap();
        assert_eq!(index.search("punishment property theft", 1).len(), 1);
        assert!(index.search("punishment property theft", 0).is_empty());
    }

    #[test]
    fn test_ties_keep_row_order() {
        let csv = "id,text\na,stolen bicycle\nb,stolen bicycle\nc,stolen bicycle\n";
        let corpus = Corpus::from_csv_reader(csv.as_bytes()).unwrap();
        let index = TextIndex::build(&corpus, &ColumnMapping::new("id", "text")).unwrap();

        let keys: Vec<_> = index
            .search("bicycle", 5)
            .into_iter()
            .map(|r| r.document.key)
            .collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn test_identical_text_scores_one() {
        let index = TextIndex::build(&statutes(), &mapping()).unwrap();
        let results = index.search("Punishment for murder", 1);
        assert_eq!(results[0].document.key, "302");
        assert!((results[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_column_fails() {
        let err = TextIndex::build(&statutes(), &ColumnMapping::new("Section", "Text")).unwrap_err();
        assert!(matches!(err, IndexBuildError::MissingColumns(cols) if cols == ["Text"]));
    }

    #[test]
    fn test_stop_words_only_fails() {
        let csv = "id,text\n1,the and of\n2,\n";
        let corpus = Corpus::from_csv_reader(csv.as_bytes()).unwrap();
        let err = TextIndex::build(&corpus, &ColumnMapping::new("id", "text")).unwrap_err();
        assert!(matches!(err, IndexBuildError::EmptyVocabulary(_)));
    }

    #[test]
    fn test_empty_rows_are_indexed_but_never_match() {
        let csv = "id,text\n1,house trespass\n2,\n";
        let corpus = Corpus::from_csv_reader(csv.as_bytes()).unwrap();
        let index = TextIndex::build(&corpus, &ColumnMapping::new("id", "text")).unwrap();
        assert_eq!(index.len(), 2);
        let results = index.search("trespass", 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.row, 0);
    }

    const WORDS: &[&str] = &[
        "theft", "murder", "property", "cheating", "assault", "bail", "evidence", "witness",
        "land", "tenant", "dowry", "cruelty", "contract", "fraud", "court",
    ];

    fn sentence() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(WORDS), 0..8).prop_map(|w| w.join(" "))
    }

    proptest! {
        #[test]
        fn prop_search_respects_k_threshold_and_order(
            docs in prop::collection::vec(sentence(), 1..20),
            query in sentence(),
            k in 0usize..8,
        ) {
            let rows = docs
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    Row::from([("id".to_string(), i.to_string()), ("text".to_string(), text.clone())])
                })
                .collect();
            let corpus = Corpus::from_rows(vec!["id".to_string(), "text".to_string()], rows).unwrap();

            let Ok(index) = TextIndex::build(&corpus, &ColumnMapping::new("id", "text")) else {
                return Ok(());
            };
            prop_assert_eq!(index.len(), docs.len());

            let results = index.search(&query, k);
            prop_assert!(results.len() <= k);
            for pair in results.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert!(pair[0].document.row < pair[1].document.row);
                }
            }
            for result in &results {
                prop_assert!(result.score >= RELEVANCE_THRESHOLD);
                prop_assert!(result.score <= 1.0);
            }
        }
    }
}
