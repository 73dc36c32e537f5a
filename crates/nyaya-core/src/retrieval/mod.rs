//! Lexical retrieval over tabular legal corpora.
//!
//! Each corpus (statute sections, evidentiary rules, case law) is loaded once,
//! mapped to a key and a content column, and fitted into its own
//! [`TextIndex`]. Indexes are read-only after build.

mod columns;
mod corpus;
mod index;
mod library;
mod tokenize;

pub use columns::ColumnMapping;
pub use corpus::{Corpus, CorpusError, CorpusKind, Row};
pub use index::{
    CorpusDocument, IndexBuildError, SearchResult, TextIndex, DEFAULT_TOP_K, MAX_VOCABULARY,
    RELEVANCE_THRESHOLD,
};
pub use library::{CorpusLibrary, CorpusSpec};
pub use tokenize::{is_stop_word, tokenize};
