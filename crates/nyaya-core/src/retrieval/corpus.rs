//! Tabular corpus loading from CSV or JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading a corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Corpus not found: {0}")]
    Absent(PathBuf),

    #[error("Failed to read corpus file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Malformed corpus: {0}")]
    Malformed(String),
}

impl CorpusError {
    /// True when the file simply does not exist.
    pub fn is_absent(&self) -> bool {
        matches!(self, CorpusError::Absent(_))
    }
}

/// Which legal collection a corpus holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorpusKind {
    /// Penal statute sections.
    Statutes,
    /// Evidence-act sections.
    EvidenceRules,
    /// Judgments and headnotes.
    CaseLaw,
}

impl CorpusKind {
    pub const ALL: [CorpusKind; 3] = [
        CorpusKind::Statutes,
        CorpusKind::EvidenceRules,
        CorpusKind::CaseLaw,
    ];

    /// Heading used for this corpus in the legal context block.
    pub fn heading(&self) -> &'static str {
        match self {
            CorpusKind::Statutes => "Relevant Statute Sections:",
            CorpusKind::EvidenceRules => "Relevant Evidentiary Rules:",
            CorpusKind::CaseLaw => "Relevant Case Precedents:",
        }
    }
}

impl fmt::Display for CorpusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CorpusKind::Statutes => "statutes",
            CorpusKind::EvidenceRules => "evidence-rules",
            CorpusKind::CaseLaw => "case-law",
        };
        f.write_str(name)
    }
}

/// One row of a corpus, keyed by column name.
pub type Row = BTreeMap<String, String>;

/// A loaded tabular corpus. Column order and row order are preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    source: Option<PathBuf>,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Corpus {
    /// Load a corpus from a `.csv` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CorpusError::Absent(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let mut corpus = match extension.as_deref() {
            Some("csv") => Self::from_csv_reader(fs::File::open(path)?)?,
            Some("json") => Self::from_json(&fs::read_to_string(path)?)?,
            other => {
                return Err(CorpusError::Malformed(format!(
                    "unsupported corpus extension: {:?}",
                    other.unwrap_or("")
                )))
            }
        };
        corpus.source = Some(path.to_path_buf());
        Ok(corpus)
    }

    /// Parse CSV with a header row.
    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self, CorpusError> {
        let mut reader = csv::ReaderBuilder::new().flexible(false).from_reader(reader);
        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
            return Err(CorpusError::Malformed("CSV has no header row".to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = columns
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            rows.push(row);
        }

        Self::from_rows(columns, rows)
    }

    /// Parse a JSON array of flat objects. Column order follows first appearance.
    pub fn from_json(json: &str) -> Result<Self, CorpusError> {
        let value: JsonValue = serde_json::from_str(json)?;
        let records = value
            .as_array()
            .ok_or_else(|| CorpusError::Malformed("JSON corpus must be an array".to_string()))?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            let object = record.as_object().ok_or_else(|| {
                CorpusError::Malformed(format!("row {} is not an object", idx))
            })?;
            let mut row = Row::new();
            for (key, value) in object {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
                row.insert(key.clone(), json_cell(value));
            }
            rows.push(row);
        }

        Self::from_rows(columns, rows)
    }

    /// Build a corpus from in-memory rows. Missing cells read as empty.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, CorpusError> {
        if columns.is_empty() {
            return Err(CorpusError::Malformed("corpus has no columns".to_string()));
        }
        Ok(Self {
            source: None,
            columns,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn json_cell(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
