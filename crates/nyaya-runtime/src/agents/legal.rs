//! Legal stage: retrieval-grounded legal analysis.

use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

use nyaya_core::{CorpusLibrary, StageKind, DEFAULT_TOP_K};

use super::traits::{Stage, StageContext, StageError};
use crate::prompts::{self, LEGAL_ROLE};

/// Longest excerpt of a matched record placed in the prompt, in characters.
pub const EXCERPT_CHARS: usize = 200;

/// Searches every available corpus with the situation and asks for the
/// applicable sections, reasoning and advice.
pub struct LegalStage {
    library: Arc<CorpusLibrary>,
    top_k: usize,
}

impl LegalStage {
    pub fn new(library: Arc<CorpusLibrary>) -> Self {
        Self {
            library,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Matches grouped by corpus as `- key: excerpt` lines.
    ///
    /// Corpora that are unavailable or have no match contribute nothing.
    pub fn context_block(&self, situation: &str) -> String {
        let mut block = String::new();
        for (kind, results) in self.library.search_all(situation, self.top_k) {
            if !block.is_empty() {
                block.push('\n');
            }
            let _ = writeln!(block, "{}", kind.heading());
            for hit in results {
                let _ = writeln!(block, "- {}: {}", hit.document.key, excerpt(&hit.document.content));
            }
        }
        block
    }
}

fn excerpt(content: &str) -> String {
    let content = content.trim();
    if content.chars().count() <= EXCERPT_CHARS {
        return content.to_string();
    }
    let mut cut: String = content.chars().take(EXCERPT_CHARS).collect();
    cut.push_str("...");
    cut
}

#[async_trait]
impl Stage for LegalStage {
    fn kind(&self) -> StageKind {
        StageKind::Legal
    }

    fn role_instruction(&self) -> &str {
        LEGAL_ROLE
    }

    fn build_prompt(&self, ctx: &StageContext<'_>) -> Result<String, StageError> {
        let context = self.context_block(ctx.situation);
        tracing::debug!(stage = %self.kind(), context_chars = context.len(), "Built retrieval context");
        Ok(prompts::legal_prompt(ctx.situation, &context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyaya_core::retrieval::Row;
    use nyaya_core::{ColumnMapping, Corpus, CorpusKind, TextIndex};

    fn row(section: &str, description: &str) -> Row {
        Row::from([
            ("Section".to_string(), section.to_string()),
            ("Description".to_string(), description.to_string()),
        ])
    }

    fn library() -> Arc<CorpusLibrary> {
        let corpus = Corpus::from_rows(
            vec!["Section".to_string(), "Description".to_string()],
            vec![
                row("378", "Theft of movable property such as a bike"),
                row("302", "Punishment for murder"),
                row("420", "Cheating and dishonestly inducing delivery of property"),
            ],
        )
        .unwrap();
        let index = TextIndex::build(&corpus, &ColumnMapping::new("Section", "Description")).unwrap();
        let mut library = CorpusLibrary::new();
        library.insert(CorpusKind::Statutes, index);
        Arc::new(library)
    }

    #[test]
    fn test_context_block_groups_by_corpus() {
        let stage = LegalStage::new(library());
        let block = stage.context_block("someone committed theft of my bike");

        assert!(block.starts_with("Relevant Statute Sections:\n"));
        assert!(block.contains("- 378: Theft of movable property such as a bike"));
        assert!(!block.contains("Relevant Case Precedents:"));
    }

    #[test]
    fn test_empty_library_gives_empty_context() {
        let stage = LegalStage::new(Arc::new(CorpusLibrary::new()));
        assert!(stage.context_block("someone stole my bike").is_empty());

        let prompt = stage.build_prompt(&StageContext::new("someone stole my bike")).unwrap();
        assert!(prompt.contains(prompts::EMPTY_CONTEXT));
    }

    #[test]
    fn test_excerpt_truncates_long_content() {
        let long = "a".repeat(500);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }
}
