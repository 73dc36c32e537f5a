//! Language stage: normalizes the user's situation into the working language.

use async_trait::async_trait;
use nyaya_core::StageKind;

use super::generator::Generator;
use super::traits::{Stage, StageContext, StageError};
use crate::prompts::{self, LANGUAGE_ROLE};

/// The default working language; ASCII input is assumed to already be in it.
pub const DEFAULT_TARGET_LANGUAGE: &str = "English";

/// Tag for text whose language could not be established.
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// True when `text` can be used without translating it into `target`.
pub fn is_in_target_language(text: &str, target: &str) -> bool {
    target == DEFAULT_TARGET_LANGUAGE && text.is_ascii()
}

/// Translates the raw input when needed.
///
/// On an empty or failed translation the original input is passed on
/// unchanged.
pub struct LanguageStage {
    target_language: String,
}

impl LanguageStage {
    pub fn new(target_language: impl Into<String>) -> Self {
        Self {
            target_language: target_language.into(),
        }
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// True when no translation call is needed.
    pub fn is_already_target(&self, text: &str) -> bool {
        is_in_target_language(text, &self.target_language)
    }

    /// Ask for the language name of `text`; "Unknown" when generation fails.
    pub async fn detect_language(&self, generator: &Generator, text: &str) -> String {
        generator
            .generate(
                StageKind::Language,
                &prompts::detect_language_prompt(text),
                LANGUAGE_ROLE,
                self.temperature(),
            )
            .await
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string())
    }
}

impl Default for LanguageStage {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_LANGUAGE)
    }
}

#[async_trait]
impl Stage for LanguageStage {
    fn kind(&self) -> StageKind {
        StageKind::Language
    }

    fn role_instruction(&self) -> &str {
        LANGUAGE_ROLE
    }

    fn build_prompt(&self, ctx: &StageContext<'_>) -> Result<String, StageError> {
        Ok(prompts::translate_prompt(ctx.situation, &self.target_language))
    }

    async fn analyze(
        &self,
        generator: &Generator,
        ctx: &StageContext<'_>,
    ) -> Result<String, StageError> {
        if self.is_already_target(ctx.situation) {
            return Ok(ctx.situation.to_string());
        }

        let prompt = self.build_prompt(ctx)?;
        let translated = generator
            .generate(self.kind(), &prompt, self.role_instruction(), self.temperature())
            .await
            .map(|text| text.trim().to_string())
            .unwrap_or_default();

        if translated.is_empty() {
            Ok(ctx.situation.to_string())
        } else {
            Ok(translated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_already_english() {
        let stage = LanguageStage::default();
        assert!(stage.is_already_target("someone stole my bike"));
        assert!(!stage.is_already_target("मेरी साइकिल चोरी हो गई"));
    }

    #[test]
    fn test_target_language_check() {
        assert!(is_in_target_language("file an FIR", DEFAULT_TARGET_LANGUAGE));
        assert!(!is_in_target_language("file an FIR", "Hindi"));
        assert!(!is_in_target_language("चोरी", DEFAULT_TARGET_LANGUAGE));
    }

    #[test]
    fn test_heuristic_only_for_default_target() {
        let stage = LanguageStage::new("Hindi");
        assert!(!stage.is_already_target("someone stole my bike"));
    }

    #[test]
    fn test_prompt_names_target() {
        let stage = LanguageStage::new("Kannada");
        let prompt = stage.build_prompt(&StageContext::new("hello")).unwrap();
        assert!(prompt.contains("to Kannada"));
    }
}
