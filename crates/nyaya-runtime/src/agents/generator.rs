//! The single gate every stage goes through to reach the provider.
//!
//! A `Generator` lives for one run. It applies the per-stage timeout, the
//! shared circuit breaker, and the run's token budget, and records usage.
//! Every failure is logged here at `warn` and returned as a
//! [`GenerationError`] that stages turn into their placeholder output.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use nyaya_core::StageKind;

use crate::config::RuntimeConfig;
use crate::providers::{ChatMessage, LlmProvider, ProviderError};
use crate::resilience::{BudgetTracker, CircuitBreaker, LlmUsage};

/// Why a generation call produced no text.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("circuit open for {0} stage")]
    CircuitOpen(StageKind),

    #[error("token budget exhausted for {0} stage")]
    BudgetExceeded(StageKind),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("empty completion")]
    Empty,
}

pub struct Generator {
    provider: Arc<dyn LlmProvider>,
    breaker: Arc<CircuitBreaker>,
    budget: BudgetTracker,
    config: Arc<RuntimeConfig>,
}

impl Generator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        breaker: Arc<CircuitBreaker>,
        config: Arc<RuntimeConfig>,
    ) -> Self {
        let budget = BudgetTracker::new(
            config.budgets.run_max_tokens,
            config.budgets.stage_max_tokens,
        );
        Self {
            provider,
            breaker,
            budget,
            config,
        }
    }

    /// `generate(prompt, role_instruction, temperature)` on behalf of `stage`.
    pub async fn generate(
        &self,
        stage: StageKind,
        prompt: &str,
        role_instruction: &str,
        temperature: f32,
    ) -> Result<String, GenerationError> {
        if self.breaker.is_open(stage) {
            warn!(stage = %stage, "Circuit open, skipping generation");
            self.budget.record_skip();
            return Err(GenerationError::CircuitOpen(stage));
        }

        let estimated = self.provider.estimate_tokens(role_instruction)
            + self.provider.estimate_tokens(prompt);
        if !self.budget.can_afford(stage, estimated) {
            warn!(
                stage = %stage,
                estimated,
                remaining = self.budget.remaining_run(),
                "Token budget exhausted, skipping generation"
            );
            self.budget.record_skip();
            return Err(GenerationError::BudgetExceeded(stage));
        }

        let completion = self.config.completion_config(stage, temperature);
        let timeout = self.config.stage_timeout(stage);
        let messages = vec![
            ChatMessage::system(role_instruction),
            ChatMessage::user(prompt),
        ];

        let result = match tokio::time::timeout(timeout, self.provider.complete(messages, &completion)).await {
            Err(_) => Err(GenerationError::Timeout(timeout)),
            Ok(Err(e)) => Err(GenerationError::Provider(e)),
            Ok(Ok(response)) if response.content.trim().is_empty() => Err(GenerationError::Empty),
            Ok(Ok(response)) => {
                self.budget.record_usage(stage, &response.usage);
                Ok(response.content)
            }
        };

        match &result {
            Ok(_) => self.breaker.record_success(stage),
            Err(e) => {
                warn!(stage = %stage, provider = self.provider.name(), error = %e, "Generation failed");
                self.breaker.record_failure(stage);
                self.budget.record_failure();
            }
        }
        result
    }

    /// Usage accumulated by this run so far.
    pub fn usage(&self) -> LlmUsage {
        self.budget.usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CompletionConfig, CompletionResponse, TokenUsage};
    use crate::resilience::CircuitBreakerConfig;
    use async_trait::async_trait;

    struct FixedProvider {
        reply: Option<&'static str>,
        delay: Duration,
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            tokio::time::sleep(self.delay).await;
            match self.reply {
                Some(text) => Ok(CompletionResponse {
                    content: text.to_string(),
                    usage: TokenUsage {
                        prompt_tokens: 20,
                        completion_tokens: 10,
                    },
                    model: config.model.clone(),
                    stop_reason: Some("stop".to_string()),
                }),
                None => Err(ProviderError::HttpError("connection refused".to_string())),
            }
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn generator(reply: Option<&'static str>, delay: Duration, config: RuntimeConfig) -> Generator {
        let breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.clone()));
        Generator::new(
            Arc::new(FixedProvider { reply, delay }),
            breaker,
            Arc::new(config),
        )
    }

    #[tokio::test]
    async fn test_success_records_usage() {
        let gen = generator(Some("{\"advice\": \"x\"}"), Duration::ZERO, RuntimeConfig::default());
        let text = gen.generate(StageKind::Legal, "p", "r", 0.0).await.unwrap();
        assert_eq!(text, "{\"advice\": \"x\"}");
        assert_eq!(gen.usage().total_tokens, 30);
        assert_eq!(gen.usage().llm_calls, 1);
    }

    #[tokio::test]
    async fn test_provider_failure_is_returned() {
        let gen = generator(None, Duration::ZERO, RuntimeConfig::default());
        let err = gen.generate(StageKind::Risk, "p", "r", 0.0).await.unwrap_err();
        assert!(matches!(err, GenerationError::Provider(_)));
        assert_eq!(gen.usage().failed_calls, 1);
    }

    #[tokio::test]
    async fn test_whitespace_completion_is_empty() {
        let gen = generator(Some("  \n"), Duration::ZERO, RuntimeConfig::default());
        let err = gen.generate(StageKind::Ethics, "p", "r", 0.0).await.unwrap_err();
        assert!(matches!(err, GenerationError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_timeout() {
        let mut config = RuntimeConfig::default();
        config.stages.default_timeout = Duration::from_secs(1);
        let gen = generator(Some("late"), Duration::from_secs(5), config);

        let err = gen.generate(StageKind::Legal, "p", "r", 0.0).await.unwrap_err();
        assert!(matches!(err, GenerationError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_open_circuit_skips_provider() {
        let mut config = RuntimeConfig::default();
        config.circuit_breaker = CircuitBreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        };
        let gen = generator(None, Duration::ZERO, config);

        let _ = gen.generate(StageKind::Confidence, "p", "r", 0.0).await;
        let err = gen.generate(StageKind::Confidence, "p", "r", 0.0).await.unwrap_err();
        assert!(matches!(err, GenerationError::CircuitOpen(StageKind::Confidence)));
        assert_eq!(gen.usage().skipped_calls, 1);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_skips_provider() {
        let mut config = RuntimeConfig::default();
        config.budgets.stage_max_tokens = 2;
        let gen = generator(Some("ok"), Duration::ZERO, config);

        let err = gen
            .generate(StageKind::Legal, &"word ".repeat(50), "r", 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::BudgetExceeded(StageKind::Legal)));
    }
}
