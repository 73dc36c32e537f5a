//! Shared fixtures: a scripted provider and coordinator helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use nyaya_core::CorpusLibrary;
use nyaya_runtime::prompts::{CONFIDENCE_ROLE, ETHICS_ROLE, LANGUAGE_ROLE, LEGAL_ROLE, RISK_ROLE};
use nyaya_runtime::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
use nyaya_runtime::{DeliberationCoordinator, RuntimeConfig};

pub const LEGAL_OUTPUT: &str =
    r#"{"sections": ["Section 378"], "reasoning": "Theft of movable property", "advice": "File an FIR at the nearest police station"}"#;
pub const RISK_OUTPUT: &str =
    r#"{"risks": ["Bike may not be recovered"], "severity": "Low", "concerns": "None serious"}"#;
pub const ETHICS_CLEAR: &str = r#"{"is_safe": true, "veto": false, "reason": ""}"#;
pub const CONFIDENCE_HIGH: &str =
    r#"{"score": 85, "reasoning": "Clear facts", "missing_info": [], "refusal_triggered": false}"#;

/// What the stub does when a given role instruction arrives.
#[derive(Clone)]
pub enum Reply {
    Text(String),
    Fail,
    /// Sleep, then answer
    Delayed(Duration, String),
}

/// One call the stub received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub role: String,
    pub prompt: String,
}

/// Provider returning canned text keyed by role instruction.
pub struct StubProvider {
    replies: HashMap<&'static str, Reply>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubProvider {
    /// Every stage answers with a benign, well-formed payload.
    pub fn benign() -> Self {
        let mut replies = HashMap::new();
        replies.insert(LANGUAGE_ROLE, Reply::Text("someone stole my bike".to_string()));
        replies.insert(LEGAL_ROLE, Reply::Text(LEGAL_OUTPUT.to_string()));
        replies.insert(RISK_ROLE, Reply::Text(RISK_OUTPUT.to_string()));
        replies.insert(ETHICS_ROLE, Reply::Text(ETHICS_CLEAR.to_string()));
        replies.insert(CONFIDENCE_ROLE, Reply::Text(CONFIDENCE_HIGH.to_string()));
        Self {
            replies,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, role: &'static str, reply: Reply) -> Self {
        self.replies.insert(role, reply);
        self
    }

    pub fn with_text(self, role: &'static str, text: &str) -> Self {
        self.with(role, Reply::Text(text.to_string()))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn roles_called(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.role.clone()).collect()
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let role = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let prompt = messages
            .iter()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.calls.lock().push(RecordedCall {
            role: role.clone(),
            prompt,
        });

        let text = match self.replies.get(role.as_str()).cloned() {
            Some(Reply::Text(text)) => text,
            Some(Reply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                text
            }
            Some(Reply::Fail) | None => {
                return Err(ProviderError::HttpError("stub failure".to_string()))
            }
        };

        Ok(CompletionResponse {
            content: text,
            usage: TokenUsage {
                prompt_tokens: 50,
                completion_tokens: 20,
            },
            model: config.model.clone(),
            stop_reason: Some("stop".to_string()),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "stub"
    }
}

pub fn coordinator(provider: Arc<StubProvider>) -> DeliberationCoordinator {
    coordinator_with(provider, RuntimeConfig::default(), Arc::new(CorpusLibrary::new()))
}

pub fn coordinator_with(
    provider: Arc<StubProvider>,
    config: RuntimeConfig,
    library: Arc<CorpusLibrary>,
) -> DeliberationCoordinator {
    DeliberationCoordinator::builder()
        .provider(provider)
        .config(config)
        .library(library)
        .build()
        .expect("coordinator builds with an explicit provider")
}
