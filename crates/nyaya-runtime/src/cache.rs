//! Completion caching for nyaya-runtime.
//!
//! Stages run at temperature 0.0, so an identical prompt to the same model
//! yields an identical answer. [`CachedProvider`] wraps any provider and
//! serves repeats from an in-memory cache instead of paying for them again.

use async_trait::async_trait;
use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

/// Cache key for a completion request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    messages_hash: u64,
    model: String,
    temperature_bits: u32,
}

impl CacheKey {
    pub fn new(messages: &[ChatMessage], config: &CompletionConfig) -> Self {
        let mut hasher = DefaultHasher::new();
        messages.hash(&mut hasher);
        Self {
            messages_hash: hasher.finish(),
            model: config.model.clone(),
            temperature_bits: config.temperature.to_bits(),
        }
    }
}

/// Completion cache using moka.
pub struct CompletionCache {
    cache: Cache<CacheKey, String>,
}

impl CompletionCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, content: String) {
        self.cache.insert(key, content).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for CompletionCache {
    fn default() -> Self {
        Self::new(1_000, Duration::from_secs(3600))
    }
}

/// A provider that answers repeated requests from a [`CompletionCache`].
///
/// Only non-empty completions are cached. A cache hit reports zero token
/// usage, so budgets are not charged twice.
pub struct CachedProvider {
    inner: Arc<dyn LlmProvider>,
    cache: CompletionCache,
}

impl CachedProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, cache: CompletionCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &CompletionCache {
        &self.cache
    }
}

#[async_trait]
impl LlmProvider for CachedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let key = CacheKey::new(&messages, config);
        if let Some(content) = self.cache.get(&key).await {
            tracing::debug!(provider = self.inner.name(), "Completion served from cache");
            return Ok(CompletionResponse {
                content,
                usage: TokenUsage::default(),
                model: config.model.clone(),
                stop_reason: Some("cached".to_string()),
            });
        }

        let response = self.inner.complete(messages, config).await?;
        if !response.content.trim().is_empty() {
            self.cache.insert(key, response.content.clone()).await;
        }
        Ok(response)
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn estimate_tokens(&self, text: &str) -> u32 {
        self.inner.estimate_tokens(text)
    }
}
