//! Runtime configuration.
//!
//! Loaded from YAML; every field has a default so an empty document is a
//! valid configuration. Durations are written the human way (`"15s"`, `"2m"`).
//!
//! ```yaml
//! provider:
//!   type: groq
//!   model: llama-3.3-70b-versatile
//!   request_timeout: 30s
//!   settings:
//!     max_retries: 2
//! stages:
//!   default_timeout: 45s
//!   overrides:
//!     language: 15s
//! run_timeout: 3m
//! corpora:
//!   - kind: statutes
//!     path: data/ipc_sections.csv
//!     key_field: Section
//!     content_field: Description
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use nyaya_core::{CorpusSpec, StageKind};

use crate::providers::CompletionConfig;
use crate::resilience::CircuitBreakerConfig;

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Serde adapter for humantime duration strings.
pub(crate) mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for maps of humantime duration strings.
mod duration_map {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;
    use std::time::Duration;

    use nyaya_core::StageKind;

    pub fn serialize<S: Serializer>(
        value: &BTreeMap<StageKind, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .iter()
            .map(|(k, v)| (*k, humantime::format_duration(*v).to_string()))
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<StageKind, Duration>, D::Error> {
        BTreeMap::<StageKind, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(k, v)| {
                humantime::parse_duration(&v)
                    .map(|d| (k, d))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub provider: ProviderConfig,
    pub stages: StageConfig,

    /// Upper bound on a whole deliberation run
    #[serde(with = "duration_str")]
    pub run_timeout: Duration,

    /// Language the Legal/Risk/Ethics/Confidence stages work in
    pub target_language: String,

    pub circuit_breaker: CircuitBreakerConfig,
    pub budgets: BudgetConfig,
    pub cache: CacheConfig,
    pub corpora: Vec<CorpusSpec>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            stages: StageConfig::default(),
            run_timeout: Duration::from_secs(180),
            target_language: "English".to_string(),
            circuit_breaker: CircuitBreakerConfig::default(),
            budgets: BudgetConfig::default(),
            cache: CacheConfig::default(),
            corpora: Vec::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Timeout for one generation call made by `stage`.
    pub fn stage_timeout(&self, stage: StageKind) -> Duration {
        self.stages
            .overrides
            .get(&stage)
            .copied()
            .unwrap_or(self.stages.default_timeout)
    }

    /// Completion settings for a call made by `stage`.
    pub fn completion_config(&self, stage: StageKind, temperature: f32) -> CompletionConfig {
        CompletionConfig {
            model: self.provider.model.clone(),
            max_tokens: self.provider.max_tokens,
            temperature,
            timeout: self.provider.request_timeout.min(self.stage_timeout(stage)),
        }
    }
}

/// Which provider to build and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Registry key, e.g. "groq"
    #[serde(rename = "type")]
    pub provider_type: String,
    pub model: String,
    pub max_tokens: u32,

    #[serde(with = "duration_str")]
    pub request_timeout: Duration,

    /// Provider-specific settings (`api_key`, `base_url`, `max_retries`)
    pub settings: JsonValue,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let completion = CompletionConfig::default();
        Self {
            provider_type: "groq".to_string(),
            model: completion.model,
            max_tokens: completion.max_tokens,
            request_timeout: completion.timeout,
            settings: JsonValue::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    #[serde(with = "duration_str")]
    pub default_timeout: Duration,

    #[serde(with = "duration_map")]
    pub overrides: BTreeMap<StageKind, Duration>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(45),
            overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub run_max_tokens: u32,
    pub stage_max_tokens: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            run_max_tokens: 20_000,
            stage_max_tokens: 6_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: u64,

    #[serde(with = "duration_str")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: 1_000,
            ttl: Duration::from_secs(3600),
        }
    }
}
