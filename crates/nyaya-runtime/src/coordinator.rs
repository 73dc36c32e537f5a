//! The deliberation coordinator.
//!
//! Drives one run through the state machine
//!
//! ```text
//! START -> TRANSLATED -> LEGAL_DONE -> RISK_DONE -> ETHICS_CHECKED
//!       -> { REFUSED_ETHICS | CONFIDENCE_CHECKED -> { REFUSED_CONFIDENCE | SUCCESS } }
//! ```
//!
//! plus the absorbing ERROR state. Stages run strictly in order, each one
//! reading the raw output of the stages before it. Every stage that runs
//! leaves an audit entry, including on early refusal.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use nyaya_core::{
    confidence_gate, ethics_gate, parse, AuditLog, ConfidenceRecord, CorpusLibrary,
    DeliberationState, EthicsRecord, GateResult, Query, StageKind, Verdict,
};

use crate::agents::{
    is_in_target_language, ConfidenceStage, EthicsStage, Generator, LanguageStage, LegalStage,
    RiskStage, Stage, StageContext, StageError, UNKNOWN_LANGUAGE,
};
use crate::cache::{CachedProvider, CompletionCache};
use crate::config::RuntimeConfig;
use crate::providers::{LlmProvider, ProviderRegistry};
use crate::resilience::{CircuitBreaker, LlmUsage};
use crate::session::Session;

/// Errors that end a run in the ERROR state.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Deliberation cancelled")]
    Cancelled,

    #[error("Deliberation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Stage(#[from] StageError),
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RuntimeResult {
    pub verdict: Verdict,

    /// States visited, starting at START and ending in a terminal state
    pub trace: Vec<DeliberationState>,

    /// The situation after the Language stage, if it ran
    pub query: Option<Query>,

    pub ethics_gate: Option<GateResult>,
    pub confidence_gate: Option<GateResult>,
    pub llm_usage: LlmUsage,
    pub elapsed: Duration,
}

impl RuntimeResult {
    pub fn final_state(&self) -> DeliberationState {
        self.trace.last().copied().unwrap_or(DeliberationState::Start)
    }
}

/// Mutable bookkeeping for one run.
struct RunState {
    state: DeliberationState,
    trace: Vec<DeliberationState>,
    log: AuditLog,
    query: Option<Query>,
    ethics_gate: Option<GateResult>,
    confidence_gate: Option<GateResult>,
}

impl RunState {
    fn new() -> Self {
        Self {
            state: DeliberationState::Start,
            trace: vec![DeliberationState::Start],
            log: AuditLog::new(),
            query: None,
            ethics_gate: None,
            confidence_gate: None,
        }
    }

    fn advance(&mut self, next: DeliberationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
        self.trace.push(next);
    }
}

/// How a pipeline that did not error ended.
enum Conclusion {
    Success(String),
    Refused(String),
}

/// Runs deliberations. Cheap to share: clone the `Arc` across tasks.
///
/// Concurrent runs share the provider, the corpus indexes and the circuit
/// breaker; each run gets its own budget and audit log.
pub struct DeliberationCoordinator {
    provider: Arc<dyn LlmProvider>,
    config: Arc<RuntimeConfig>,
    breaker: Arc<CircuitBreaker>,
    language: Arc<dyn Stage>,
    legal: Arc<dyn Stage>,
    risk: Arc<dyn Stage>,
    ethics: Arc<dyn Stage>,
    confidence: Arc<dyn Stage>,
}

impl DeliberationCoordinator {
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn stage(&self, kind: StageKind) -> &Arc<dyn Stage> {
        match kind {
            StageKind::Language => &self.language,
            StageKind::Legal => &self.legal,
            StageKind::Risk => &self.risk,
            StageKind::Ethics => &self.ethics,
            StageKind::Confidence => &self.confidence,
        }
    }

    /// A fresh generation gate for one run.
    pub fn generator(&self) -> Generator {
        Generator::new(self.provider.clone(), self.breaker.clone(), self.config.clone())
    }

    /// Run one deliberation, bounded by the configured run timeout.
    pub async fn deliberate(&self, session: &mut Session, input: &str) -> RuntimeResult {
        self.deliberate_until(session, input, std::future::pending::<()>())
            .await
    }

    /// Run one deliberation, stopping early when `cancel` resolves.
    ///
    /// On cancellation or timeout no further stage is started; the verdict
    /// is ERROR and carries the audit entries written so far.
    pub async fn deliberate_until<C>(
        &self,
        session: &mut Session,
        input: &str,
        cancel: C,
    ) -> RuntimeResult
    where
        C: Future<Output = ()>,
    {
        let started = Instant::now();
        let generator = self.generator();
        let mut run = RunState::new();
        let run_timeout = self.config.run_timeout;

        let outcome = {
            let pipeline = self.run_pipeline(&generator, &mut run, input);
            tokio::pin!(pipeline);
            tokio::select! {
                biased;
                _ = cancel => Err(RuntimeError::Cancelled),
                _ = tokio::time::sleep(run_timeout) => Err(RuntimeError::Timeout(run_timeout)),
                result = &mut pipeline => result.map_err(RuntimeError::from),
            }
        };

        let verdict = match outcome {
            Ok(Conclusion::Success(response)) => Verdict::Success {
                response,
                logs: run.log.clone(),
            },
            Ok(Conclusion::Refused(reason)) => Verdict::Refused {
                reason,
                logs: run.log.clone(),
            },
            Err(e) => {
                warn!(state = %run.state, error = %e, "Deliberation ended in error");
                run.advance(DeliberationState::Error);
                Verdict::Error {
                    reason: e.to_string(),
                    logs: run.log.clone(),
                }
            }
        };

        session.record(&verdict);
        let elapsed = started.elapsed();
        info!(
            session = session.id(),
            status = verdict.status(),
            state = %run.state,
            entries = verdict.logs().len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Deliberation finished"
        );

        RuntimeResult {
            verdict,
            trace: run.trace,
            query: run.query,
            ethics_gate: run.ethics_gate,
            confidence_gate: run.confidence_gate,
            llm_usage: generator.usage(),
            elapsed,
        }
    }

    async fn run_stage(
        &self,
        kind: StageKind,
        generator: &Generator,
        ctx: &StageContext<'_>,
        run: &mut RunState,
    ) -> Result<String, StageError> {
        debug!(stage = %kind, state = %run.state, "Running stage");
        match self.stage(kind).analyze(generator, ctx).await {
            Ok(output) => Ok(output),
            Err(e) => {
                run.log.record(kind, format!("Stage failed: {e}"));
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        generator: &Generator,
        run: &mut RunState,
        input: &str,
    ) -> Result<Conclusion, StageError> {
        let situation = self
            .run_stage(StageKind::Language, generator, &StageContext::new(input), run)
            .await?;
        run.log.record(StageKind::Language, situation.as_str());
        // Unchanged input that still needs translating means the Language stage fell back
        let target = self.config.target_language.as_str();
        let language = if situation != input || is_in_target_language(input, target) {
            target
        } else {
            UNKNOWN_LANGUAGE
        };
        run.query = Some(Query::new(situation.as_str(), language));
        run.advance(DeliberationState::Translated);

        let base = StageContext::new(&situation);

        let legal = self.run_stage(StageKind::Legal, generator, &base, run).await?;
        run.log.record(StageKind::Legal, legal.as_str());
        run.advance(DeliberationState::LegalDone);

        let risk = self
            .run_stage(StageKind::Risk, generator, &base.with_legal(&legal), run)
            .await?;
        run.log.record(StageKind::Risk, risk.as_str());
        run.advance(DeliberationState::RiskDone);

        let ethics = self
            .run_stage(StageKind::Ethics, generator, &base.with_risk(&risk), run)
            .await?;
        let ethics_result = ethics_gate(&parse::<EthicsRecord>(&ethics));
        run.ethics_gate = Some(ethics_result.clone());
        run.advance(DeliberationState::EthicsChecked);
        if let GateResult::Triggered { reason } = ethics_result {
            run.log
                .record(StageKind::Ethics, format!("VETO Triggered: {reason}"));
            run.advance(DeliberationState::RefusedEthics);
            return Ok(Conclusion::Refused(reason));
        }
        run.log.record(StageKind::Ethics, ethics.as_str());

        let confidence = self
            .run_stage(
                StageKind::Confidence,
                generator,
                &base.with_legal(&legal).with_risk(&risk),
                run,
            )
            .await?;
        let parsed = parse::<ConfidenceRecord>(&confidence);
        let confidence_result = confidence_gate(&parsed);
        run.confidence_gate = Some(confidence_result.clone());
        run.advance(DeliberationState::ConfidenceChecked);
        if let GateResult::Triggered { reason } = confidence_result {
            let score = parsed.record().map_or(0, |r| r.score_or_zero());
            run.log
                .record(StageKind::Confidence, format!("Score: {score}% - Refused"));
            run.advance(DeliberationState::RefusedConfidence);
            return Ok(Conclusion::Refused(reason));
        }
        run.log.record(StageKind::Confidence, confidence.as_str());

        run.advance(DeliberationState::Success);
        Ok(Conclusion::Success(legal))
    }
}

/// Builder for [`DeliberationCoordinator`].
///
/// Either hand it a provider or let it build one from the config through a
/// [`ProviderRegistry`]. Any stage can be swapped out.
#[derive(Default)]
pub struct CoordinatorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    registry: Option<ProviderRegistry>,
    config: Option<RuntimeConfig>,
    library: Option<Arc<CorpusLibrary>>,
    overrides: Vec<Arc<dyn Stage>>,
}

impl CoordinatorBuilder {
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use prebuilt indexes instead of loading `config.corpora`.
    pub fn library(mut self, library: Arc<CorpusLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    /// Replace the default implementation of `stage.kind()`.
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.overrides.push(stage);
        self
    }

    pub fn build(self) -> Result<DeliberationCoordinator, RuntimeError> {
        let config = self.config.unwrap_or_default();

        let provider = match self.provider {
            Some(provider) => provider,
            None => {
                let registry = self.registry.unwrap_or_else(ProviderRegistry::with_defaults);
                let mut settings = config.provider.settings.clone();
                if !settings.is_object() {
                    settings = serde_json::json!({});
                }
                registry
                    .create(&config.provider.provider_type, &settings)
                    .map_err(|e| RuntimeError::ProviderNotConfigured(e.to_string()))?
            }
        };

        let provider: Arc<dyn LlmProvider> = if config.cache.enabled {
            Arc::new(CachedProvider::new(
                provider,
                CompletionCache::new(config.cache.capacity, config.cache.ttl),
            ))
        } else {
            provider
        };

        let library = self
            .library
            .unwrap_or_else(|| Arc::new(CorpusLibrary::load(&config.corpora)));

        let mut coordinator = DeliberationCoordinator {
            provider,
            breaker: Arc::new(CircuitBreaker::new(config.circuit_breaker.clone())),
            language: Arc::new(LanguageStage::new(config.target_language.clone())),
            legal: Arc::new(LegalStage::new(library)),
            risk: Arc::new(RiskStage),
            ethics: Arc::new(EthicsStage),
            confidence: Arc::new(ConfidenceStage),
            config: Arc::new(config),
        };

        for stage in self.overrides {
            match stage.kind() {
                StageKind::Language => coordinator.language = stage,
                StageKind::Legal => coordinator.legal = stage,
                StageKind::Risk => coordinator.risk = stage,
                StageKind::Ethics => coordinator.ethics = stage,
                StageKind::Confidence => coordinator.confidence = stage,
            }
        }

        Ok(coordinator)
    }
}
