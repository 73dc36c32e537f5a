//! Per-stage circuit breaker around generation calls.
//!
//! When a stage's generation calls fail repeatedly, its circuit opens and
//! further calls for that stage return the placeholder output immediately
//! instead of waiting on a backend that is down.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use nyaya_core::StageKind;

use crate::config::duration_str;

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failures before opening circuit
    pub failure_threshold: u32,

    /// Time before attempting recovery
    #[serde(with = "duration_str")]
    pub recovery_timeout: Duration,

    /// Successes needed to close circuit
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

/// State of a circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation
    Closed { failures: u32 },

    /// Circuit is open, all calls bypass generation
    Open { opened_at: Instant },

    /// Testing if circuit can close
    HalfOpen { successes: u32 },
}

/// Circuit breaker shared by every run of one coordinator.
///
/// Each stage has its own circuit so one failing role does not silence
/// the others.
pub struct CircuitBreaker {
    states: RwLock<HashMap<StageKind, CircuitState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// True if calls for `stage` should skip generation.
    pub fn is_open(&self, stage: StageKind) -> bool {
        let states = self.states.read();
        match states.get(&stage) {
            Some(CircuitState::Open { opened_at }) => {
                if opened_at.elapsed() >= self.config.recovery_timeout {
                    drop(states);
                    self.transition_to_half_open(stage);
                    false
                } else {
                    true
                }
            }
            _ => false,
        }
    }

    /// Record a successful generation call.
    pub fn record_success(&self, stage: StageKind) {
        let mut states = self.states.write();
        match states.get(&stage).cloned() {
            Some(CircuitState::HalfOpen { successes }) => {
                if successes + 1 >= self.config.success_threshold {
                    states.insert(stage, CircuitState::Closed { failures: 0 });
                    tracing::info!(stage = %stage, "Circuit closed after successful recovery");
                } else {
                    states.insert(stage, CircuitState::HalfOpen {
                        successes: successes + 1,
                    });
                }
            }
            Some(CircuitState::Closed { .. }) => {
                states.insert(stage, CircuitState::Closed { failures: 0 });
            }
            _ => {}
        }
    }

    /// Record a failed generation call.
    pub fn record_failure(&self, stage: StageKind) {
        let mut states = self.states.write();
        let failures = match states.get(&stage).cloned() {
            None => 0,
            Some(CircuitState::Closed { failures }) => failures,
            Some(CircuitState::HalfOpen { .. }) => {
                states.insert(stage, CircuitState::Open {
                    opened_at: Instant::now(),
                });
                tracing::warn!(stage = %stage, "Circuit reopened after failed recovery attempt");
                return;
            }
            Some(CircuitState::Open { .. }) => return,
        };

        if failures + 1 >= self.config.failure_threshold {
            states.insert(stage, CircuitState::Open {
                opened_at: Instant::now(),
            });
            tracing::warn!(
                stage = %stage,
                failures = failures + 1,
                "Circuit opened after repeated failures"
            );
        } else {
            states.insert(stage, CircuitState::Closed {
                failures: failures + 1,
            });
        }
    }

    fn transition_to_half_open(&self, stage: StageKind) {
        let mut states = self.states.write();
        if matches!(states.get(&stage), Some(CircuitState::Open { .. })) {
            states.insert(stage, CircuitState::HalfOpen { successes: 0 });
            tracing::info!(stage = %stage, "Circuit half-open, allowing a recovery call");
        }
    }

    /// Get current state of a circuit.
    pub fn state(&self, stage: StageKind) -> CircuitState {
        self.states
            .read()
            .get(&stage)
            .cloned()
            .unwrap_or(CircuitState::Closed { failures: 0 })
    }

    /// Reset all circuits to closed.
    pub fn reset(&self) {
        self.states.write().clear();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
