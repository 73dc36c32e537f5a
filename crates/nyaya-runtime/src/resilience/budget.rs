//! Token budget management for generation calls.
//!
//! Enforces per-stage and per-run token budgets. A stage that cannot
//! afford its estimated prompt is skipped and gets the placeholder output.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use nyaya_core::StageKind;

use crate::providers::TokenUsage;

/// Token budget for a scope (stage or whole run).
pub struct TokenBudget {
    /// Maximum tokens allowed
    pub max_tokens: u32,

    used: AtomicU32,
}

impl TokenBudget {
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            used: AtomicU32::new(0),
        }
    }

    /// Check if we can afford to use tokens.
    pub fn can_afford(&self, tokens: u32) -> bool {
        self.remaining() >= tokens
    }

    pub fn record(&self, tokens: u32) {
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                Some(used.saturating_add(tokens))
            });
    }

    pub fn remaining(&self) -> u32 {
        self.max_tokens.saturating_sub(self.used.load(Ordering::SeqCst))
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.used.store(0, Ordering::SeqCst);
    }
}

/// Accumulated generation usage for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub total_tokens: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,

    /// Number of generation calls that reached the provider
    pub llm_calls: u32,

    /// Calls that failed, timed out, or returned nothing
    pub failed_calls: u32,

    /// Calls skipped because a circuit was open or the budget ran out
    pub skipped_calls: u32,
}

impl LlmUsage {
    /// Add token usage from a provider response.
    pub fn add(&mut self, usage: &TokenUsage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(usage.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(usage.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(usage.total());
        self.llm_calls = self.llm_calls.saturating_add(1);
    }
}

/// Budget tracker for a single deliberation run.
pub struct BudgetTracker {
    stage_budgets: HashMap<StageKind, TokenBudget>,
    run_budget: TokenBudget,
    usage: RwLock<LlmUsage>,
}

impl BudgetTracker {
    /// Create a tracker with the same cap for every stage.
    pub fn new(run_max: u32, per_stage_max: u32) -> Self {
        let stage_budgets = StageKind::PIPELINE
            .iter()
            .map(|&stage| (stage, TokenBudget::new(per_stage_max)))
            .collect();

        Self {
            stage_budgets,
            run_budget: TokenBudget::new(run_max),
            usage: RwLock::new(LlmUsage::default()),
        }
    }

    /// Check if we can afford a call for a stage.
    pub fn can_afford(&self, stage: StageKind, estimated_tokens: u32) -> bool {
        let stage_ok = self
            .stage_budgets
            .get(&stage)
            .map(|b| b.can_afford(estimated_tokens))
            .unwrap_or(true);

        stage_ok && self.run_budget.can_afford(estimated_tokens)
    }

    /// Record usage after a successful call.
    pub fn record_usage(&self, stage: StageKind, usage: &TokenUsage) {
        let total = usage.total();
        if let Some(budget) = self.stage_budgets.get(&stage) {
            budget.record(total);
        }
        self.run_budget.record(total);
        self.usage.write().add(usage);
    }

    pub fn record_failure(&self) {
        self.usage.write().failed_calls += 1;
    }

    pub fn record_skip(&self) {
        self.usage.write().skipped_calls += 1;
    }

    /// Snapshot of the usage so far.
    pub fn usage(&self) -> LlmUsage {
        self.usage.read().clone()
    }

    pub fn remaining_run(&self) -> u32 {
        self.run_budget.remaining()
    }

    pub fn remaining_stage(&self, stage: StageKind) -> u32 {
        self.stage_budgets
            .get(&stage)
            .map(|b| b.remaining())
            .unwrap_or(0)
    }
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self::new(20_000, 6_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_budget_enforcement() {
        let budget = TokenBudget::new(100);

        assert!(budget.can_afford(100));
        assert!(!budget.can_afford(101));

        budget.record(60);
        assert_eq!(budget.remaining(), 40);
        assert!(!budget.can_afford(50));
        assert!(budget.can_afford(40));

        budget.reset();
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn test_budget_tracker() {
        let tracker = BudgetTracker::new(500, 100);
        assert!(tracker.can_afford(StageKind::Legal, 50));

        let usage = TokenUsage {
            prompt_tokens: 30,
            completion_tokens: 20,
        };
        tracker.record_usage(StageKind::Legal, &usage);

        assert_eq!(tracker.remaining_stage(StageKind::Legal), 50);
        assert_eq!(tracker.remaining_stage(StageKind::Risk), 100);
        assert_eq!(tracker.remaining_run(), 450);
        assert!(!tracker.can_afford(StageKind::Legal, 60));
        assert!(tracker.can_afford(StageKind::Risk, 60));
    }

    #[test]
    fn test_run_budget_caps_all_stages() {
        let tracker = BudgetTracker::new(100, 1_000);
        tracker.record_usage(
            StageKind::Language,
            &TokenUsage {
                prompt_tokens: 80,
                completion_tokens: 10,
            },
        );
        assert!(!tracker.can_afford(StageKind::Confidence, 20));
    }

    #[test]
    fn test_usage_counts() {
        let tracker = BudgetTracker::default();
        tracker.record_usage(
            StageKind::Ethics,
            &TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
            },
        );
        tracker.record_failure();
        tracker.record_skip();

        let usage = tracker.usage();
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(usage.llm_calls, 1);
        assert_eq!(usage.failed_calls, 1);
        assert_eq!(usage.skipped_calls, 1);
    }

    #[test]
    fn test_extreme_usage_saturates() {
        let tracker = BudgetTracker::new(1_000, 1_000);
        let usage = TokenUsage {
            prompt_tokens: u32::MAX,
            completion_tokens: u32::MAX,
        };
        tracker.record_usage(StageKind::Legal, &usage);
        tracker.record_usage(StageKind::Legal, &usage);

        let report = tracker.usage();
        assert_eq!(report.total_tokens, u32::MAX);
        assert_eq!(report.prompt_tokens, u32::MAX);
        assert_eq!(report.llm_calls, 2);
        assert_eq!(tracker.remaining_run(), 0);
        assert_eq!(tracker.remaining_stage(StageKind::Legal), 0);
    }

    proptest! {
        #[test]
        fn prop_remaining_is_saturating(max in 0u32..10_000, spends in proptest::collection::vec(0u32..2_000, 0..10)) {
            let budget = TokenBudget::new(max);
            for spend in &spends {
                budget.record(*spend);
            }
            let spent: u32 = spends.iter().sum();
            prop_assert_eq!(budget.remaining(), max.saturating_sub(spent));
            prop_assert!(budget.remaining() <= max);
            prop_assert_eq!(budget.can_afford(0), true);
        }
    }
}
