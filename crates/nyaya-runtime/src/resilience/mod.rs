//! Resilience around generation calls.
//!
//! - Circuit breaker per stage, shared across runs
//! - Token budgets per stage and per run
//!
//! Retry with backoff lives in the provider itself (see the Groq provider).

mod budget;
mod circuit_breaker;

pub use budget::{BudgetTracker, LlmUsage, TokenBudget};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
