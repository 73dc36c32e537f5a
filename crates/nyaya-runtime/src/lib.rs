//! # nyaya-runtime
//!
//! LLM-backed deliberation for Nyaya legal triage.
//!
//! A user's situation passes through five analysis stages in a fixed order
//! (Language, Legal, Risk, Ethics, Confidence). The Ethics stage can veto
//! and the Confidence stage can refuse; otherwise the Legal stage's advice
//! is returned. Retrieval, parsing and gating come from `nyaya-core`; this
//! crate adds the generation provider, resilience, prompts and the
//! coordinator that drives the state machine.
//!
//! ## Guarantees
//!
//! 1. **Strict order**: each stage reads only the outputs of earlier stages
//! 2. **Local recovery**: a failed generation call becomes the stage's
//!    placeholder output, never an error
//! 3. **Always an audit log**: every verdict, including ERROR, carries the
//!    entries of every stage that ran
//! 4. **No global state**: sessions are created and passed by the caller
//!
//! ## Example
//!
//! ```rust,ignore
//! use nyaya_runtime::{DeliberationCoordinator, RuntimeConfig, Session};
//!
//! let config = RuntimeConfig::from_yaml_file("nyaya.yaml")?;
//! let coordinator = DeliberationCoordinator::builder().config(config).build()?;
//!
//! let mut session = Session::new("cli");
//! let result = coordinator.deliberate(&mut session, "someone stole my bike").await;
//! println!("{}", serde_json::to_string_pretty(&result.verdict)?);
//! ```

pub mod agents;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod session;

pub use agents::{GenerationError, Generator, Stage, StageContext, StageError};
pub use cache::{CachedProvider, CompletionCache};
pub use config::{ConfigError, RuntimeConfig};
pub use coordinator::{CoordinatorBuilder, DeliberationCoordinator, RuntimeError, RuntimeResult};
pub use providers::{LlmProvider, ProviderError, ProviderRegistry};
pub use resilience::LlmUsage;
pub use session::{Session, SessionRegistry};
