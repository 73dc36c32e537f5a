//! The five analysis stages and the generation gate they share.
//!
//! Each stage is a role-specific prompt over declared inputs. Stages never
//! call the provider directly; they go through the run's [`Generator`].

mod confidence;
mod ethics;
mod generator;
mod language;
mod legal;
mod risk;
mod traits;

pub use confidence::ConfidenceStage;
pub use ethics::EthicsStage;
pub use generator::{GenerationError, Generator};
pub use language::{
    is_in_target_language, LanguageStage, DEFAULT_TARGET_LANGUAGE, UNKNOWN_LANGUAGE,
};
pub use legal::{LegalStage, EXCERPT_CHARS};
pub use risk::RiskStage;
pub use traits::{Stage, StageContext, StageError};
