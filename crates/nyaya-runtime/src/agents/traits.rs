//! Stage trait and common types.

use async_trait::async_trait;
use nyaya_core::StageKind;
use thiserror::Error;

use super::generator::Generator;
use crate::prompts::STAGE_TEMPERATURE;

/// Errors that abort a deliberation run.
///
/// Generation failures are NOT errors: a stage recovers from them locally
/// and returns its placeholder output.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("{stage} stage requires the {input} output")]
    MissingInput {
        stage: StageKind,
        input: &'static str,
    },

    #[error("{stage} stage failed: {message}")]
    Internal { stage: StageKind, message: String },
}

/// Inputs a stage may read: the normalized situation plus the raw output
/// of the stages before it.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub situation: &'a str,
    pub legal: Option<&'a str>,
    pub risk: Option<&'a str>,
}

impl<'a> StageContext<'a> {
    pub fn new(situation: &'a str) -> Self {
        Self {
            situation,
            legal: None,
            risk: None,
        }
    }

    pub fn with_legal(mut self, legal: &'a str) -> Self {
        self.legal = Some(legal);
        self
    }

    pub fn with_risk(mut self, risk: &'a str) -> Self {
        self.risk = Some(risk);
        self
    }

    /// Upstream Legal output, or a `MissingInput` error for `stage`.
    pub fn require_legal(&self, stage: StageKind) -> Result<&'a str, StageError> {
        self.legal.ok_or(StageError::MissingInput {
            stage,
            input: "Legal",
        })
    }

    /// Upstream Risk output, or a `MissingInput` error for `stage`.
    pub fn require_risk(&self, stage: StageKind) -> Result<&'a str, StageError> {
        self.risk.ok_or(StageError::MissingInput {
            stage,
            input: "Risk",
        })
    }
}

/// One role-specific analysis step.
///
/// # Contract
/// - Output depends only on the context, the role instruction and the
///   task template
/// - Generation failure yields the empty placeholder, never an error
/// - Stages share nothing mutable; the coordinator orders them
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Fixed system instruction sent with every call.
    fn role_instruction(&self) -> &str;

    fn temperature(&self) -> f32 {
        STAGE_TEMPERATURE
    }

    /// Build the task prompt from declared inputs.
    fn build_prompt(&self, ctx: &StageContext<'_>) -> Result<String, StageError>;

    /// Run the stage and return its raw text output.
    async fn analyze(
        &self,
        generator: &Generator,
        ctx: &StageContext<'_>,
    ) -> Result<String, StageError> {
        let prompt = self.build_prompt(ctx)?;
        Ok(generator
            .generate(self.kind(), &prompt, self.role_instruction(), self.temperature())
            .await
            .unwrap_or_default())
    }
}
