//! Confidence stage: a harsh estimate of how well-grounded the advice is.

use async_trait::async_trait;
use nyaya_core::StageKind;

use super::traits::{Stage, StageContext, StageError};
use crate::prompts::{self, CONFIDENCE_ROLE};

/// Reads the situation plus both Legal and Risk outputs.
#[derive(Debug, Default)]
pub struct ConfidenceStage;

#[async_trait]
impl Stage for ConfidenceStage {
    fn kind(&self) -> StageKind {
        StageKind::Confidence
    }

    fn role_instruction(&self) -> &str {
        CONFIDENCE_ROLE
    }

    fn build_prompt(&self, ctx: &StageContext<'_>) -> Result<String, StageError> {
        let legal = ctx.require_legal(self.kind())?;
        let risk = ctx.require_risk(self.kind())?;
        Ok(prompts::confidence_prompt(ctx.situation, legal, risk))
    }
}
