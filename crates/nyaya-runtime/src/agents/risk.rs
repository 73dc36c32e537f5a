//! Risk stage: pessimistic review of the situation and the legal advice.

use async_trait::async_trait;
use nyaya_core::StageKind;

use super::traits::{Stage, StageContext, StageError};
use crate::prompts::{self, RISK_ROLE};

/// Reads the situation and the Legal stage's raw output.
#[derive(Debug, Default)]
pub struct RiskStage;

#[async_trait]
impl Stage for RiskStage {
    fn kind(&self) -> StageKind {
        StageKind::Risk
    }

    fn role_instruction(&self) -> &str {
        RISK_ROLE
    }

    fn build_prompt(&self, ctx: &StageContext<'_>) -> Result<String, StageError> {
        let legal = ctx.require_legal(self.kind())?;
        Ok(prompts::risk_prompt(ctx.situation, legal))
    }
}
