//! Ethics stage: the safety review that may veto a request.

use async_trait::async_trait;
use nyaya_core::StageKind;

use super::traits::{Stage, StageContext, StageError};
use crate::prompts::{self, ETHICS_ROLE};

/// Reads the situation and the Risk stage's raw output. The veto itself is
/// decided by [`nyaya_core::ethics_gate`] on this stage's output.
#[derive(Debug, Default)]
pub struct EthicsStage;

#[async_trait]
impl Stage for EthicsStage {
    fn kind(&self) -> StageKind {
        StageKind::Ethics
    }

    fn role_instruction(&self) -> &str {
        ETHICS_ROLE
    }

    fn build_prompt(&self, ctx: &StageContext<'_>) -> Result<String, StageError> {
        let risk = ctx.require_risk(self.kind())?;
        Ok(prompts::ethics_prompt(ctx.situation, risk))
    }
}
