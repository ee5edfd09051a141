use async_trait::async_trait;
use goblin_models::PipelineState;

use crate::error::AgentError;

/// One step of the analysis pipeline. Takes the state by value and returns the
/// updated state.
///
/// Stage-level failures are recorded in the state as a `success: false` result
/// and returned as `Ok`. An `Err` means the stage itself broke and the
/// orchestrator aborts the run.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, state: PipelineState) -> Result<PipelineState, AgentError>;
}
