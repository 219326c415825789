use async_trait::async_trait;

use crate::env::BootstrapRequest;
use crate::outcome::PhaseOutcome;

/// One step of the bootstrap sequence.
///
/// Implementations contain their own failures and report them as
/// [`PhaseOutcome::Error`]. Returning `Err` means something escaped the
/// phase's own handling; the orchestrator treats that as fatal to the run.
#[async_trait]
pub trait Phase: Send + Sync {
    /// Key under which the outcome is reported (`create_db`, `create_schema`).
    fn name(&self) -> &'static str;

    async fn run(&self, request: &BootstrapRequest) -> anyhow::Result<PhaseOutcome>;
}
