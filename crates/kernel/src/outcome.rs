use serde::Serialize;

/// Result of one provisioning phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PhaseOutcome {
    #[default]
    #[serde(rename = "Not attempted")]
    NotAttempted,
    Created,
    #[serde(rename = "Already exists")]
    AlreadyExists,
    Error,
}

impl PhaseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseOutcome::NotAttempted => "Not attempted",
            PhaseOutcome::Created => "Created",
            PhaseOutcome::AlreadyExists => "Already exists",
            PhaseOutcome::Error => "Error",
        }
    }
}

/// Orchestration-level status of a bootstrap run.
///
/// This only reflects failures the orchestrator itself observed. A phase
/// reporting [`PhaseOutcome::Error`] leaves the run `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OverallStatus {
    Success,
    Error,
    #[default]
    Failed,
}

/// Record returned to whatever triggered the bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BootstrapResult {
    #[serde(rename = "Result")]
    pub overall: OverallStatus,
    #[serde(rename = "create_db")]
    pub role_db: PhaseOutcome,
    #[serde(rename = "create_schema")]
    pub schema: PhaseOutcome,
}

impl BootstrapResult {
    pub fn is_success(&self) -> bool {
        self.overall == OverallStatus::Success
    }
}
