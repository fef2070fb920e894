//! The handoff request type — how a task and its context move between agents.

use crate::id::{AgentId, TaskId};
use serde::{Deserialize, Serialize};

/// A request to transfer a task and its context from one agent to another.
///
/// Self-handoff (`source_agent_id == target_agent_id`) is permitted — the
/// invariant only requires all four fields present and non-empty.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffRequest {
    /// The agent handing off.
    pub source_agent_id: AgentId,
    /// The agent receiving the handoff.
    pub target_agent_id: AgentId,
    /// The task being handed off.
    pub task_id: TaskId,
    /// Opaque context to carry across the handoff.
    pub context: serde_json::Value,
}

impl HandoffRequest {
    /// Construct a new handoff request.
    pub fn new(
        source_agent_id: impl Into<AgentId>,
        target_agent_id: impl Into<AgentId>,
        task_id: impl Into<TaskId>,
        context: serde_json::Value,
    ) -> Self {
        Self {
            source_agent_id: source_agent_id.into(),
            target_agent_id: target_agent_id.into(),
            task_id: task_id.into(),
            context,
        }
    }
}

/// The state a single handoff moves through under `HandoffCoordinator`.
///
/// `INIT -> VALIDATED -> PRESERVED -> EXECUTING ->
/// (SUCCEEDED | FALLING_BACK -> (FALLBACK_SUCCEEDED | ROLLED_BACK | FAILED))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffState {
    /// Just received, not yet validated.
    Init,
    /// Passed `Validator::validate_handoff_request`.
    Validated,
    /// Context has been preserved.
    Preserved,
    /// The target tool is executing (with retry).
    Executing,
    /// Execution failed; attempting a fallback.
    FallingBack,
    /// Terminal: primary execution succeeded.
    Succeeded,
    /// Terminal: the fallback provider succeeded.
    FallbackSucceeded,
    /// Terminal: both primary and fallback failed; context was rolled back.
    RolledBack,
    /// Terminal: failed and no recovery was possible.
    Failed,
}

impl HandoffState {
    /// Whether this state is terminal (the handoff will not transition further).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            HandoffState::Succeeded
                | HandoffState::FallbackSucceeded
                | HandoffState::RolledBack
                | HandoffState::Failed
        )
    }
}
