//! Team state types maintained by `TeamStateManager`.

use crate::id::TeamId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Shared state for a collaborating team of agents.
///
/// `members` has set semantics (no duplicates) but preserves insertion
/// order, and `version` increments on every mutating operation.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamState {
    /// The team this state belongs to.
    pub team_id: TeamId,
    /// Member ids, in insertion order, no duplicates.
    pub members: Vec<String>,
    /// Shared key/value context, shallow-merged on update.
    pub shared_context: HashMap<String, serde_json::Value>,
    /// Monotonic version, starting at 1.
    pub version: u64,
    /// Milliseconds since the manager's clock epoch of the last mutation.
    pub last_updated_ms: u64,
}

impl TeamState {
    /// Construct a freshly-created team state at version 1.
    pub fn new(
        team_id: TeamId,
        members: Vec<String>,
        shared_context: HashMap<String, serde_json::Value>,
        created_at_ms: u64,
    ) -> Self {
        let mut seen = std::collections::HashSet::new();
        let members = members
            .into_iter()
            .filter(|m| seen.insert(m.clone()))
            .collect();
        Self {
            team_id,
            members,
            shared_context,
            version: 1,
            last_updated_ms: created_at_ms,
        }
    }
}

/// A partial update applied by `updateTeamState`. `members`, when present,
/// replaces the full member list wholesale; `shared_context`, when present,
/// is shallow-merged (later keys override earlier ones).
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamStateChanges {
    /// Replacement member list, if present.
    pub members: Option<Vec<String>>,
    /// Keys to merge into shared context, if present.
    pub shared_context: Option<HashMap<String, serde_json::Value>>,
}

impl TeamStateChanges {
    /// A changeset that only touches shared context.
    pub fn shared_context_only(partial: HashMap<String, serde_json::Value>) -> Self {
        Self {
            members: None,
            shared_context: Some(partial),
        }
    }
}

/// An entry in a team's bounded update history.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamUpdateRecord {
    /// The team this record belongs to.
    pub team_id: TeamId,
    /// The agent/user that made the change.
    pub updater_id: String,
    /// The changes that were applied.
    pub changes: TeamStateChanges,
    /// When the update happened, milliseconds since the manager's clock epoch.
    pub timestamp_ms: u64,
}

/// Default bound on the number of `TeamUpdateRecord`s retained per team.
pub const DEFAULT_MAX_HISTORY_PER_TEAM: usize = 100;
