//! # swarm-team — shared team state (spec §4.2)
//!
//! `RwLock<HashMap<...>>` store over an in-memory map, the same shape
//! `neuron-state-memory::MemoryStore` uses for layer0's `StateStore`, here
//! specialized to `TeamState` plus a per-team bounded update history instead
//! of an arbitrary scoped key/value blob.

#![deny(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use swarm_bus::EventBus;
use swarm_proto::{
    TeamError, TeamId, TeamState, TeamStateChanges, TeamUpdateRecord,
    DEFAULT_MAX_HISTORY_PER_TEAM,
};
use swarm_proto::{DurationMs, Event};
use tokio::sync::RwLock;

struct Entry {
    state: TeamState,
    history: Vec<TeamUpdateRecord>,
}

/// Manages shared state for collaborating teams of agents.
///
/// Every mutating operation emits a bus event so other components (fidelity
/// tracking, UIs, audit logs) can observe team state without polling it.
pub struct TeamStateManager {
    teams: RwLock<HashMap<TeamId, Entry>>,
    max_history_per_team: usize,
    bus: Option<Arc<EventBus>>,
}

impl TeamStateManager {
    /// Create a manager with the default history bound and no attached bus.
    pub fn new() -> Self {
        Self {
            teams: RwLock::new(HashMap::new()),
            max_history_per_team: DEFAULT_MAX_HISTORY_PER_TEAM,
            bus: None,
        }
    }

    /// Create a manager that publishes `teamCreated`/`teamUpdated`/
    /// `teamDeleted` events onto `bus`.
    pub fn with_bus(bus: Arc<EventBus>) -> Self {
        Self {
            teams: RwLock::new(HashMap::new()),
            max_history_per_team: DEFAULT_MAX_HISTORY_PER_TEAM,
            bus: Some(bus),
        }
    }

    /// Override the per-team history bound (default
    /// [`DEFAULT_MAX_HISTORY_PER_TEAM`]).
    pub fn with_max_history(mut self, max_history_per_team: usize) -> Self {
        self.max_history_per_team = max_history_per_team;
        self
    }

    async fn emit(&self, event_type: &'static str, payload: serde_json::Value, now_ms: u64) {
        if let Some(bus) = &self.bus {
            bus.publish(Event::new(
                format!("{event_type}-{now_ms}"),
                event_type,
                DurationMs::from_millis(now_ms),
                "team_state_manager",
                payload,
            ))
            .await;
        }
    }

    /// Create a new team's state at version 1. Fails if `team_id` is
    /// already present.
    pub async fn create_team_state(
        &self,
        team_id: TeamId,
        members: Vec<String>,
        shared_context: HashMap<String, serde_json::Value>,
        now_ms: u64,
    ) -> Result<TeamState, TeamError> {
        let mut teams = self.teams.write().await;
        if teams.contains_key(&team_id) {
            return Err(TeamError::AlreadyExists(team_id.to_string()));
        }
        let state = TeamState::new(team_id.clone(), members, shared_context, now_ms);
        teams.insert(
            team_id.clone(),
            Entry {
                state: state.clone(),
                history: Vec::new(),
            },
        );
        drop(teams);
        self.emit(
            "teamCreated",
            serde_json::json!({ "team_id": team_id.as_str(), "state": state }),
            now_ms,
        )
        .await;
        Ok(state)
    }

    /// Apply `changes` to a team's state: `members` (if present) replaces the
    /// member list wholesale, `shared_context` (if present) is
    /// shallow-merged. Bumps `version`, appends to history (evicting the
    /// oldest entry past the bound), and emits `teamUpdated`.
    pub async fn update_team_state(
        &self,
        team_id: &TeamId,
        updater_id: impl Into<String>,
        changes: TeamStateChanges,
        now_ms: u64,
    ) -> Result<TeamState, TeamError> {
        let updater_id = updater_id.into();
        let mut teams = self.teams.write().await;
        let entry = teams
            .get_mut(team_id)
            .ok_or_else(|| TeamError::NotFound(team_id.to_string()))?;

        if let Some(members) = &changes.members {
            entry.state.members = dedup_preserve_order(members.clone());
        }
        if let Some(partial) = &changes.shared_context {
            for (k, v) in partial.clone() {
                entry.state.shared_context.insert(k, v);
            }
        }
        entry.state.version += 1;
        entry.state.last_updated_ms = now_ms;

        let record = TeamUpdateRecord {
            team_id: team_id.clone(),
            updater_id,
            changes,
            timestamp_ms: now_ms,
        };
        entry.history.push(record.clone());
        if entry.history.len() > self.max_history_per_team {
            let overflow = entry.history.len() - self.max_history_per_team;
            entry.history.drain(0..overflow);
        }
        let state = entry.state.clone();
        drop(teams);

        self.emit(
            "teamUpdated",
            serde_json::json!({ "state": state, "record": record }),
            now_ms,
        )
        .await;
        Ok(state)
    }

    /// Add a member to a team. Idempotent: if already present, returns the
    /// current state without bumping `version` or emitting an event.
    pub async fn add_team_member(
        &self,
        team_id: &TeamId,
        member_id: impl Into<String>,
        now_ms: u64,
    ) -> Result<TeamState, TeamError> {
        let member_id = member_id.into();
        {
            let teams = self.teams.read().await;
            let entry = teams
                .get(team_id)
                .ok_or_else(|| TeamError::NotFound(team_id.to_string()))?;
            if entry.state.members.contains(&member_id) {
                return Ok(entry.state.clone());
            }
        }
        let mut members = {
            let teams = self.teams.read().await;
            teams.get(team_id).unwrap().state.members.clone()
        };
        members.push(member_id);
        self.update_team_state(
            team_id,
            "system",
            TeamStateChanges {
                members: Some(members),
                shared_context: None,
            },
            now_ms,
        )
        .await
    }

    /// Remove a member from a team. No-op if the member was absent (no
    /// version bump, no event).
    pub async fn remove_team_member(
        &self,
        team_id: &TeamId,
        member_id: &str,
        now_ms: u64,
    ) -> Result<TeamState, TeamError> {
        let members = {
            let teams = self.teams.read().await;
            let entry = teams
                .get(team_id)
                .ok_or_else(|| TeamError::NotFound(team_id.to_string()))?;
            if !entry.state.members.iter().any(|m| m == member_id) {
                return Ok(entry.state.clone());
            }
            entry
                .state
                .members
                .iter()
                .filter(|m| m.as_str() != member_id)
                .cloned()
                .collect::<Vec<_>>()
        };
        self.update_team_state(
            team_id,
            "system",
            TeamStateChanges {
                members: Some(members),
                shared_context: None,
            },
            now_ms,
        )
        .await
    }

    /// Sugar over `update_team_state` touching only shared context.
    pub async fn update_shared_context(
        &self,
        team_id: &TeamId,
        updater_id: impl Into<String>,
        partial_context: HashMap<String, serde_json::Value>,
        now_ms: u64,
    ) -> Result<TeamState, TeamError> {
        self.update_team_state(
            team_id,
            updater_id,
            TeamStateChanges::shared_context_only(partial_context),
            now_ms,
        )
        .await
    }

    /// Most recent `limit` history entries (default all), oldest first.
    /// Empty for an unknown team.
    pub async fn get_team_update_history(
        &self,
        team_id: &TeamId,
        limit: Option<usize>,
    ) -> Vec<TeamUpdateRecord> {
        let teams = self.teams.read().await;
        let Some(entry) = teams.get(team_id) else {
            return Vec::new();
        };
        match limit {
            Some(limit) if limit < entry.history.len() => {
                entry.history[entry.history.len() - limit..].to_vec()
            }
            _ => entry.history.clone(),
        }
    }

    /// Fetch the current state for a team, if it exists.
    pub async fn get_team_state(&self, team_id: &TeamId) -> Option<TeamState> {
        self.teams.read().await.get(team_id).map(|e| e.state.clone())
    }

    /// Purge a team's state and history. Returns `false` if unknown.
    pub async fn delete_team_state(&self, team_id: &TeamId, now_ms: u64) -> bool {
        let removed = self.teams.write().await.remove(team_id).is_some();
        if removed {
            self.emit(
                "teamDeleted",
                serde_json::json!({ "team_id": team_id.as_str() }),
                now_ms,
            )
            .await;
        }
        removed
    }
}

impl Default for TeamStateManager {
    fn default() -> Self {
        Self::new()
    }
}

fn dedup_preserve_order(members: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    members.into_iter().filter(|m| seen.insert(m.clone())).collect()
}
