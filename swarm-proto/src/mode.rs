//! The mode-transition request type. The set of valid modes is a
//! configuration input enumerated at construction (spec §4.4), not a fixed
//! Rust enum — different deployments may wire up different persona modes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A requested transition from one mode to another.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeTransitionRequest {
    /// The mode being left.
    pub from_mode: String,
    /// The mode being entered.
    pub to_mode: String,
    /// Optional human-readable reason for the transition.
    pub reason: Option<String>,
}

impl ModeTransitionRequest {
    /// Construct a new mode transition request.
    pub fn new(from_mode: impl Into<String>, to_mode: impl Into<String>) -> Self {
        Self {
            from_mode: from_mode.into(),
            to_mode: to_mode.into(),
            reason: None,
        }
    }

    /// Attach a reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// A closed set of valid modes, fixed at construction time.
#[derive(Debug, Clone)]
pub struct ModeSet {
    modes: HashSet<String>,
}

impl ModeSet {
    /// Build a mode set from an iterator of mode names.
    pub fn new(modes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            modes: modes.into_iter().map(Into::into).collect(),
        }
    }

    /// The conventional default mode set for a pair-programming orchestrator.
    pub fn default_modes() -> Self {
        Self::new(["ask", "code", "review", "debug"])
    }

    /// Whether `mode` is a member of this set.
    pub fn contains(&self, mode: &str) -> bool {
        self.modes.contains(mode)
    }
}
