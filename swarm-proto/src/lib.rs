//! # swarm-proto — protocol types for the agent orchestration core
//!
//! This crate defines the data model (spec §3) and error vocabulary (spec §7)
//! shared by every other `swarm-*` crate, plus the two protocol boundaries
//! that are pure traits with no single canonical implementation: [`Tool`]
//! and [`FallbackProvider`] (and the external [`SandboxProvider`] contract).
//!
//! No behavior lives here — this crate is the vocabulary every component
//! builds on, the same role `layer0` plays for the wider framework this
//! core composes with.

#![deny(missing_docs)]

pub mod context;
pub mod degraded;
pub mod duration;
pub mod error;
pub mod event;
pub mod fallback;
pub mod fidelity;
pub mod handoff;
pub mod id;
pub mod mode;
pub mod sandbox;
pub mod team;
pub mod tool;

pub use context::{ContextStatistics, PreservedContext};
pub use degraded::Degraded;
pub use duration::DurationMs;
pub use error::{
    ContextError, FallbackError, HandoffError, OrchError, RecoveryError, SandboxError, TeamError,
};
pub use event::{CrossLanguageEvent, Event};
pub use fallback::{FallbackOutcome, FallbackProvider};
pub use fidelity::{FidelityCategory, FidelityCounter};
pub use handoff::{HandoffRequest, HandoffState};
pub use id::{AgentId, HandoffId, SandboxId, TaskId, TeamId};
pub use mode::{ModeSet, ModeTransitionRequest};
pub use sandbox::{
    CommandOutput, ExecutionResult, Language, PackageManager, Sandbox, SandboxHandle,
    SandboxProvider,
};
pub use team::{TeamState, TeamStateChanges, TeamUpdateRecord, DEFAULT_MAX_HISTORY_PER_TEAM};
pub use tool::Tool;
