//! # swarm-validate — structural validation (spec §4.4)
//!
//! Pure, synchronous checks with no I/O and no shared state — every function
//! here is a referentially transparent `&self -> ValidationResult` call, the
//! same shape layer0's `Turn`/`Lifecycle` invariants are checked with before
//! a value is allowed further into the pipeline.

#![deny(missing_docs)]

use swarm_proto::{CrossLanguageEvent, HandoffRequest, ModeSet, ModeTransitionRequest, Tool};

/// The outcome of a structural validation check: a boolean verdict plus the
/// human-readable reasons for any failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the input passed every check.
    pub is_valid: bool,
    /// Failure reasons, empty iff `is_valid`.
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    fn fail(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Structural validator, configured once with the closed set of valid modes.
pub struct Validator {
    modes: ModeSet,
}

impl Validator {
    /// Build a validator with the given closed mode set.
    pub fn new(modes: ModeSet) -> Self {
        Self { modes }
    }

    /// Build a validator with the conventional default mode set.
    pub fn with_default_modes() -> Self {
        Self::new(ModeSet::default_modes())
    }

    /// Validate a tool invocation's parameters against the tool's own
    /// `validate_parameters`. `params` must be present (not `Value::Null`).
    pub fn validate_tool_execution(
        &self,
        tool: &dyn Tool,
        params: &serde_json::Value,
    ) -> ValidationResult {
        if params.is_null() {
            return ValidationResult::fail(vec![format!(
                "Tool {} validation failed: parameters must not be null",
                tool.name()
            )]);
        }
        match tool.validate_parameters(params) {
            Ok(true) => ValidationResult::ok(),
            Ok(false) => ValidationResult::fail(vec![format!(
                "Tool {} reported invalid parameters",
                tool.name()
            )]),
            Err(msg) => ValidationResult::fail(vec![format!(
                "Tool {} validation threw error: {msg}",
                tool.name()
            )]),
        }
    }

    /// Validate that a handoff request names all four required fields.
    pub fn validate_handoff_request(&self, req: &HandoffRequest) -> ValidationResult {
        let mut errors = Vec::new();
        if req.source_agent_id.is_empty() {
            errors.push("sourceAgentId must be a non-empty string".to_string());
        }
        if req.target_agent_id.is_empty() {
            errors.push("targetAgentId must be a non-empty string".to_string());
        }
        if req.task_id.is_empty() {
            errors.push("taskId must be a non-empty string".to_string());
        }
        if req.context.is_null() {
            errors.push("context must be present".to_string());
        }
        if errors.is_empty() {
            ValidationResult::ok()
        } else {
            ValidationResult::fail(errors)
        }
    }

    /// Validate a mode transition: both modes must be members of the closed
    /// mode set and must differ.
    pub fn validate_mode_transition(&self, req: &ModeTransitionRequest) -> ValidationResult {
        let mut errors = Vec::new();
        if req.from_mode.is_empty() || !self.modes.contains(&req.from_mode) {
            errors.push(format!("fromMode \"{}\" is not a known mode", req.from_mode));
        }
        if req.to_mode.is_empty() || !self.modes.contains(&req.to_mode) {
            errors.push(format!("toMode \"{}\" is not a known mode", req.to_mode));
        }
        if req.from_mode == req.to_mode && errors.is_empty() {
            errors.push("fromMode and toMode must differ".to_string());
        }
        if errors.is_empty() {
            ValidationResult::ok()
        } else {
            ValidationResult::fail(errors)
        }
    }

    /// Validate an event arriving at a cross-language boundary, before its
    /// payload has been decoded.
    pub fn validate_cross_language_event(&self, ev: &CrossLanguageEvent) -> ValidationResult {
        let mut errors = Vec::new();
        if ev.id.is_empty() {
            errors.push("id must be a non-empty string".to_string());
        }
        if ev.event_type.is_empty() {
            errors.push("type must be a non-empty string".to_string());
        }
        if ev.source.is_empty() {
            errors.push("source must be a non-empty string".to_string());
        }
        if !ev.timestamp.is_finite() {
            errors.push("timestamp must be a finite number".to_string());
        }
        if errors.is_empty() {
            ValidationResult::ok()
        } else {
            ValidationResult::fail(errors)
        }
    }
}
