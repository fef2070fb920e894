//! Error vocabulary, one enum per component boundary (spec §7's "kinds" made
//! concrete). No shared umbrella error — each component owns its failure
//! modes, the same way `layer0::error` keeps `OrchError`/`StateError`/
//! `EnvError` separate instead of collapsing them into one `Error` type.

use thiserror::Error;

/// Errors from `ContextPreservationStore`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ContextError {
    /// The context would lose semantics if serialized (cycles, executables).
    #[error("serialization error: {0}")]
    Serialization(String),
    /// No preserved context exists for the given handoff id.
    #[error("not found: {0}")]
    NotFound(String),
    /// The recomputed checksum does not match the stored checksum.
    #[error("integrity check failed for handoff {handoff_id}: expected {expected}, got {actual}")]
    Integrity {
        /// The handoff whose context failed integrity verification.
        handoff_id: String,
        /// The checksum recorded at preserve time.
        expected: String,
        /// The checksum recomputed at restore time.
        actual: String,
    },
    /// Rollback failed while emitting its completion event.
    #[error("rollback failed: {0}")]
    Rollback(String),
}

/// Errors from `TeamStateManager`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TeamError {
    /// `createTeamState` called with an id that already exists.
    #[error("team already exists: {0}")]
    AlreadyExists(String),
    /// Operation referenced an unknown team id.
    #[error("team not found: {0}")]
    NotFound(String),
}

/// Errors from `ErrorRecoveryManager`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Retries were exhausted without success.
    #[error("tool execution failed after {attempts} attempt(s): {source}")]
    ToolExecutionFailed {
        /// Number of attempts made (including the first).
        attempts: u32,
        /// The last underlying error.
        source: String,
    },
    /// Primary and fallback both failed for a handoff-with-fallback call.
    #[error("cross-language operation failed: {0}")]
    CrossLanguageFailed(String),
    /// The operation was cancelled before completion.
    #[error("cancelled")]
    Cancelled,
}

/// Errors from `FallbackRegistry`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FallbackError {
    /// The primary executor and the selected fallback provider both failed.
    #[error("fallback failed for {operation_label}: {reason}")]
    FallbackFailed {
        /// The operation label the fallback was selected for.
        operation_label: String,
        /// The fallback provider's failure reason.
        reason: String,
    },
    /// No registered provider's `can_handle` matched the operation label.
    #[error("no fallback registered for {0}")]
    NoFallback(String),
}

/// Errors from `SandboxManager`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The concurrency ceiling was reached; admission was refused.
    #[error("concurrency limit reached: {0}")]
    ConcurrencyLimitReached(usize),
    /// The requested language is not in the supported set.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    /// The requested package manager is not in the supported set.
    #[error("unsupported package manager: {0}")]
    UnsupportedPackageManager(String),
    /// A file operation against the sandbox failed.
    #[error("failed to {operation}: {reason}")]
    FileOperationFailed {
        /// The operation that failed, e.g. "create_file", "read_file".
        operation: String,
        /// The underlying provider error message.
        reason: String,
    },
    /// The sandbox execution exceeded its timeout.
    #[error("execution timed out after {0}ms")]
    Timeout(u64),
    /// The operation was cancelled before or during execution.
    #[error("cancelled")]
    Cancelled,
    /// The sandbox provider reported an error.
    #[error("provider error: {0}")]
    Provider(String),
}

/// Errors from `HandoffCoordinator`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HandoffError {
    /// `validateHandoffRequest` failed.
    #[error("invalid handoff: {0:?}")]
    InvalidHandoff(Vec<String>),
    /// Preserving context before execution failed.
    #[error("context preservation failed: {0}")]
    ContextPreservation(#[from] ContextError),
    /// Both the primary execution and the fallback failed; context was
    /// rolled back.
    #[error("handoff failed: {0}")]
    HandoffFailed(String),
}

/// Errors from `OrchestratorCore`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OrchError {
    /// No persona registered under the requested name.
    #[error("persona not found: {0}")]
    PersonaNotFound(String),
    /// A workflow stage failed; `stage` names where execution stopped.
    #[error("workflow stopped at stage {stage}: {reason}")]
    WorkflowStopped {
        /// The stage name where the workflow halted.
        stage: String,
        /// The failure reason.
        reason: String,
    },
    /// A dependency (recovery, handoff, validation) reported a failure.
    #[error("{0}")]
    Dependency(String),
}
