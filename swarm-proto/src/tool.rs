//! The `Tool` protocol boundary gated by `Validator` and invoked through
//! `ErrorRecoveryManager`.

use async_trait::async_trait;

/// A tool an agent can invoke. `validate_parameters` is synchronous and may
/// itself fail (a thrown/returned error is treated as "invalid" by the
/// validator, not propagated as a panic).
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's name, used in error messages and fidelity events.
    fn name(&self) -> &str;
    /// A coarse category for the tool (e.g. "shell", "http", "fs").
    fn tool_type(&self) -> &str;
    /// The tool's version string.
    fn version(&self) -> &str;

    /// Structurally validate `params` before execution.
    ///
    /// `Ok(true)` — valid. `Ok(false)` — structurally rejected. `Err(_)` —
    /// the validator itself failed; the caller treats this the same as
    /// `Ok(false)` but with a distinct error message.
    fn validate_parameters(&self, params: &serde_json::Value) -> Result<bool, String>;

    /// Execute the tool. Errors here are what `ErrorRecoveryManager` retries.
    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value, String>;
}
