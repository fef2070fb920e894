//! The `FallbackProvider` protocol boundary consulted by `FallbackRegistry`.

use async_trait::async_trait;

/// The result of a fallback provider's `execute`.
#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    /// Whether the fallback succeeded.
    pub success: bool,
    /// The result payload, present when `success` is `true`.
    pub result: Option<serde_json::Value>,
    /// The failure reason, present when `success` is `false`.
    pub error: Option<String>,
}

impl FallbackOutcome {
    /// A successful outcome carrying `result`.
    pub fn success(result: serde_json::Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// A failed outcome carrying `error`.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// A pluggable strategy invoked when a primary execution path is exhausted.
///
/// Multiple providers may be registered; the registry picks the first
/// (in registration order) whose `can_handle` returns `true` for a given
/// operation label — this is deterministic, not best-match.
#[async_trait]
pub trait FallbackProvider: Send + Sync {
    /// Whether this provider can service the given operation label.
    fn can_handle(&self, operation_label: &str) -> bool;

    /// Execute the fallback strategy.
    async fn execute(&self, operation_label: &str, params: serde_json::Value) -> FallbackOutcome;
}
