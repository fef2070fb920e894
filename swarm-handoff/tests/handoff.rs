use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use swarm_context::ContextPreservationStore;
use swarm_proto::{FallbackOutcome, FallbackProvider, HandoffError, HandoffRequest, HandoffState, Tool};
use swarm_recovery::{ErrorRecoveryManager, FallbackRegistry, RetryOptions};
use swarm_handoff::HandoffCoordinator;
use swarm_validate::Validator;
use tokio_util::sync::CancellationToken;

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn tool_type(&self) -> &str {
        "local"
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn validate_parameters(&self, _params: &serde_json::Value) -> Result<bool, String> {
        Ok(true)
    }
    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value, String> {
        Ok(params)
    }
}

struct AlwaysFailsTool;

#[async_trait]
impl Tool for AlwaysFailsTool {
    fn name(&self) -> &str {
        "always-fails"
    }
    fn tool_type(&self) -> &str {
        "local"
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn validate_parameters(&self, _params: &serde_json::Value) -> Result<bool, String> {
        Ok(true)
    }
    async fn execute(&self, _params: serde_json::Value) -> Result<serde_json::Value, String> {
        Err("target agent unreachable".to_string())
    }
}

struct CountingFailsTool {
    calls: AtomicU32,
}

#[async_trait]
impl Tool for CountingFailsTool {
    fn name(&self) -> &str {
        "counting-fails"
    }
    fn tool_type(&self) -> &str {
        "local"
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn validate_parameters(&self, _params: &serde_json::Value) -> Result<bool, String> {
        Ok(true)
    }
    async fn execute(&self, _params: serde_json::Value) -> Result<serde_json::Value, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("boom".to_string())
    }
}

struct HandoffFallbackProvider;

#[async_trait]
impl FallbackProvider for HandoffFallbackProvider {
    fn can_handle(&self, operation_label: &str) -> bool {
        operation_label == "handoff"
    }

    async fn execute(&self, _operation_label: &str, _params: serde_json::Value) -> FallbackOutcome {
        FallbackOutcome::success(serde_json::json!({ "via": "fallback" }))
    }
}

fn coordinator() -> HandoffCoordinator {
    HandoffCoordinator::new(
        Arc::new(Validator::with_default_modes()),
        Arc::new(ContextPreservationStore::new()),
        Arc::new(ErrorRecoveryManager::new()),
        Arc::new(FallbackRegistry::new()),
    )
}

fn fast_retry() -> RetryOptions {
    RetryOptions {
        max_retries: 1,
        base_delay_ms: 1,
    }
}

fn req() -> HandoffRequest {
    HandoffRequest::new("agent-a", "agent-b", "task-1", serde_json::json!({ "note": "carry me" }))
}

#[tokio::test]
async fn successful_handoff_reaches_succeeded_state() {
    let coord = coordinator();
    let cancel = CancellationToken::new();
    let result = coord
        .handoff(req(), None, &EchoTool, fast_retry(), &cancel, 0)
        .await
        .unwrap();
    assert_eq!(result["note"], "carry me");
}

#[tokio::test]
async fn invalid_request_is_rejected_before_context_is_touched() {
    let coord = coordinator();
    let cancel = CancellationToken::new();
    let bad_req = HandoffRequest::new("", "agent-b", "task-1", serde_json::json!({}));
    let handoff_id = swarm_proto::HandoffId::new("bad-handoff");
    let err = coord
        .handoff(bad_req, Some(handoff_id.clone()), &EchoTool, fast_retry(), &cancel, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, HandoffError::InvalidHandoff(errors) if !errors.is_empty()));
    assert_eq!(
        coord.get_handoff_state(&handoff_id).await,
        Some(HandoffState::Failed)
    );
}

#[tokio::test]
async fn primary_failure_falls_back_to_registered_provider() {
    let fallback = Arc::new(FallbackRegistry::new());
    fallback
        .register_fallback_provider("handoff", Arc::new(HandoffFallbackProvider))
        .await;
    let coord = HandoffCoordinator::new(
        Arc::new(Validator::with_default_modes()),
        Arc::new(ContextPreservationStore::new()),
        Arc::new(ErrorRecoveryManager::new()),
        fallback,
    );
    let cancel = CancellationToken::new();
    let handoff_id = swarm_proto::HandoffId::new("fallback-handoff");
    let result = coord
        .handoff(
            req(),
            Some(handoff_id.clone()),
            &AlwaysFailsTool,
            fast_retry(),
            &cancel,
            0,
        )
        .await
        .unwrap();
    assert_eq!(result["via"], "fallback");
    assert_eq!(
        coord.get_handoff_state(&handoff_id).await,
        Some(HandoffState::FallbackSucceeded)
    );
}

#[tokio::test]
async fn primary_and_fallback_failure_rolls_back_and_fails() {
    // The default-seeded registry has no provider that handles the
    // "handoff" operation label, so the fallback step itself fails.
    let coord = coordinator();
    let cancel = CancellationToken::new();
    let handoff_id = swarm_proto::HandoffId::new("rollback-handoff");
    let err = coord
        .handoff(
            req(),
            Some(handoff_id.clone()),
            &AlwaysFailsTool,
            fast_retry(),
            &cancel,
            0,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HandoffError::HandoffFailed(_)));
    assert_eq!(
        coord.get_handoff_state(&handoff_id).await,
        Some(HandoffState::RolledBack)
    );

    // Rollback evicted the preserved context; nothing left to restore.
    let context_store = ContextPreservationStore::new();
    let restored = context_store.restore_context(handoff_id.as_str(), 0).await;
    assert!(restored.is_err());
}

#[tokio::test]
async fn cancellation_stops_retries_and_still_reaches_a_terminal_state() {
    let tool = Arc::new(CountingFailsTool {
        calls: AtomicU32::new(0),
    });
    let coord = coordinator();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let handoff_id = swarm_proto::HandoffId::new("cancelled-handoff");
    let result = coord
        .handoff(req(), Some(handoff_id.clone()), tool.as_ref(), fast_retry(), &cancel, 0)
        .await;
    assert!(result.is_err());
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    let state = coord.get_handoff_state(&handoff_id).await.unwrap();
    assert!(state.is_terminal());
}

#[tokio::test]
async fn generated_handoff_id_is_used_when_none_supplied() {
    let coord = coordinator();
    let cancel = CancellationToken::new();
    coord
        .handoff(req(), None, &EchoTool, fast_retry(), &cancel, 0)
        .await
        .unwrap();
    // We never learn the generated id directly, but a second call with an
    // explicit id must not collide with whatever was generated for the
    // first, and both must independently resolve to a terminal state.
    let handoff_id = swarm_proto::HandoffId::new("explicit-handoff");
    coord
        .handoff(req(), Some(handoff_id.clone()), &EchoTool, fast_retry(), &cancel, 0)
        .await
        .unwrap();
    assert_eq!(
        coord.get_handoff_state(&handoff_id).await,
        Some(HandoffState::Succeeded)
    );
}
