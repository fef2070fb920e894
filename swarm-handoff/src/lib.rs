//! # swarm-handoff — the handoff state machine (spec §4.9)
//!
//! Composes [`swarm_validate::Validator`], [`swarm_context::ContextPreservationStore`],
//! and [`swarm_recovery`]'s retry/fallback primitives into the single
//! `handoff()` algorithm, tracking each handoff through
//! `Init -> Validated -> Preserved -> Executing ->
//! (Succeeded | FallingBack -> (FallbackSucceeded | RolledBack | Failed))`.

#![deny(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use swarm_context::ContextPreservationStore;
use swarm_proto::{HandoffError, HandoffId, HandoffRequest, HandoffState, Tool};
use swarm_recovery::{ErrorRecoveryManager, FallbackRegistry, RetryOptions};
use swarm_validate::Validator;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Composes validation, context preservation, retry, and fallback into the
/// single-call handoff algorithm, tracking each handoff's state machine.
pub struct HandoffCoordinator {
    validator: Arc<Validator>,
    context_store: Arc<ContextPreservationStore>,
    recovery: Arc<ErrorRecoveryManager>,
    fallback: Arc<FallbackRegistry>,
    states: RwLock<HashMap<HandoffId, HandoffState>>,
}

impl HandoffCoordinator {
    /// Build a coordinator over its four primitives.
    pub fn new(
        validator: Arc<Validator>,
        context_store: Arc<ContextPreservationStore>,
        recovery: Arc<ErrorRecoveryManager>,
        fallback: Arc<FallbackRegistry>,
    ) -> Self {
        Self {
            validator,
            context_store,
            recovery,
            fallback,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// The last recorded state for a handoff, if the coordinator has seen it.
    pub async fn get_handoff_state(&self, handoff_id: &HandoffId) -> Option<HandoffState> {
        self.states.read().await.get(handoff_id).copied()
    }

    async fn set_state(&self, handoff_id: &HandoffId, state: HandoffState) {
        self.states.write().await.insert(handoff_id.clone(), state);
        tracing::debug!(handoff_id = %handoff_id, ?state, "handoff state transition");
    }

    /// Run a handoff to completion. `handoff_id` is used verbatim if given,
    /// otherwise a fresh id is generated. `target_tool` is the tool invoked
    /// (with retry) to carry out the handoff on the target agent's behalf.
    pub async fn handoff(
        &self,
        req: HandoffRequest,
        handoff_id: Option<HandoffId>,
        target_tool: &dyn Tool,
        retry_opts: RetryOptions,
        cancel: &CancellationToken,
        now_ms: u64,
    ) -> Result<serde_json::Value, HandoffError> {
        let handoff_id = handoff_id.unwrap_or_else(|| HandoffId::new(Uuid::new_v4().to_string()));
        let span = tracing::info_span!(
            "handoff",
            handoff_id = %handoff_id,
            source_agent = %req.source_agent_id,
            target_agent = %req.target_agent_id,
        );
        self.handoff_inner(req, handoff_id, target_tool, retry_opts, cancel, now_ms)
            .instrument(span)
            .await
    }

    async fn handoff_inner(
        &self,
        req: HandoffRequest,
        handoff_id: HandoffId,
        target_tool: &dyn Tool,
        retry_opts: RetryOptions,
        cancel: &CancellationToken,
        now_ms: u64,
    ) -> Result<serde_json::Value, HandoffError> {
        self.set_state(&handoff_id, HandoffState::Init).await;

        let validation = self.validator.validate_handoff_request(&req);
        if !validation.is_valid {
            self.set_state(&handoff_id, HandoffState::Failed).await;
            return Err(HandoffError::InvalidHandoff(validation.errors));
        }
        self.set_state(&handoff_id, HandoffState::Validated).await;

        self.context_store
            .preserve_context(handoff_id.as_str(), &req.context, now_ms)
            .await?;
        self.set_state(&handoff_id, HandoffState::Preserved).await;

        self.set_state(&handoff_id, HandoffState::Executing).await;
        let tool_params = serde_json::json!({
            "handoff_id": handoff_id.as_str(),
            "source_agent_id": req.source_agent_id,
            "target_agent_id": req.target_agent_id,
            "task_id": req.task_id,
            "context": req.context,
        });

        let primary_result = self
            .recovery
            .execute_tool_with_retry(target_tool, tool_params.clone(), retry_opts, cancel, now_ms)
            .await;

        let primary_err = match primary_result {
            Ok(result) => {
                self.set_state(&handoff_id, HandoffState::Succeeded).await;
                return Ok(result);
            }
            Err(err) => err,
        };

        self.set_state(&handoff_id, HandoffState::FallingBack).await;
        let fallback_result = self
            .fallback
            .execute_with_fallback(
                "handoff",
                |params| async move { target_tool.execute(params).await },
                tool_params,
                now_ms,
            )
            .await;

        match fallback_result {
            Ok(result) => {
                self.set_state(&handoff_id, HandoffState::FallbackSucceeded).await;
                Ok(result)
            }
            Err(fallback_err) => {
                if let Err(rollback_err) =
                    self.context_store.rollback_context(handoff_id.as_str(), now_ms).await
                {
                    self.set_state(&handoff_id, HandoffState::Failed).await;
                    return Err(HandoffError::HandoffFailed(format!(
                        "primary: {primary_err}; fallback: {fallback_err}; rollback: {rollback_err}"
                    )));
                }
                self.set_state(&handoff_id, HandoffState::RolledBack).await;
                Err(HandoffError::HandoffFailed(format!(
                    "primary: {primary_err}; fallback: {fallback_err}"
                )))
            }
        }
    }
}
