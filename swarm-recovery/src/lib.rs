//! # swarm-recovery — retry, fallback, and graceful degradation (spec §4.5/§4.6)
//!
//! `ErrorRecoveryManager` wraps a single call with bounded exponential
//! backoff and jitter, optionally consulting a [`hooks::HookPipeline`]
//! before each attempt; `FallbackRegistry` runs the same
//! ordered-first-match dispatch `neuron-hooks::HookRegistry` uses for hooks,
//! here picking a fallback provider instead of a hook action.

#![deny(missing_docs)]

pub mod hooks;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use swarm_bus::EventBus;
use swarm_proto::{
    DurationMs, Event, FallbackError, FallbackOutcome, FallbackProvider, RecoveryError, Tool,
};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::hooks::{HookAction, HookPipeline, PreToolExecuteContext};

/// Retry policy for a single `ErrorRecoveryManager` call.
#[derive(Debug, Clone, Copy)]
pub struct RetryOptions {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Base delay in milliseconds; actual delay is
    /// `base_delay_ms * 2^attempt`, jittered by ±20%.
    pub base_delay_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 100,
        }
    }
}

fn jittered_backoff(base_delay_ms: u64, attempt: u32) -> Duration {
    let nominal = base_delay_ms.saturating_mul(1u64 << attempt.min(32));
    let jitter_fraction = rand::thread_rng().gen_range(-0.2..=0.2);
    let jittered = (nominal as f64) * (1.0 + jitter_fraction);
    Duration::from_millis(jittered.max(0.0) as u64)
}

/// Retries tool execution and cross-language calls with exponential
/// backoff, emitting bus events for each attempt.
pub struct ErrorRecoveryManager {
    bus: Option<Arc<EventBus>>,
    hooks: Option<HookPipeline>,
}

impl ErrorRecoveryManager {
    /// Create a manager with no attached bus.
    pub fn new() -> Self {
        Self {
            bus: None,
            hooks: None,
        }
    }

    /// Create a manager that publishes its lifecycle events onto `bus`.
    pub fn with_bus(bus: Arc<EventBus>) -> Self {
        Self {
            bus: Some(bus),
            hooks: None,
        }
    }

    /// Attach a hook pipeline, consulted before every tool call in
    /// [`Self::execute_tool_with_retry`].
    pub fn with_hooks(mut self, hooks: HookPipeline) -> Self {
        self.hooks = Some(hooks);
        self
    }

    async fn emit(&self, event_type: &str, payload: serde_json::Value, now_ms: u64) {
        if let Some(bus) = &self.bus {
            bus.publish(Event::new(
                format!("{event_type}-{now_ms}"),
                event_type,
                DurationMs::from_millis(now_ms),
                "error_recovery_manager",
                payload,
            ))
            .await;
        }
    }

    async fn sleep_or_cancel(
        &self,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), RecoveryError> {
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = cancel.cancelled() => Err(RecoveryError::Cancelled),
        }
    }

    /// Execute `tool` with `params`, retrying on failure per `opts`. If a
    /// hook pipeline is attached (see [`Self::with_hooks`]), it is
    /// consulted before each attempt: `Skip` short-circuits the call
    /// without invoking `tool` and emits `tool.execution.skipped` instead;
    /// `ModifyInput` substitutes the parameters for that attempt only, the
    /// next attempt is dispatched fresh from the original `params`. Emits
    /// `tool.execution.failed` on each failed attempt and
    /// `tool.execution.completed` once, on success.
    pub async fn execute_tool_with_retry(
        &self,
        tool: &dyn Tool,
        params: serde_json::Value,
        opts: RetryOptions,
        cancel: &CancellationToken,
        now_ms: u64,
    ) -> Result<serde_json::Value, RecoveryError> {
        let mut last_err = String::new();
        for attempt in 0..=opts.max_retries {
            if cancel.is_cancelled() {
                return Err(RecoveryError::Cancelled);
            }

            let mut call_params = params.clone();
            if let Some(pipeline) = &self.hooks {
                let ctx = PreToolExecuteContext {
                    tool_name: tool.name().to_string(),
                    params: call_params.clone(),
                };
                match pipeline.dispatch(&ctx).await {
                    HookAction::Continue => {}
                    HookAction::ModifyInput { new_params } => call_params = new_params,
                    HookAction::Skip { reason } => {
                        self.emit(
                            "tool.execution.skipped",
                            serde_json::json!({ "tool": tool.name(), "reason": reason }),
                            now_ms,
                        )
                        .await;
                        return Ok(serde_json::json!({
                            "skipped": true,
                            "tool": tool.name(),
                            "reason": reason,
                        }));
                    }
                }
            }

            match tool.execute(call_params).await {
                Ok(result) => {
                    self.emit(
                        "tool.execution.completed",
                        serde_json::json!({ "tool": tool.name(), "attempts": attempt + 1 }),
                        now_ms,
                    )
                    .await;
                    return Ok(result);
                }
                Err(err) => {
                    tracing::warn!(tool = %tool.name(), attempt, error = %err, "tool execution failed");
                    self.emit(
                        "tool.execution.failed",
                        serde_json::json!({
                            "tool": tool.name(),
                            "attempt": attempt + 1,
                            "error": err,
                        }),
                        now_ms,
                    )
                    .await;
                    last_err = err;
                    if attempt == opts.max_retries {
                        break;
                    }
                    self.sleep_or_cancel(jittered_backoff(opts.base_delay_ms, attempt), cancel)
                        .await?;
                }
            }
        }
        Err(RecoveryError::ToolExecutionFailed {
            attempts: opts.max_retries + 1,
            source: last_err,
        })
    }

    /// Run `primary` under the same retry policy as
    /// [`Self::execute_tool_with_retry`]; if retries are exhausted, run
    /// `fallback` once (not retried). Emits `cross.language.received` on
    /// either success path, `cross.language.failed` if both fail.
    pub async fn execute_handoff_with_fallback<F1, Fut1, F2, Fut2>(
        &self,
        mut primary: F1,
        fallback: F2,
        opts: RetryOptions,
        cancel: &CancellationToken,
        now_ms: u64,
    ) -> Result<serde_json::Value, RecoveryError>
    where
        F1: FnMut() -> Fut1,
        Fut1: Future<Output = Result<serde_json::Value, String>>,
        F2: FnOnce() -> Fut2,
        Fut2: Future<Output = Result<serde_json::Value, String>>,
    {
        let mut last_err = String::new();
        for attempt in 0..=opts.max_retries {
            if cancel.is_cancelled() {
                return Err(RecoveryError::Cancelled);
            }
            match primary().await {
                Ok(result) => {
                    self.emit(
                        "cross.language.received",
                        serde_json::json!({ "via": "primary", "attempts": attempt + 1 }),
                        now_ms,
                    )
                    .await;
                    return Ok(result);
                }
                Err(err) => {
                    last_err = err;
                    if attempt == opts.max_retries {
                        break;
                    }
                    self.sleep_or_cancel(jittered_backoff(opts.base_delay_ms, attempt), cancel)
                        .await?;
                }
            }
        }

        match fallback().await {
            Ok(result) => {
                self.emit(
                    "cross.language.received",
                    serde_json::json!({ "via": "fallback" }),
                    now_ms,
                )
                .await;
                Ok(result)
            }
            Err(fallback_err) => {
                self.emit(
                    "cross.language.failed",
                    serde_json::json!({ "primary_error": last_err, "fallback_error": fallback_err }),
                    now_ms,
                )
                .await;
                Err(RecoveryError::CrossLanguageFailed(format!(
                    "primary: {last_err}; fallback: {fallback_err}"
                )))
            }
        }
    }
}

impl Default for ErrorRecoveryManager {
    fn default() -> Self {
        Self::new()
    }
}

struct CannedProvider {
    name: &'static str,
}

#[async_trait]
impl FallbackProvider for CannedProvider {
    fn can_handle(&self, operation_label: &str) -> bool {
        operation_label == self.name
    }

    async fn execute(&self, operation_label: &str, _params: serde_json::Value) -> FallbackOutcome {
        FallbackOutcome::success(serde_json::json!({
            "success": true,
            "result": format!("Degraded result for {operation_label}"),
            "degraded": true,
        }))
    }
}

/// Selects and invokes the first registered provider that can service a
/// failed operation, in registration order. Seeded at construction with the
/// `agent-tool-local`, `handoff-simplified`, and `mode-switch-cache`
/// providers.
pub struct FallbackRegistry {
    providers: RwLock<Vec<(String, Arc<dyn FallbackProvider>)>>,
    bus: Option<Arc<EventBus>>,
}

/// The default fallback providers registered at construction.
pub const DEFAULT_PROVIDER_NAMES: [&str; 3] =
    ["agent-tool-local", "handoff-simplified", "mode-switch-cache"];

impl FallbackRegistry {
    fn seeded(bus: Option<Arc<EventBus>>) -> Self {
        let providers = DEFAULT_PROVIDER_NAMES
            .iter()
            .map(|&name| {
                (
                    name.to_string(),
                    Arc::new(CannedProvider { name }) as Arc<dyn FallbackProvider>,
                )
            })
            .collect();
        Self {
            providers: RwLock::new(providers),
            bus,
        }
    }

    /// Create a registry seeded with the default providers and no bus.
    pub fn new() -> Self {
        Self::seeded(None)
    }

    /// Create a registry seeded with the default providers, publishing its
    /// lifecycle events onto `bus`.
    pub fn with_bus(bus: Arc<EventBus>) -> Self {
        Self::seeded(Some(bus))
    }

    async fn emit(&self, event_type: &str, payload: serde_json::Value, now_ms: u64) {
        if let Some(bus) = &self.bus {
            bus.publish(Event::new(
                format!("{event_type}-{now_ms}"),
                event_type,
                DurationMs::from_millis(now_ms),
                "fallback_registry",
                payload,
            ))
            .await;
        }
    }

    /// Register a named provider. If a provider is already registered under
    /// `name`, it is replaced in place (same position).
    pub async fn register_fallback_provider(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn FallbackProvider>,
    ) {
        let name = name.into();
        let mut providers = self.providers.write().await;
        if let Some(slot) = providers.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = provider;
        } else {
            providers.push((name, provider));
        }
    }

    /// Remove a provider by name. Returns `false` if it wasn't registered.
    pub async fn remove_fallback_provider(&self, name: &str) -> bool {
        let mut providers = self.providers.write().await;
        let before = providers.len();
        providers.retain(|(n, _)| n != name);
        providers.len() != before
    }

    /// The names of currently registered providers, in registration order.
    pub async fn get_registered_providers(&self) -> Vec<String> {
        self.providers.read().await.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Run `primary` against `params`; on failure, dispatch to the first
    /// registered provider whose `can_handle(operation_label)` returns
    /// `true`.
    pub async fn execute_with_fallback<F, Fut>(
        &self,
        operation_label: &str,
        primary: F,
        params: serde_json::Value,
        now_ms: u64,
    ) -> Result<serde_json::Value, FallbackError>
    where
        F: FnOnce(serde_json::Value) -> Fut,
        Fut: Future<Output = Result<serde_json::Value, String>>,
    {
        match primary(params.clone()).await {
            Ok(result) => {
                self.emit(
                    "operation.executed",
                    serde_json::json!({ "operation": operation_label }),
                    now_ms,
                )
                .await;
                return Ok(result);
            }
            Err(primary_err) => {
                tracing::warn!(operation = operation_label, error = %primary_err, "primary executor failed");
                self.emit(
                    "operation.fallback.initiated",
                    serde_json::json!({ "operation": operation_label, "error": primary_err }),
                    now_ms,
                )
                .await;
            }
        }

        let selected = {
            let providers = self.providers.read().await;
            providers
                .iter()
                .find(|(_, p)| p.can_handle(operation_label))
                .map(|(_, p)| Arc::clone(p))
        };

        match selected {
            Some(provider) => {
                let outcome = provider.execute(operation_label, params).await;
                if outcome.success {
                    self.emit(
                        "operation.fallback.succeeded",
                        serde_json::json!({ "operation": operation_label }),
                        now_ms,
                    )
                    .await;
                    Ok(outcome.result.unwrap_or(serde_json::Value::Null))
                } else {
                    let reason = outcome.error.unwrap_or_default();
                    self.emit(
                        "operation.fallback.failed",
                        serde_json::json!({ "operation": operation_label, "reason": reason }),
                        now_ms,
                    )
                    .await;
                    Err(FallbackError::FallbackFailed {
                        operation_label: operation_label.to_string(),
                        reason,
                    })
                }
            }
            None => {
                self.emit(
                    "operation.failed.permanently",
                    serde_json::json!({ "operation": operation_label }),
                    now_ms,
                )
                .await;
                Err(FallbackError::NoFallback(operation_label.to_string()))
            }
        }
    }

    /// A canned degraded-mode result for `subsystem`/`tool_name`, emitting
    /// `<subsystem>.degraded`.
    pub async fn degraded_result(
        &self,
        subsystem: &str,
        tool_name: &str,
        now_ms: u64,
    ) -> swarm_proto::Degraded<serde_json::Value> {
        self.emit(
            &format!("{subsystem}.degraded"),
            serde_json::json!({ "tool": tool_name }),
            now_ms,
        )
        .await;
        swarm_proto::Degraded::new(
            subsystem,
            serde_json::json!({
                "success": true,
                "result": format!("Degraded result for {tool_name}"),
                "degraded": true,
            }),
        )
    }
}

impl Default for FallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
