//! A minimal, single-point hook pipeline around tool execution.
//!
//! Reuses `neuron-hooks::HookRegistry`'s ordered-pipeline-with-short-circuit
//! shape: hooks run in registration order, the first one to return anything
//! other than `Continue` wins, and a hook error is logged and treated as
//! `Continue` rather than aborting the call. Scoped down to the one point
//! `ErrorRecoveryManager` actually needs — before a tool call, with the
//! option to skip it or rewrite its parameters.

use async_trait::async_trait;
use std::sync::Arc;

/// Context available to a hook immediately before a tool call.
#[derive(Debug, Clone)]
pub struct PreToolExecuteContext {
    /// The tool about to be invoked.
    pub tool_name: String,
    /// The parameters about to be passed to it.
    pub params: serde_json::Value,
}

/// What a hook decides to do about the pending tool call.
#[derive(Debug, Clone)]
pub enum HookAction {
    /// Proceed with the call as requested.
    Continue,
    /// Don't call the tool; treat it as skipped for the given reason.
    Skip {
        /// Why the call was skipped.
        reason: String,
    },
    /// Call the tool, but with these parameters instead.
    ModifyInput {
        /// The replacement parameters.
        new_params: serde_json::Value,
    },
}

/// A hook observing (and optionally intervening in) tool execution.
#[async_trait]
pub trait ToolHook: Send + Sync {
    /// Called before a tool is executed. An `Err` is logged and treated as
    /// `Continue` — a misbehaving hook never blocks a call outright.
    async fn on_pre_tool_execute(&self, ctx: &PreToolExecuteContext) -> Result<HookAction, String>;
}

/// An ordered pipeline of [`ToolHook`]s, dispatched in registration order.
#[derive(Default)]
pub struct HookPipeline {
    hooks: Vec<Arc<dyn ToolHook>>,
}

impl HookPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Add a hook to the end of the pipeline.
    pub fn add(&mut self, hook: Arc<dyn ToolHook>) {
        self.hooks.push(hook);
    }

    /// Dispatch `ctx` through the pipeline. Stops at the first hook that
    /// returns other than `Continue`.
    pub async fn dispatch(&self, ctx: &PreToolExecuteContext) -> HookAction {
        for hook in &self.hooks {
            match hook.on_pre_tool_execute(ctx).await {
                Ok(HookAction::Continue) => continue,
                Ok(action) => return action,
                Err(err) => {
                    tracing::warn!(tool = %ctx.tool_name, error = %err, "tool hook failed");
                    continue;
                }
            }
        }
        HookAction::Continue
    }
}
