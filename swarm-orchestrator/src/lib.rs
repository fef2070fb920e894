//! # swarm-orchestrator — persona resolution and pre-wired workflows (spec §4.10)
//!
//! `OrchestratorCore` resolves a persona by name (case-insensitive), and runs
//! one of the three pre-wired workflows over caller-supplied [`Tool`]s, each
//! stage invoked through [`ErrorRecoveryManager`] the same way
//! `neuron-orch-local::LocalOrch` dispatches to registered `Operator`s —
//! a `HashMap<String, _>` registry plus a thin dispatch method, no durable
//! workflow tracking.

#![deny(missing_docs)]

pub mod config;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use swarm_bus::EventBus;
use swarm_proto::{AgentId, DurationMs, Event, OrchError, Tool};
use swarm_recovery::{ErrorRecoveryManager, RetryOptions};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A named configuration of an agent's role, expertise, and prompt template
/// (spec §6's persona document).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// The persona's display name.
    pub name: String,
    /// A short human-readable description.
    pub description: String,
    /// The domains this persona is expected to be strong in.
    #[serde(default)]
    pub expertise_areas: Vec<String>,
    /// The static prompt template this persona is instantiated with.
    pub prompt_template: String,
    /// Optional per-area weighting for hybrid personas.
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
    /// Optional token-budget strategy.
    #[serde(default)]
    pub token_optimization: Option<TokenOptimization>,
}

/// A token-budget strategy applied while instantiating a persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenOptimization {
    /// No special handling.
    None,
    /// The conventional budget.
    Standard,
    /// Maximally aggressive trimming.
    Maximum,
}

/// The exit-code table from spec §6's conceptual CLI surface. No binary or
/// argument parser is built here — this is the vocabulary a future one would
/// use (see `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed normally.
    Success = 0,
    /// Structural validation failed.
    ValidationFailure = 1,
    /// Retries were exhausted with no fallback available.
    RecoveryExhausted = 2,
    /// Fallback was attempted and also failed, or none was registered.
    FallbackUnavailable = 3,
    /// A concurrency ceiling was hit, or an operation timed out.
    ConcurrencyOrTimeout = 4,
    /// A checksum/integrity check failed.
    IntegrityFailure = 5,
}

impl ExitCode {
    /// The numeric process exit code.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// The lifecycle status of a deployed agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Persona resolved; instantiation in progress.
    Initializing,
    /// The agent is ready to receive work.
    Active,
    /// Deployment could not complete.
    Failed,
}

/// The result of `/deploy <persona>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResult {
    /// The freshly minted id for this agent instance.
    pub agent_id: AgentId,
    /// The agent's lifecycle status.
    pub status: AgentStatus,
    /// The resolved persona's name.
    pub persona: String,
    /// Deployment-time metrics (currently empty; a hook point for callers).
    pub metrics: serde_json::Value,
}

/// The five deployment-workflow stage names, in pipeline order.
pub const DEPLOYMENT_STAGES: [&str; 5] =
    ["validator", "test", "reviewer", "deployer", "integrator"];

/// The outcome of a linear, stop-on-first-failure workflow (spec §4.10's
/// deployment workflow shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// Whether every stage completed successfully.
    pub success: bool,
    /// The stage names that completed successfully, in order.
    pub execution_path: Vec<String>,
    /// Accumulated error messages (one entry, the stage that failed).
    pub errors: Vec<String>,
    /// The stage name execution stopped at, if it failed.
    pub stage_stopped_at: Option<String>,
}

/// Per-iteration metrics from the testing workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestIterationMetrics {
    /// Zero-based iteration number.
    pub iteration: usize,
    /// The number of failures the test stage reported this iteration.
    pub failures: u64,
    /// The raw result the test tool returned.
    pub metrics: serde_json::Value,
}

/// The outcome of the iterate-until-converged testing workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestingWorkflowResult {
    /// Whether a zero-failure iteration was reached.
    pub success: bool,
    /// Per-iteration metrics, in order.
    pub iterations: Vec<TestIterationMetrics>,
    /// Why the loop stopped (`"zero_failures"`, `"max_iterations_reached"`,
    /// or a stage failure message).
    pub stopped_reason: String,
}

/// Resolves personas and runs the pre-wired workflows over them.
pub struct OrchestratorCore {
    personas: RwLock<HashMap<String, PersonaConfig>>,
    recovery: Arc<ErrorRecoveryManager>,
    bus: Option<Arc<EventBus>>,
}

impl OrchestratorCore {
    /// Build a core with an empty persona registry.
    pub fn new(recovery: Arc<ErrorRecoveryManager>) -> Self {
        Self {
            personas: RwLock::new(HashMap::new()),
            recovery,
            bus: None,
        }
    }

    /// Build a core that publishes deployment lifecycle events onto `bus`.
    pub fn with_bus(recovery: Arc<ErrorRecoveryManager>, bus: Arc<EventBus>) -> Self {
        Self {
            personas: RwLock::new(HashMap::new()),
            recovery,
            bus: Some(bus),
        }
    }

    async fn emit(&self, event_type: &str, payload: serde_json::Value, now_ms: u64) {
        if let Some(bus) = &self.bus {
            bus.publish(Event::new(
                format!("{event_type}-{now_ms}"),
                event_type,
                DurationMs::from_millis(now_ms),
                "orchestrator_core",
                payload,
            ))
            .await;
        }
    }

    /// Register or replace a persona under its own `name`, case-insensitively.
    pub async fn register_persona(&self, config: PersonaConfig) {
        let key = config.name.to_lowercase();
        self.personas.write().await.insert(key, config);
    }

    /// Load every persona from a parsed config document.
    pub async fn load_personas_from_config(&self, config: &config::OrchestratorConfig) {
        let mut personas = self.personas.write().await;
        for persona in config.personas.values() {
            personas.insert(persona.name.to_lowercase(), persona.clone());
        }
    }

    /// Resolve a persona by name, case-insensitively.
    pub async fn resolve_persona(&self, name: &str) -> Result<PersonaConfig, OrchError> {
        self.personas
            .read()
            .await
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| OrchError::PersonaNotFound(name.to_string()))
    }

    /// Resolve `persona_name` and instantiate it, returning its id and
    /// status. Emits `agent.deploy.initializing` then `agent.deploy.active`.
    pub async fn deploy_agent(
        &self,
        persona_name: &str,
        now_ms: u64,
    ) -> Result<DeployResult, OrchError> {
        let persona = self.resolve_persona(persona_name).await?;
        let agent_id = AgentId::new(Uuid::new_v4().to_string());

        self.emit(
            "agent.deploy.initializing",
            serde_json::json!({ "agent_id": agent_id.as_str(), "persona": persona.name }),
            now_ms,
        )
        .await;

        self.emit(
            "agent.deploy.active",
            serde_json::json!({ "agent_id": agent_id.as_str(), "persona": persona.name }),
            now_ms,
        )
        .await;

        Ok(DeployResult {
            agent_id,
            status: AgentStatus::Active,
            persona: persona.name,
            metrics: serde_json::json!({}),
        })
    }

    /// Run a linear, stop-on-first-failure workflow: each `(stage_name,
    /// tool)` pair is invoked in order through
    /// `ErrorRecoveryManager::execute_tool_with_retry`. The deployment
    /// workflow (spec §4.10) is this shape applied to
    /// [`DEPLOYMENT_STAGES`]; any other named linear pipeline can reuse it.
    pub async fn run_linear_workflow(
        &self,
        stages: &[(&str, &dyn Tool)],
        params: serde_json::Value,
        opts: RetryOptions,
        cancel: &CancellationToken,
        now_ms: u64,
    ) -> WorkflowResult {
        let mut execution_path = Vec::with_capacity(stages.len());
        for &(stage_name, tool) in stages {
            match self
                .recovery
                .execute_tool_with_retry(tool, params.clone(), opts, cancel, now_ms)
                .await
            {
                Ok(_) => execution_path.push(stage_name.to_string()),
                Err(err) => {
                    tracing::warn!(stage = stage_name, error = %err, "workflow stage failed");
                    return WorkflowResult {
                        success: false,
                        execution_path,
                        errors: vec![err.to_string()],
                        stage_stopped_at: Some(stage_name.to_string()),
                    };
                }
            }
        }
        WorkflowResult {
            success: true,
            execution_path,
            errors: Vec::new(),
            stage_stopped_at: None,
        }
    }

    /// Run the pre-wired deployment workflow (`VALIDATOR → TEST → REVIEWER →
    /// DEPLOYER → INTEGRATOR`) over caller-supplied tools, one per stage, in
    /// [`DEPLOYMENT_STAGES`] order.
    pub async fn run_deployment_workflow(
        &self,
        stage_tools: [&dyn Tool; 5],
        params: serde_json::Value,
        opts: RetryOptions,
        cancel: &CancellationToken,
        now_ms: u64,
    ) -> WorkflowResult {
        let stages: Vec<(&str, &dyn Tool)> = DEPLOYMENT_STAGES
            .iter()
            .copied()
            .zip(stage_tools)
            .collect();
        self.run_linear_workflow(&stages, params, opts, cancel, now_ms)
            .await
    }

    /// Run the iterate-TEST-then-DEBUG-until-converged testing workflow.
    /// Stops when an iteration's test result reports zero failures, or after
    /// `max_iterations`. `debug_tool` is invoked once (not retried) between
    /// non-terminal iterations.
    pub async fn run_testing_workflow(
        &self,
        test_tool: &dyn Tool,
        debug_tool: &dyn Tool,
        max_iterations: usize,
        params: serde_json::Value,
        opts: RetryOptions,
        cancel: &CancellationToken,
        now_ms: u64,
    ) -> TestingWorkflowResult {
        let mut iterations = Vec::new();
        for iteration in 0..max_iterations.max(1) {
            let test_result = match self
                .recovery
                .execute_tool_with_retry(test_tool, params.clone(), opts, cancel, now_ms)
                .await
            {
                Ok(result) => result,
                Err(err) => {
                    return TestingWorkflowResult {
                        success: false,
                        iterations,
                        stopped_reason: format!("test stage failed: {err}"),
                    };
                }
            };

            let failures = test_result
                .get("failures")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0);
            iterations.push(TestIterationMetrics {
                iteration,
                failures,
                metrics: test_result,
            });

            if failures == 0 {
                return TestingWorkflowResult {
                    success: true,
                    iterations,
                    stopped_reason: "zero_failures".to_string(),
                };
            }

            if iteration + 1 == max_iterations {
                break;
            }

            if let Err(err) = debug_tool.execute(params.clone()).await {
                tracing::warn!(error = %err, "debug stage failed");
            }
        }

        TestingWorkflowResult {
            success: false,
            iterations,
            stopped_reason: "max_iterations_reached".to_string(),
        }
    }
}
