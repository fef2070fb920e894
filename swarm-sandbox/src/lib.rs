//! # swarm-sandbox — concurrency-bounded code execution (spec §4.8)
//!
//! Admission control is a `tokio::sync::Semaphore` used with
//! `try_acquire_owned` rather than `acquire` — the spec calls for an
//! immediate `ConcurrencyLimitReached` refusal at the ceiling, not queuing,
//! so we never await a permit. Sandboxes themselves are opaque behind
//! [`swarm_proto::SandboxProvider`]; this crate only owns admission,
//! timeout, and language/package-manager validation around it, the same
//! division of labor `neuron-env-local::LocalEnv` draws between itself (no
//! policy) and the `Operator` it wraps (does the work).

#![deny(missing_docs)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use swarm_bus::EventBus;
use swarm_proto::{
    CommandOutput, DurationMs, Event, ExecutionResult, Language, PackageManager, SandboxError,
    SandboxProvider,
};
use tokio::sync::{RwLock, Semaphore};
use tokio_util::sync::CancellationToken;

/// Static configuration for a [`SandboxManager`].
#[derive(Debug, Clone)]
pub struct SandboxManagerConfig {
    /// Maximum number of sandboxes that may be active at once.
    pub max_concurrency: usize,
    /// Template passed to `SandboxProvider::create_sandbox` when the caller
    /// doesn't specify one.
    pub default_template: String,
    /// Timeout applied to `execute_code_in_sandbox` when the caller doesn't
    /// override it.
    pub default_timeout_ms: u64,
}

impl Default for SandboxManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            default_template: "default".to_string(),
            default_timeout_ms: 30_000,
        }
    }
}

/// Point-in-time view of admission control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyStatus {
    /// Sandboxes currently admitted.
    pub current: usize,
    /// The configured ceiling.
    pub max: usize,
    /// Remaining admission slots.
    pub available: usize,
}

struct State {
    semaphore: Arc<Semaphore>,
    shutdown_token: CancellationToken,
}

/// Owns admission control and lifecycle for sandboxed code execution.
pub struct SandboxManager {
    provider: Arc<dyn SandboxProvider>,
    config: SandboxManagerConfig,
    state: RwLock<State>,
    bus: Option<Arc<EventBus>>,
}

impl SandboxManager {
    /// Create a manager over `provider` with `config`, no attached bus.
    pub fn new(provider: Arc<dyn SandboxProvider>, config: SandboxManagerConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            provider,
            config,
            state: RwLock::new(State {
                semaphore,
                shutdown_token: CancellationToken::new(),
            }),
            bus: None,
        }
    }

    /// Create a manager that publishes its lifecycle events onto `bus`.
    pub fn with_bus(
        provider: Arc<dyn SandboxProvider>,
        config: SandboxManagerConfig,
        bus: Arc<EventBus>,
    ) -> Self {
        let mut manager = Self::new(provider, config);
        manager.bus = Some(bus);
        manager
    }

    async fn emit(&self, event_type: &str, payload: serde_json::Value, now_ms: u64) {
        if let Some(bus) = &self.bus {
            bus.publish(Event::new(
                format!("{event_type}-{now_ms}"),
                event_type,
                DurationMs::from_millis(now_ms),
                "sandbox_manager",
                payload,
            ))
            .await;
        }
    }

    /// Current admission status.
    pub async fn get_concurrency_status(&self) -> ConcurrencyStatus {
        let state = self.state.read().await;
        let available = state.semaphore.available_permits();
        ConcurrencyStatus {
            current: self.config.max_concurrency.saturating_sub(available),
            max: self.config.max_concurrency,
            available,
        }
    }

    async fn admit(&self) -> Result<(tokio::sync::OwnedSemaphorePermit, CancellationToken), SandboxError> {
        let state = self.state.read().await;
        let semaphore = Arc::clone(&state.semaphore);
        let shutdown_token = state.shutdown_token.clone();
        drop(state);
        semaphore
            .try_acquire_owned()
            .map(|permit| (permit, shutdown_token))
            .map_err(|_| SandboxError::ConcurrencyLimitReached(self.config.max_concurrency))
    }

    async fn provision(&self) -> Result<Box<dyn swarm_proto::SandboxHandle>, SandboxError> {
        self.provider
            .create_sandbox(&self.config.default_template)
            .await
            .map_err(SandboxError::Provider)
    }

    async fn close(&self, handle: Box<dyn swarm_proto::SandboxHandle>) {
        if let Err(close_err) = handle.close().await {
            tracing::warn!(error = %close_err, "failed to close sandbox");
        }
    }

    /// Execute `code` (in `language`) inside a freshly provisioned sandbox,
    /// refusing admission immediately if the concurrency ceiling is
    /// reached. `timeout_ms` overrides the configured default.
    pub async fn execute_code_in_sandbox(
        &self,
        code: &str,
        language: &str,
        timeout_ms: Option<u64>,
        now_ms: u64,
    ) -> Result<ExecutionResult, SandboxError> {
        let language = Language::parse(language)
            .ok_or_else(|| SandboxError::UnsupportedLanguage(language.to_string()))?;
        let (_permit, shutdown_token) = self.admit().await?;

        let cmd = render_execute_command(language, code);
        let timeout = Duration::from_millis(timeout_ms.unwrap_or(self.config.default_timeout_ms));
        let start = Instant::now();

        let handle = self.provision().await?;

        let run_result: Result<Result<CommandOutput, String>, SandboxError> = tokio::select! {
            res = tokio::time::timeout(timeout, handle.run_command(&cmd)) => {
                res.map_err(|_| SandboxError::Timeout(timeout.as_millis() as u64))
            }
            _ = shutdown_token.cancelled() => Err(SandboxError::Cancelled),
        };
        let execution_time = DurationMs::from_millis(start.elapsed().as_millis() as u64);

        self.close(handle).await;

        match run_result {
            Ok(Ok(output)) => {
                self.emit(
                    "sandbox.execution.completed",
                    serde_json::json!({ "exit_code": output.exit_code }),
                    now_ms,
                )
                .await;
                Ok(ExecutionResult {
                    stdout: output.stdout,
                    stderr: output.stderr,
                    exit_code: output.exit_code,
                    execution_time,
                })
            }
            Ok(Err(provider_err)) => Err(SandboxError::Provider(provider_err)),
            Err(sandbox_err) => Err(sandbox_err),
        }
    }

    /// Create a file at `path` with `content` inside a fresh sandbox.
    pub async fn create_file_in_sandbox(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        let (_permit, shutdown_token) = self.admit().await?;
        let handle = self.provision().await?;
        let result = tokio::select! {
            res = handle.write_file(path, content) => res.map_err(|e| wrap_file_error("create_file", e)),
            _ = shutdown_token.cancelled() => Err(SandboxError::Cancelled),
        };
        self.close(handle).await;
        result
    }

    /// Read the file at `path` from a fresh sandbox.
    pub async fn read_file_from_sandbox(&self, path: &str) -> Result<String, SandboxError> {
        let (_permit, shutdown_token) = self.admit().await?;
        let handle = self.provision().await?;
        let result = tokio::select! {
            res = handle.read_file(path) => res.map_err(|e| wrap_file_error("read_file", e)),
            _ = shutdown_token.cancelled() => Err(SandboxError::Cancelled),
        };
        self.close(handle).await;
        result
    }

    /// List files under `path` from a fresh sandbox.
    pub async fn list_files_in_sandbox(&self, path: &str) -> Result<Vec<String>, SandboxError> {
        let (_permit, shutdown_token) = self.admit().await?;
        let handle = self.provision().await?;
        let result = tokio::select! {
            res = handle.list_files(path) => res.map_err(|e| wrap_file_error("list_files", e)),
            _ = shutdown_token.cancelled() => Err(SandboxError::Cancelled),
        };
        self.close(handle).await;
        result
    }

    /// Install `pkgs` with `pkg_manager` inside a fresh sandbox.
    pub async fn install_packages_in_sandbox(
        &self,
        pkgs: &[String],
        pkg_manager: &str,
    ) -> Result<CommandOutput, SandboxError> {
        let pkg_manager = PackageManager::parse(pkg_manager)
            .ok_or_else(|| SandboxError::UnsupportedPackageManager(pkg_manager.to_string()))?;
        let (_permit, shutdown_token) = self.admit().await?;
        let cmd = render_install_command(pkg_manager, pkgs);
        let handle = self.provision().await?;
        let result = tokio::select! {
            res = handle.run_command(&cmd) => res.map_err(|e| wrap_file_error("install_packages", e)),
            _ = shutdown_token.cancelled() => Err(SandboxError::Cancelled),
        };
        self.close(handle).await;
        result
    }

    /// Cancel any in-flight operations (they close their own sandboxes on
    /// the cancellation path) and reset admission counters to zero.
    /// Idempotent.
    pub async fn shutdown(&self) {
        let mut state = self.state.write().await;
        state.shutdown_token.cancel();
        state.shutdown_token = CancellationToken::new();
        state.semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
    }
}

fn wrap_file_error(operation: &str, reason: String) -> SandboxError {
    SandboxError::FileOperationFailed {
        operation: operation.to_string(),
        reason,
    }
}

fn shell_quote(code: &str) -> String {
    format!("'{}'", code.replace('\'', "'\\''"))
}

fn render_execute_command(language: Language, code: &str) -> String {
    match language {
        Language::Javascript => format!("node -e {}", shell_quote(code)),
        Language::Python => format!("python3 -c {}", shell_quote(code)),
        Language::Bash => code.to_string(),
    }
}

fn render_install_command(pkg_manager: PackageManager, pkgs: &[String]) -> String {
    let joined = pkgs.join(" ");
    match pkg_manager {
        PackageManager::Npm => format!("npm install {joined}"),
        PackageManager::Pip => format!("pip install {joined}"),
        PackageManager::Apt => format!("apt-get install -y {joined}"),
    }
}
