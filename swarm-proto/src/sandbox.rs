//! The sandbox provider contract (spec §6) and the data the manager tracks
//! about a live sandbox.

use crate::duration::DurationMs;
use crate::id::SandboxId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The closed set of languages `SandboxManager::execute_code_in_sandbox`
/// accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// JavaScript (Node.js).
    Javascript,
    /// Python.
    Python,
    /// POSIX shell.
    Bash,
}

impl Language {
    /// Parse a language name, returning `None` for anything outside the
    /// closed set.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "javascript" => Some(Language::Javascript),
            "python" => Some(Language::Python),
            "bash" => Some(Language::Bash),
            _ => None,
        }
    }
}

/// The closed set of package managers `SandboxManager::install_packages_in_sandbox`
/// accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    /// Node's `npm`.
    Npm,
    /// Python's `pip`.
    Pip,
    /// Debian/Ubuntu's `apt`.
    Apt,
}

impl PackageManager {
    /// Parse a package manager name, returning `None` for anything outside
    /// the closed set.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "npm" => Some(PackageManager::Npm),
            "pip" => Some(PackageManager::Pip),
            "apt" => Some(PackageManager::Apt),
            _ => None,
        }
    }
}

/// Record the manager keeps about a sandbox it owns for the duration of one
/// operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sandbox {
    /// The sandbox's identifier, assigned by the provider.
    pub sandbox_id: SandboxId,
    /// The template label the sandbox was created from.
    pub template: String,
    /// When the sandbox was created.
    pub created_at: DurationMs,
}

/// Output of running code inside a sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code.
    pub exit_code: i32,
    /// Wall-clock execution time. Must not exceed the requested timeout by
    /// more than an implementation-bounded grace margin.
    pub execution_time: DurationMs,
}

/// Output of a single command run inside a sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code.
    pub exit_code: i32,
}

/// The external sandbox provider contract. `SandboxManager` requires only
/// these operations; everything else (admission control, timeouts, language
/// validation) is built on top, inside the manager.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Provision a new sandbox from the given template.
    async fn create_sandbox(&self, template: &str) -> Result<Box<dyn SandboxHandle>, String>;
}

/// A single live sandbox, valid only within the operation that created it.
#[async_trait]
pub trait SandboxHandle: Send + Sync {
    /// The provider-assigned identifier for this sandbox.
    fn sandbox_id(&self) -> SandboxId;

    /// Run a shell command inside the sandbox.
    async fn run_command(&self, cmd: &str) -> Result<CommandOutput, String>;

    /// Write a file inside the sandbox.
    async fn write_file(&self, path: &str, content: &str) -> Result<(), String>;

    /// Read a file from the sandbox.
    async fn read_file(&self, path: &str) -> Result<String, String>;

    /// List files under `path` inside the sandbox.
    async fn list_files(&self, path: &str) -> Result<Vec<String>, String>;

    /// Tear down the sandbox. Called on every exit path (success, failure,
    /// timeout, cancellation).
    async fn close(self: Box<Self>) -> Result<(), String>;
}
