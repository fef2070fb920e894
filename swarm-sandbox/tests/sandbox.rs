use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use swarm_proto::{CommandOutput, SandboxError, SandboxHandle, SandboxId, SandboxProvider};
use swarm_sandbox::{SandboxManager, SandboxManagerConfig};
use tokio::sync::Mutex;

struct FakeHandle {
    id: SandboxId,
    files: Arc<Mutex<std::collections::HashMap<String, String>>>,
    delay_ms: u64,
}

#[async_trait]
impl SandboxHandle for FakeHandle {
    fn sandbox_id(&self) -> SandboxId {
        self.id.clone()
    }

    async fn run_command(&self, cmd: &str) -> Result<CommandOutput, String> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        Ok(CommandOutput {
            stdout: format!("ran: {cmd}"),
            stderr: String::new(),
            exit_code: 0,
        })
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), String> {
        self.files
            .lock()
            .await
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String, String> {
        self.files
            .lock()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| format!("no such file: {path}"))
    }

    async fn list_files(&self, _path: &str) -> Result<Vec<String>, String> {
        Ok(self.files.lock().await.keys().cloned().collect())
    }

    async fn close(self: Box<Self>) -> Result<(), String> {
        Ok(())
    }
}

struct FakeProvider {
    next_id: AtomicU64,
    delay_ms: u64,
}

impl FakeProvider {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            delay_ms: 0,
        }
    }

    fn slow(delay_ms: u64) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            delay_ms,
        }
    }
}

#[async_trait]
impl SandboxProvider for FakeProvider {
    async fn create_sandbox(&self, _template: &str) -> Result<Box<dyn SandboxHandle>, String> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            id: SandboxId::new(format!("sandbox-{id}")),
            files: Arc::new(Mutex::new(std::collections::HashMap::new())),
            delay_ms: self.delay_ms,
        }))
    }
}

fn manager(max_concurrency: usize) -> SandboxManager {
    SandboxManager::new(
        Arc::new(FakeProvider::new()),
        SandboxManagerConfig {
            max_concurrency,
            default_template: "default".to_string(),
            default_timeout_ms: 5_000,
        },
    )
}

#[tokio::test]
async fn executes_code_and_reports_exit_code() {
    let mgr = manager(10);
    let result = mgr
        .execute_code_in_sandbox("print('hi')", "python", None, 0)
        .await
        .unwrap();
    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.contains("python3 -c"));
}

#[tokio::test]
async fn rejects_unsupported_language() {
    let mgr = manager(10);
    let err = mgr
        .execute_code_in_sandbox("print(1)", "ruby", None, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, SandboxError::UnsupportedLanguage(lang) if lang == "ruby"));
}

#[tokio::test]
async fn admission_refuses_immediately_at_concurrency_ceiling() {
    let mgr = Arc::new(SandboxManager::new(
        Arc::new(FakeProvider::slow(50)),
        SandboxManagerConfig {
            max_concurrency: 1,
            default_template: "default".to_string(),
            default_timeout_ms: 5_000,
        },
    ));

    let mgr2 = Arc::clone(&mgr);
    let first = tokio::spawn(async move {
        mgr2.execute_code_in_sandbox("echo hi", "bash", None, 0).await
    });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let err = mgr
        .execute_code_in_sandbox("echo hi", "bash", None, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, SandboxError::ConcurrencyLimitReached(1)));

    first.await.unwrap().unwrap();
}

#[tokio::test]
async fn execution_times_out() {
    let mgr = SandboxManager::new(
        Arc::new(FakeProvider::slow(200)),
        SandboxManagerConfig {
            max_concurrency: 10,
            default_template: "default".to_string(),
            default_timeout_ms: 5_000,
        },
    );
    let err = mgr
        .execute_code_in_sandbox("echo hi", "bash", Some(10), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, SandboxError::Timeout(10)));
}

#[tokio::test]
async fn file_roundtrip_fails_across_separate_operations() {
    // Each manager operation provisions and closes its own sandbox, so a
    // file written in one call is not visible to a later call — the spec
    // explicitly does not require cross-operation reuse.
    let mgr = manager(10);
    mgr.create_file_in_sandbox("/tmp/a.txt", "hello").await.unwrap();
    let err = mgr.read_file_from_sandbox("/tmp/a.txt").await.unwrap_err();
    assert!(matches!(err, SandboxError::FileOperationFailed { .. }));
}

#[tokio::test]
async fn install_packages_rejects_unsupported_manager() {
    let mgr = manager(10);
    let err = mgr
        .install_packages_in_sandbox(&["left-pad".to_string()], "cargo")
        .await
        .unwrap_err();
    assert!(matches!(err, SandboxError::UnsupportedPackageManager(m) if m == "cargo"));
}

#[tokio::test]
async fn concurrency_status_reflects_admitted_slots() {
    let mgr = manager(4);
    let status = mgr.get_concurrency_status().await;
    assert_eq!(status, swarm_sandbox::ConcurrencyStatus { current: 0, max: 4, available: 4 });
}

#[tokio::test]
async fn shutdown_is_idempotent_and_resets_counters() {
    let mgr = manager(3);
    mgr.shutdown().await;
    mgr.shutdown().await;
    let status = mgr.get_concurrency_status().await;
    assert_eq!(status.current, 0);
    assert_eq!(status.available, 3);
}
