use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Execution mode of one agent invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    AsyncSingleUser,
    SyncSingleUser,
    FullBatch,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            RunMode::AsyncSingleUser => "async-single",
            RunMode::SyncSingleUser => "sync-single",
            RunMode::FullBatch => "full-batch",
        };
        write!(f, "{}", tag)
    }
}

/// Terminal state of one agent invocation.
///
/// A failed launch is distinct from a run that started and exited nonzero;
/// neither is retried here. Retry policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    Failed(i32),
    LaunchFailed(String),
}

/// Transient execution record for one invocation; logged, never persisted
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub user_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub duration: Duration,
}

impl AgentRun {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}

/// Supervised-subprocess capability behind a seam, so the opaque agent can
/// be stubbed in tests without spawning real processes.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BatchAgent: Send + Sync {
    async fn launch(&self, mode: RunMode, user_id: Option<String>) -> AgentRun;
}

/// Launches the external batch agent as `<interpreter> <script-path>
/// [--user_id <id>]`, streams its output into the log and reports the
/// terminal state.
pub struct AgentOrchestrator {
    interpreter: String,
    script_path: String,
    /// Admission bound for async-mode runs; excess invocations queue
    async_slots: Arc<Semaphore>,
}

impl AgentOrchestrator {
    pub fn new(interpreter: String, script_path: String, max_concurrent_async: usize) -> Self {
        Self {
            interpreter,
            script_path,
            async_slots: Arc::new(Semaphore::new(max_concurrent_async.max(1))),
        }
    }

    async fn execute(&self, mode: RunMode, user_id: Option<String>) -> AgentRun {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();

        tracing::info!(
            run_id = %run_id,
            mode = %mode,
            user_id = user_id.as_deref().unwrap_or("all"),
            script = %self.script_path,
            "Launching batch agent"
        );

        let mut command = Command::new(&self.interpreter);
        command.arg(&self.script_path);
        if let Some(id) = user_id.as_deref() {
            command.args(["--user_id", id]);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(run_id = %run_id, mode = %mode, error = %e, "Agent launch failed");
                return AgentRun {
                    run_id,
                    mode,
                    user_id,
                    started_at,
                    status: RunStatus::LaunchFailed(e.to_string()),
                    duration: started.elapsed(),
                };
            }
        };

        // Both pipes feed the same structured log stream, and both must be
        // fully drained before the exit status is evaluated so buffered
        // output is never lost when the process exits.
        let stdout_task = child
            .stdout
            .take()
            .map(|stream| tokio::spawn(forward_lines(stream, mode, run_id)));
        let stderr_task = child
            .stderr
            .take()
            .map(|stream| tokio::spawn(forward_lines(stream, mode, run_id)));

        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        let status = match child.wait().await {
            Ok(exit) if exit.success() => RunStatus::Succeeded,
            Ok(exit) => RunStatus::Failed(exit.code().unwrap_or(-1)),
            Err(e) => RunStatus::LaunchFailed(e.to_string()),
        };
        let duration = started.elapsed();

        match &status {
            RunStatus::Succeeded => tracing::info!(
                run_id = %run_id,
                mode = %mode,
                duration_ms = duration.as_millis() as u64,
                "Agent run succeeded"
            ),
            RunStatus::Failed(code) => tracing::error!(
                run_id = %run_id,
                mode = %mode,
                exit_code = code,
                duration_ms = duration.as_millis() as u64,
                "Agent run failed"
            ),
            RunStatus::LaunchFailed(err) => tracing::error!(
                run_id = %run_id,
                mode = %mode,
                error = %err,
                "Agent run could not complete"
            ),
        }

        AgentRun {
            run_id,
            mode,
            user_id,
            started_at,
            status,
            duration,
        }
    }
}

#[async_trait::async_trait]
impl BatchAgent for AgentOrchestrator {
    async fn launch(&self, mode: RunMode, user_id: Option<String>) -> AgentRun {
        // Async-mode runs are admitted through the bounded slot pool;
        // sync and full-batch invocations run unconditionally.
        let _permit = match mode {
            RunMode::AsyncSingleUser => Arc::clone(&self.async_slots).acquire_owned().await.ok(),
            _ => None,
        };
        self.execute(mode, user_id).await
    }
}

/// Surfaces one output pipe line-by-line as structured log events. Lines
/// have no size limit; reading stops only at end-of-stream.
async fn forward_lines<R: AsyncRead + Unpin>(stream: R, mode: RunMode, run_id: Uuid) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::info!(run_id = %run_id, mode = %mode, "[agent] {}", line);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(run_id = %run_id, mode = %mode, error = %e, "Agent output read error");
                break;
            }
        }
    }
}

/// Fire-and-forget per-user run; the caller never blocks and the outcome is
/// observable only via logs. The detached task owns the run to completion;
/// there is no cancellation for in-flight subprocesses.
pub fn trigger_single_user(agent: Arc<dyn BatchAgent>, user_id: String) {
    tokio::spawn(async move {
        agent.launch(RunMode::AsyncSingleUser, Some(user_id)).await;
    });
}

/// Per-user run on the calling task; true iff the agent succeeded.
pub async fn run_single_user_sync(agent: &dyn BatchAgent, user_id: &str) -> bool {
    agent
        .launch(RunMode::SyncSingleUser, Some(user_id.to_string()))
        .await
        .succeeded()
}

/// Full-batch run on the calling task; duration and terminal state are
/// recorded by the orchestrator's logging.
pub async fn run_full_batch(agent: &dyn BatchAgent) {
    let _ = agent.launch(RunMode::FullBatch, None).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn script(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", body).unwrap();
        file
    }

    fn orchestrator(interpreter: &str, script_path: &str) -> AgentOrchestrator {
        AgentOrchestrator::new(interpreter.to_string(), script_path.to_string(), 2)
    }

    #[tokio::test]
    async fn test_zero_exit_reports_succeeded() {
        let script = script("echo working\nexit 0");
        let agent = orchestrator("sh", script.path().to_str().unwrap());

        let run = agent
            .launch(RunMode::SyncSingleUser, Some("alice".to_string()))
            .await;

        assert_eq!(run.status, RunStatus::Succeeded);
        assert_eq!(run.user_id.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_failed_with_code() {
        let script = script("echo failing >&2\nexit 1");
        let agent = orchestrator("sh", script.path().to_str().unwrap());

        let run = agent.launch(RunMode::FullBatch, None).await;

        assert_eq!(run.status, RunStatus::Failed(1));
    }

    #[tokio::test]
    async fn test_missing_interpreter_reports_launch_failed() {
        let agent = orchestrator("/nonexistent/interpreter", "/nonexistent/script.py");

        let run = agent.launch(RunMode::FullBatch, None).await;

        assert!(matches!(run.status, RunStatus::LaunchFailed(_)));
    }

    #[tokio::test]
    async fn test_user_id_argument_is_passed_through() {
        let script = script(
            r#"if [ "$1" = "--user_id" ] && [ "$2" = "alice" ]; then exit 0; else exit 3; fi"#,
        );
        let agent = orchestrator("sh", script.path().to_str().unwrap());

        let run = agent
            .launch(RunMode::SyncSingleUser, Some("alice".to_string()))
            .await;

        assert_eq!(run.status, RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_full_batch_runs_without_user_argument() {
        let script = script(r#"if [ "$#" -eq 0 ]; then exit 0; else exit 4; fi"#);
        let agent = orchestrator("sh", script.path().to_str().unwrap());

        let run = agent.launch(RunMode::FullBatch, None).await;

        assert_eq!(run.status, RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_output_is_drained_before_exit_evaluation() {
        // A burst of output larger than the pipe buffer would deadlock or
        // get truncated if the streams were not drained before wait()
        let script = script("i=0\nwhile [ $i -lt 2000 ]; do echo \"progress line $i\"; i=$((i+1)); done\nexit 0");
        let agent = orchestrator("sh", script.path().to_str().unwrap());

        let run = agent.launch(RunMode::FullBatch, None).await;

        assert_eq!(run.status, RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_sync_wrapper_maps_status_to_bool() {
        let ok_script = script("exit 0");
        let agent = orchestrator("sh", ok_script.path().to_str().unwrap());
        assert!(run_single_user_sync(&agent, "alice").await);

        let fail_script = script("exit 1");
        let agent = orchestrator("sh", fail_script.path().to_str().unwrap());
        assert!(!run_single_user_sync(&agent, "alice").await);
    }

    #[tokio::test]
    async fn test_trigger_single_user_does_not_block_caller() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        struct RecordingAgent {
            tx: tokio::sync::mpsc::UnboundedSender<(RunMode, Option<String>)>,
        }

        #[async_trait::async_trait]
        impl BatchAgent for RecordingAgent {
            async fn launch(&self, mode: RunMode, user_id: Option<String>) -> AgentRun {
                // Slower than the caller should ever wait
                tokio::time::sleep(Duration::from_millis(200)).await;
                let _ = self.tx.send((mode, user_id.clone()));
                AgentRun {
                    run_id: Uuid::new_v4(),
                    mode,
                    user_id,
                    started_at: Utc::now(),
                    status: RunStatus::Succeeded,
                    duration: Duration::from_millis(200),
                }
            }
        }

        let agent: Arc<dyn BatchAgent> = Arc::new(RecordingAgent { tx });

        let started = Instant::now();
        trigger_single_user(Arc::clone(&agent), "alice".to_string());
        assert!(started.elapsed() < Duration::from_millis(100));

        let (mode, user_id) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mode, RunMode::AsyncSingleUser);
        assert_eq!(user_id.as_deref(), Some("alice"));
    }
}
