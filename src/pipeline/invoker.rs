//! Verification invoker: runs the external release check script.
//!
//! The script is invoked as `<shell> <script> <id> <staging-dir>`; stdout
//! and stderr are captured and concatenated in that order. Failures to
//! run the script are never returned as errors: the diagnostic text is
//! appended to the captured output and `Invocation::completed` is cleared.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::VoteCheckConfig;
use crate::error::InvokeError;
use crate::pipeline::types::CandidateId;

/// Captured result of one external command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// stdout followed by stderr, plus any diagnostic text.
    pub output: String,
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// False when the process could not be spawned, awaited, or finished in time.
    pub completed: bool,
}

impl Invocation {
    fn failed(mut output: String, err: &InvokeError) -> Self {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&err.to_string());
        Self {
            output,
            exit_code: None,
            completed: false,
        }
    }
}

/// Runs verification for a candidate.
#[async_trait]
pub trait VerificationInvoker: Send + Sync {
    async fn verify(&self, id: &CandidateId) -> Invocation;
}

/// `VerificationInvoker` that shells out to the release check script.
#[derive(Debug, Clone)]
pub struct ScriptInvoker {
    shell: String,
    script: PathBuf,
    staging_dir: PathBuf,
    timeout: Duration,
}

impl ScriptInvoker {
    pub fn new(config: &VoteCheckConfig) -> Self {
        Self {
            shell: config.shell.clone(),
            script: config.script_path(),
            staging_dir: config.staging_dir.clone(),
            timeout: config.verify_timeout,
        }
    }

    fn args(&self, id: &CandidateId) -> Vec<String> {
        vec![
            self.script.to_string_lossy().to_string(),
            id.to_string(),
            self.staging_dir.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl VerificationInvoker for ScriptInvoker {
    async fn verify(&self, id: &CandidateId) -> Invocation {
        debug!(candidate = %id, "Executing release check");
        run_command(&self.shell, &self.args(id), self.timeout).await
    }
}

/// Run `program` with `args`, capturing its output.
///
/// stdout and stderr are drained concurrently while the child runs, so a
/// run killed at the deadline still reports whatever it printed.
pub async fn run_command(program: &str, args: &[String], timeout: Duration) -> Invocation {
    let command_line = display_command(program, args);

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(source) => {
            let err = InvokeError::Spawn {
                command: command_line,
                source,
            };
            error!(error = %err, "Failed to run command");
            return Invocation::failed(String::new(), &err);
        }
    };

    let stdout = Drain::start(child.stdout.take());
    let stderr = Drain::start(child.stderr.take());

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let mut output = stdout.finish(None).await;
            output.push_str(&stderr.finish(None).await);

            if !status.success() {
                warn!(command = %command_line, %status, "Command exited unsuccessfully");
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
                output.push_str(&format!("Command '{command_line}' exited with {status}"));
            }

            Invocation {
                output,
                exit_code: status.code(),
                completed: true,
            }
        }
        Ok(Err(source)) => {
            let _ = child.kill().await;
            let err = InvokeError::Wait {
                command: command_line,
                source,
            };
            error!(error = %err, "Failed to run command");
            Invocation::failed(partial_output(stdout, stderr).await, &err)
        }
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!(command = %command_line, error = %e, "Failed to kill timed out command");
            }
            let err = InvokeError::Timeout {
                command: command_line,
                timeout,
            };
            error!(error = %err, "Command timed out");
            Invocation::failed(partial_output(stdout, stderr).await, &err)
        }
    }
}

/// How long readers get to pick up buffered output after a kill.
/// Grandchildren may keep the pipes open, so EOF is not awaited.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

async fn partial_output(stdout: Drain, stderr: Drain) -> String {
    let mut output = stdout.finish(Some(DRAIN_GRACE)).await;
    output.push_str(&stderr.finish(Some(DRAIN_GRACE)).await);
    output
}

/// Background reader accumulating one child pipe.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Drain {
    fn start<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = buf.clone();
        let task = tokio::spawn(async move {
            let Some(mut pipe) = pipe else { return };
            let mut chunk = [0u8; 4096];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => sink.lock().await.extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        debug!(error = %e, "Stopped reading command output");
                        break;
                    }
                }
            }
        });
        Self { buf, task }
    }

    /// Wait for the reader (up to `grace`, when given) and return the text read.
    async fn finish(self, grace: Option<Duration>) -> String {
        let abort = self.task.abort_handle();
        match grace {
            None => {
                let _ = self.task.await;
            }
            Some(grace) => {
                if tokio::time::timeout(grace, self.task).await.is_err() {
                    abort.abort();
                }
            }
        }
        let bytes = self.buf.lock().await;
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classify::classify;
    use crate::pipeline::types::VerificationStatus;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_stdout_then_stderr() {
        let inv = run_command(
            "sh",
            &args(&["-c", "echo out; echo err 1>&2"]),
            Duration::from_secs(10),
        )
        .await;
        assert!(inv.completed);
        assert_eq!(inv.exit_code, Some(0));
        assert_eq!(inv.output, "out\nerr\n");
    }

    #[tokio::test]
    async fn spawn_failure_becomes_output() {
        let inv = run_command(
            "/nonexistent/vote-check-binary",
            &[],
            Duration::from_secs(10),
        )
        .await;
        assert!(!inv.completed);
        assert!(inv.output.starts_with("Failed to spawn command '/nonexistent/vote-check-binary'"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_annotated() {
        let inv = run_command("sh", &args(&["-c", "echo partial; exit 3"]), Duration::from_secs(10)).await;
        assert!(inv.completed);
        assert_eq!(inv.exit_code, Some(3));
        assert!(inv.output.starts_with("partial\n"));
        assert!(inv.output.contains("exited with"));
    }

    #[tokio::test]
    async fn deadline_kills_command() {
        let inv = run_command("sh", &args(&["-c", "sleep 10"]), Duration::from_millis(100)).await;
        assert!(!inv.completed);
        assert!(inv.output.contains("timed out"));
    }

    #[tokio::test]
    async fn deadline_keeps_output_printed_before_it() {
        // printf assembles the marker so it never appears in the command line.
        let inv = run_command(
            "sh",
            &args(&["-c", "printf 'B%sD!! checksum mismatch\\n' A; sleep 5"]),
            Duration::from_millis(500),
        )
        .await;

        assert!(!inv.completed);
        assert_eq!(inv.exit_code, None);
        assert!(inv.output.starts_with("BAD!! checksum mismatch\n"));
        assert!(inv.output.contains("timed out after 500ms"));
        assert_eq!(classify(&inv), VerificationStatus::Bad);
    }

    #[tokio::test]
    async fn deadline_without_marker_is_error() {
        let inv = run_command(
            "sh",
            &args(&["-c", "echo checking signatures; sleep 5"]),
            Duration::from_millis(500),
        )
        .await;

        assert!(inv.output.starts_with("checking signatures\n"));
        assert_eq!(classify(&inv), VerificationStatus::Error);
    }

    #[tokio::test]
    async fn script_invoker_passes_id_and_staging_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("check_staged_release.sh"), "echo \"id=$1 dir=$2\"\n").unwrap();

        let config = VoteCheckConfig {
            project_path: dir.path().to_path_buf(),
            staging_dir: PathBuf::from("/tmp/staging-test"),
            ..VoteCheckConfig::default()
        };
        let invoker = ScriptInvoker::new(&config);
        let inv = invoker.verify(&CandidateId::parse("42").unwrap()).await;

        assert!(inv.completed);
        assert_eq!(inv.output, "id=42 dir=/tmp/staging-test\n");
    }
}
