// Shell Runner
// Executes step commands through the platform shell

use crate::runners::{StepInvocation, StepOutput, StepRunner};

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;

/// Get the shell executable and arguments
fn shell_command() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "windows") {
        ("cmd", &["/C"])
    } else {
        ("sh", &["-c"])
    }
}

/// Resolve when the cancel flag is raised.
///
/// A closed channel never reads as a cancellation.
async fn cancelled_signal(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

enum WaitOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Shell runner for executing step commands
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StepRunner for ShellRunner {
    async fn run(
        &self,
        invocation: &StepInvocation,
        cancel: &mut watch::Receiver<bool>,
    ) -> StepOutput {
        let (shell_cmd, shell_args) = shell_command();

        let mut cmd = Command::new(shell_cmd);
        cmd.args(shell_args);
        cmd.arg(&invocation.command);
        cmd.current_dir(&invocation.working_dir);
        // The invocation env is the whole child environment, ambient included
        cmd.env_clear();
        cmd.envs(&invocation.env);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return StepOutput {
                    error: Some(format!("failed to spawn '{}': {}", shell_cmd, e)),
                    ..Default::default()
                };
            }
        };

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        // Read output streams concurrently
        let stdout_reader = BufReader::new(stdout);
        let stderr_reader = BufReader::new(stderr);

        let stdout_handle = tokio::spawn(async move {
            let mut lines = stdout_reader.lines();
            let mut output = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if !output.is_empty() {
                    output.push('\n');
                }
                output.push_str(&line);
            }
            output
        });

        let stderr_handle = tokio::spawn(async move {
            let mut lines = stderr_reader.lines();
            let mut output = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if !output.is_empty() {
                    output.push('\n');
                }
                output.push_str(&line);
            }
            output
        });

        // Wait for exit, the timeout, or cancellation, whichever comes first
        let outcome = tokio::select! {
            result = async {
                match invocation.timeout {
                    Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                        Ok(result) => WaitOutcome::Exited(result),
                        Err(_) => WaitOutcome::TimedOut,
                    },
                    None => WaitOutcome::Exited(child.wait().await),
                }
            } => result,
            _ = cancelled_signal(cancel) => WaitOutcome::Cancelled,
        };

        match outcome {
            WaitOutcome::Exited(result) => {
                let (exit_code, error) = match result {
                    Ok(status) => {
                        let error = if status.code().is_none() {
                            Some("process terminated by signal".to_string())
                        } else {
                            None
                        };
                        (status.code(), error)
                    }
                    Err(e) => (None, Some(format!("failed to wait for process: {}", e))),
                };

                StepOutput {
                    stdout: stdout_handle.await.unwrap_or_default(),
                    stderr: stderr_handle.await.unwrap_or_default(),
                    exit_code,
                    error,
                    timed_out: false,
                    cancelled: false,
                }
            }
            WaitOutcome::TimedOut => {
                let _ = child.kill().await;
                StepOutput {
                    stdout: stdout_handle.await.unwrap_or_default(),
                    stderr: stderr_handle.await.unwrap_or_default(),
                    exit_code: None,
                    error: invocation
                        .timeout
                        .map(|limit| format!("step timed out after {:?}", limit)),
                    timed_out: true,
                    cancelled: false,
                }
            }
            WaitOutcome::Cancelled => {
                let _ = child.kill().await;
                StepOutput {
                    stdout: stdout_handle.await.unwrap_or_default(),
                    stderr: stderr_handle.await.unwrap_or_default(),
                    exit_code: None,
                    error: None,
                    timed_out: false,
                    cancelled: true,
                }
            }
        }
    }
}
