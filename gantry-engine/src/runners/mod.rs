// Runners Module
// Provides step execution runners

pub mod shell;

pub use shell::ShellRunner;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

/// Everything a runner needs to execute one step
#[derive(Debug, Clone)]
pub struct StepInvocation {
    /// Shell command to run
    pub command: String,
    /// Full environment for the spawned process
    pub env: HashMap<String, String>,
    /// Resolved working directory
    pub working_dir: PathBuf,
    /// Kill the process after this long, if set
    pub timeout: Option<Duration>,
}

/// Raw output of one step execution
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Exit code, when the process ran to termination
    pub exit_code: Option<i32>,
    /// Spawn or wait failure detail
    pub error: Option<String>,
    /// The step hit its timeout and was killed
    pub timed_out: bool,
    /// The step was killed by run cancellation
    pub cancelled: bool,
}

impl StepOutput {
    /// A step succeeds only with a clean zero exit
    pub fn success(&self) -> bool {
        !self.timed_out && !self.cancelled && self.error.is_none() && self.exit_code == Some(0)
    }
}

/// Trait for step runners
#[async_trait::async_trait]
pub trait StepRunner: Send + Sync {
    /// Execute one step to completion, honoring the cancel signal
    async fn run(
        &self,
        invocation: &StepInvocation,
        cancel: &mut watch::Receiver<bool>,
    ) -> StepOutput;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_output_success() {
        let output = StepOutput {
            exit_code: Some(0),
            ..Default::default()
        };
        assert!(output.success());
    }

    #[test]
    fn test_step_output_failures() {
        let failed = StepOutput {
            exit_code: Some(1),
            ..Default::default()
        };
        assert!(!failed.success());

        let spawn_error = StepOutput {
            error: Some("failed to spawn".to_string()),
            ..Default::default()
        };
        assert!(!spawn_error.success());

        let timed_out = StepOutput {
            exit_code: None,
            timed_out: true,
            ..Default::default()
        };
        assert!(!timed_out.success());

        let cancelled = StepOutput {
            exit_code: Some(0),
            cancelled: true,
            ..Default::default()
        };
        assert!(!cancelled.success());
    }
}
