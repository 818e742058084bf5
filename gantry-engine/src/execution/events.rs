// Execution Events
// Progress reporting and event types for pipeline runs

use crate::parser::models::{JobOutcome, StepStatus};

use std::time::Duration;
use tokio::sync::mpsc;

/// Sender for execution progress events
pub type ProgressSender = mpsc::UnboundedSender<ExecutionEvent>;

/// Receiver for execution progress events
pub type ProgressReceiver = mpsc::UnboundedReceiver<ExecutionEvent>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted during a pipeline run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Run started
    RunStarted {
        pipeline_name: String,
        total_jobs: usize,
    },

    /// Run completed
    RunCompleted {
        pipeline_name: String,
        success: bool,
        duration: Duration,
    },

    /// Job instance started
    JobStarted {
        job_label: String,
        job_index: usize,
        total_steps: usize,
    },

    /// Job instance completed
    JobCompleted {
        job_label: String,
        job_index: usize,
        outcome: JobOutcome,
        duration: Duration,
    },

    /// Step execution started
    StepStarted {
        job_label: String,
        step_name: String,
        step_index: usize,
    },

    /// Step output (stdout/stderr)
    StepOutput {
        job_label: String,
        step_index: usize,
        output: String,
        is_error: bool,
    },

    /// Step execution completed
    StepCompleted {
        job_label: String,
        step_name: String,
        step_index: usize,
        status: StepStatus,
        duration: Duration,
        exit_code: Option<i32>,
    },

    /// Log message (info, warning, error)
    Log { level: LogLevel, message: String },
}

/// Log level for log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl ExecutionEvent {
    /// Create a run started event
    pub fn run_started(name: impl Into<String>, total_jobs: usize) -> Self {
        Self::RunStarted {
            pipeline_name: name.into(),
            total_jobs,
        }
    }

    /// Create a run completed event
    pub fn run_completed(name: impl Into<String>, success: bool, duration: Duration) -> Self {
        Self::RunCompleted {
            pipeline_name: name.into(),
            success,
            duration,
        }
    }

    /// Create a job started event
    pub fn job_started(label: impl Into<String>, job_index: usize, total_steps: usize) -> Self {
        Self::JobStarted {
            job_label: label.into(),
            job_index,
            total_steps,
        }
    }

    /// Create a job completed event
    pub fn job_completed(
        label: impl Into<String>,
        job_index: usize,
        outcome: JobOutcome,
        duration: Duration,
    ) -> Self {
        Self::JobCompleted {
            job_label: label.into(),
            job_index,
            outcome,
            duration,
        }
    }

    /// Create a step started event
    pub fn step_started(
        label: impl Into<String>,
        step_name: impl Into<String>,
        step_index: usize,
    ) -> Self {
        Self::StepStarted {
            job_label: label.into(),
            step_name: step_name.into(),
            step_index,
        }
    }

    /// Create a step output event
    pub fn step_output(
        label: impl Into<String>,
        step_index: usize,
        output: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::StepOutput {
            job_label: label.into(),
            step_index,
            output: output.into(),
            is_error,
        }
    }

    /// Create a step completed event
    pub fn step_completed(
        label: impl Into<String>,
        step_name: impl Into<String>,
        step_index: usize,
        status: StepStatus,
        duration: Duration,
        exit_code: Option<i32>,
    ) -> Self {
        Self::StepCompleted {
            job_label: label.into(),
            step_name: step_name.into(),
            step_index,
            status,
            duration,
            exit_code,
        }
    }

    /// Create an info log event
    pub fn info(message: impl Into<String>) -> Self {
        Self::Log {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    /// Create a warning log event
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Log {
            level: LogLevel::Warning,
            message: message.into(),
        }
    }

    /// Create an error log event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Log {
            level: LogLevel::Error,
            message: message.into(),
        }
    }
}

/// Helper trait for sending events, ignoring errors (fire-and-forget)
pub trait EventSender {
    fn send_event(&self, event: ExecutionEvent);
}

impl EventSender for ProgressSender {
    fn send_event(&self, event: ExecutionEvent) {
        let _ = self.send(event);
    }
}

impl EventSender for Option<ProgressSender> {
    fn send_event(&self, event: ExecutionEvent) {
        if let Some(sender) = self {
            let _ = sender.send(event);
        }
    }
}
