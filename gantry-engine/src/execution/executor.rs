// Pipeline Executor
// Runs expanded job instances with bounded parallelism, fail-fast, and cancellation

use crate::execution::context::ExecContext;
use crate::execution::events::{EventSender, ExecutionEvent, ProgressSender};
use crate::execution::matrix::JobInstance;
use crate::parser::models::{JobOutcome, JobResult, RunResult, StepResult, StepStatus};
use crate::runners::{ShellRunner, StepInvocation, StepRunner};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, Semaphore};

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum instances running at once (0 = no limit)
    pub max_parallel: usize,
    /// Timeout applied to steps that do not declare their own
    pub default_step_timeout: Option<Duration>,
    /// Abort sibling instances as soon as one fails
    pub fail_fast: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_parallel: 0,
            default_step_timeout: None,
            fail_fast: false,
        }
    }
}

/// Handle for aborting a run in flight.
///
/// Cancelling kills the currently running step of every instance and keeps
/// the results of steps that already completed.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Request cancellation of the run
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Pipeline executor
pub struct Executor {
    /// Configuration
    config: ExecutorConfig,
    /// Shared run context (ambient env, run root)
    context: Arc<ExecContext>,
    /// Step runner, swappable for tests
    runner: Arc<dyn StepRunner>,
    /// Progress event sender
    event_tx: Option<ProgressSender>,
    /// Cancellation signal shared by every instance
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl Executor {
    /// Create an executor with the default shell runner
    pub fn new(context: ExecContext) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            config: ExecutorConfig::default(),
            context: Arc::new(context),
            runner: Arc::new(ShellRunner::new()),
            event_tx: None,
            cancel_tx: Arc::new(cancel_tx),
        }
    }

    /// Set executor configuration
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set progress event sender
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Replace the step runner
    pub fn with_runner(mut self, runner: Arc<dyn StepRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Get a handle that aborts this executor's runs
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// Run a single instance to completion
    pub async fn run(&self, instance: JobInstance) -> JobResult {
        let cancel = self.cancel_tx.subscribe();
        run_instance(
            instance,
            self.context.clone(),
            self.runner.clone(),
            self.config.default_step_timeout,
            self.event_tx.clone(),
            cancel,
        )
        .await
    }

    /// Run every instance, bounded by `max_parallel`.
    ///
    /// Instances are scheduled concurrently but results always come back in
    /// instance declaration order, regardless of completion order. With
    /// `fail_fast` set, the first failing instance raises the cancel signal
    /// for its siblings; instances that already completed keep their results.
    pub async fn run_all(&self, instances: Vec<JobInstance>) -> RunResult {
        let start = Instant::now();
        let pipeline_name = self.context.pipeline_name.clone();
        let total = instances.len();

        self.event_tx
            .send_event(ExecutionEvent::run_started(&pipeline_name, total));

        let permits = if self.config.max_parallel == 0 {
            total.max(1)
        } else {
            self.config.max_parallel
        };
        let semaphore = Arc::new(Semaphore::new(permits));
        let results = Arc::new(Mutex::new(Vec::with_capacity(total)));

        let mut handles = Vec::with_capacity(total);
        for instance in instances {
            let semaphore = semaphore.clone();
            let results = results.clone();
            let context = self.context.clone();
            let runner = self.runner.clone();
            let event_tx = self.event_tx.clone();
            let default_timeout = self.config.default_step_timeout;
            let fail_fast = self.config.fail_fast;
            let cancel_tx = self.cancel_tx.clone();
            let cancel = self.cancel_tx.subscribe();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();

                // An instance that never got to start still reports a result
                let result = if *cancel.borrow() {
                    cancelled_result(instance)
                } else {
                    run_instance(instance, context, runner, default_timeout, event_tx, cancel)
                        .await
                };

                if fail_fast && !result.outcome.is_success() {
                    let _ = cancel_tx.send(true);
                }

                results.lock().await.push(result);
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        let mut jobs = std::mem::take(&mut *results.lock().await);
        jobs.sort_by_key(|job| job.index);

        let cancelled = *self.cancel_tx.borrow();
        let duration = start.elapsed();
        let result = RunResult {
            pipeline_name: pipeline_name.clone(),
            jobs,
            duration,
            cancelled,
        };

        self.event_tx.send_event(ExecutionEvent::run_completed(
            &pipeline_name,
            result.success(),
            duration,
        ));

        result
    }
}

/// Execute one instance's steps strictly in declaration order.
///
/// The first failing step ends the instance; steps after it are never
/// invoked and never recorded.
async fn run_instance(
    instance: JobInstance,
    context: Arc<ExecContext>,
    runner: Arc<dyn StepRunner>,
    default_timeout: Option<Duration>,
    event_tx: Option<ProgressSender>,
    mut cancel: watch::Receiver<bool>,
) -> JobResult {
    let start = Instant::now();

    event_tx.send_event(ExecutionEvent::job_started(
        &instance.label,
        instance.index,
        instance.steps.len(),
    ));

    let mut steps = Vec::new();
    let mut outcome = JobOutcome::Success;

    for (step_index, step) in instance.steps.iter().enumerate() {
        if *cancel.borrow() {
            outcome = JobOutcome::Cancelled;
            break;
        }

        event_tx.send_event(ExecutionEvent::step_started(
            &instance.label,
            &step.name,
            step_index,
        ));

        let invocation = StepInvocation {
            command: step.command.clone(),
            env: context.step_env(&instance, step),
            working_dir: context.resolve_dir(step),
            timeout: step.timeout.or(default_timeout),
        };

        let step_start = Instant::now();
        let output = runner.run(&invocation, &mut cancel).await;
        let step_duration = step_start.elapsed();

        let status = if output.cancelled {
            StepStatus::Cancelled
        } else if output.success() {
            StepStatus::Succeeded
        } else {
            StepStatus::Failed
        };

        if !output.stdout.is_empty() {
            event_tx.send_event(ExecutionEvent::step_output(
                &instance.label,
                step_index,
                &output.stdout,
                false,
            ));
        }
        if !output.stderr.is_empty() {
            event_tx.send_event(ExecutionEvent::step_output(
                &instance.label,
                step_index,
                &output.stderr,
                true,
            ));
        }

        event_tx.send_event(ExecutionEvent::step_completed(
            &instance.label,
            &step.name,
            step_index,
            status,
            step_duration,
            output.exit_code,
        ));

        steps.push(StepResult {
            name: step.name.clone(),
            command: step.command.clone(),
            status,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            error: output.error,
            duration: step_duration,
        });

        match status {
            StepStatus::Succeeded => {}
            StepStatus::Failed => {
                outcome = JobOutcome::FailedAt(step_index);
                break;
            }
            StepStatus::Cancelled => {
                outcome = JobOutcome::Cancelled;
                break;
            }
        }
    }

    let duration = start.elapsed();

    event_tx.send_event(ExecutionEvent::job_completed(
        &instance.label,
        instance.index,
        outcome,
        duration,
    ));

    JobResult {
        label: instance.label,
        index: instance.index,
        bindings: instance.bindings,
        outcome,
        steps,
        duration,
    }
}

/// Result for an instance cancelled before any of its steps started
fn cancelled_result(instance: JobInstance) -> JobResult {
    JobResult {
        label: instance.label,
        index: instance.index,
        bindings: instance.bindings,
        outcome: JobOutcome::Cancelled,
        steps: Vec::new(),
        duration: Duration::ZERO,
    }
}
