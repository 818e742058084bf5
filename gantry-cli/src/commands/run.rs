use crate::output;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use gantry_engine::utils::resolve_run_root;
use gantry_engine::{
    progress_channel, EventKind, ExecContext, ExecutionEvent, Executor, ExecutorConfig, LogLevel,
    MatrixExpander, PipelineEvent, PipelineLoader, PipelineValidator, ReportFormat, RunReport,
    StepStatus, TriggerEvaluator,
};

/// Run a pipeline declaration
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the pipeline YAML file
    pub pipeline: PathBuf,

    /// Repository event to gate the run on (push, pull_request, schedule, manual)
    #[arg(long, value_name = "KIND")]
    pub event: Option<String>,

    /// Maximum instances running at once (0 = no limit)
    #[arg(long = "max-parallel", short = 'j', value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Abort sibling instances as soon as one fails
    #[arg(long)]
    pub fail_fast: bool,

    /// Run root for step working directories (default: enclosing repo root)
    #[arg(long = "working-dir", short = 'C', value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Report format (terminal, json)
    #[arg(long, value_name = "FORMAT", default_value = "terminal")]
    pub format: String,

    /// Print captured step output while running
    #[arg(long)]
    pub step_output: bool,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let pipeline_path = &args.pipeline;

    if !pipeline_path.exists() {
        color_eyre::eyre::bail!("Pipeline file not found: {}", pipeline_path.display());
    }

    let format: ReportFormat = args
        .format
        .parse()
        .map_err(|e: String| color_eyre::eyre::eyre!(e))?;

    // Parse and validate before anything runs
    output::status("Parsing", &format!("{}", pipeline_path.display()));
    let pipeline = PipelineLoader::parse_file(pipeline_path)
        .map_err(|e| color_eyre::eyre::eyre!("Parse error: {}", e.message))?;

    if let Err(errors) = PipelineValidator::validate(&pipeline) {
        output::error(&format!("{} validation error(s):", errors.len()));
        for error in &errors {
            output::error(&format!("  - [{}] {}", error.path, error.message));
        }
        std::process::exit(1);
    }

    // Trigger gating only applies when an event is delivered; a plain
    // `gantry run` is operator-requested and always proceeds.
    if let Some(kind) = &args.event {
        let kind: EventKind = kind.parse().map_err(|e: String| color_eyre::eyre::eyre!(e))?;
        let event = PipelineEvent::new(kind);
        if !TriggerEvaluator::should_run(&pipeline.on, &event) {
            output::warning(&TriggerEvaluator::skip_reason(&pipeline.on, &event));
            output::info("run skipped");
            return Ok(());
        }
    }

    let instances = MatrixExpander::expand(&pipeline)
        .map_err(|e| color_eyre::eyre::eyre!("Configuration error: {}", e))?;

    let run_root = match &args.working_dir {
        Some(dir) => dir.clone(),
        None => resolve_run_root(),
    };

    output::info(&format!(
        "Pipeline '{}': {} instance(s), {} step(s) each",
        pipeline.display_name(),
        instances.len(),
        pipeline.steps.len(),
    ));
    output::dim(&format!("  run root: {}", run_root.display()));

    // CLI flags override the declaration's own settings
    let config = ExecutorConfig {
        max_parallel: args.max_parallel.unwrap_or(pipeline.max_parallel),
        default_step_timeout: None,
        fail_fast: args.fail_fast || pipeline.fail_fast,
    };

    let (tx, mut rx) = progress_channel();
    let context = ExecContext::new(pipeline.display_name(), &run_root);
    let executor = Executor::new(context)
        .with_config(config)
        .with_progress(tx);

    // Ctrl-C kills in-flight steps; completed results are kept and reported
    let cancel = executor.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            output::warning("cancellation requested, stopping in-flight steps");
            cancel.cancel();
        }
    });

    let show_step_output = args.step_output;
    let exec_handle = tokio::spawn(async move { executor.run_all(instances).await });

    // Render events in the foreground while the run progresses
    while let Some(event) = rx.recv().await {
        match event {
            ExecutionEvent::RunStarted {
                pipeline_name,
                total_jobs,
            } => {
                println!();
                output::header(&format!("Pipeline '{}' ({} jobs)", pipeline_name, total_jobs));
            }

            ExecutionEvent::RunCompleted {
                success, duration, ..
            } => {
                println!();
                if success {
                    output::success(&format!(
                        "Run completed successfully in {:.2}s",
                        duration.as_secs_f64()
                    ));
                } else {
                    output::failure(&format!("Run failed after {:.2}s", duration.as_secs_f64()));
                }
            }

            ExecutionEvent::JobStarted {
                job_label,
                total_steps,
                ..
            } => {
                output::job_header(&job_label, total_steps);
            }

            ExecutionEvent::JobCompleted {
                job_label,
                outcome,
                duration,
                ..
            } => {
                output::outcome_line(
                    outcome.is_success(),
                    &format!(
                        "  Job '{}' {} ({:.2}s)",
                        job_label,
                        outcome,
                        duration.as_secs_f64()
                    ),
                );
            }

            ExecutionEvent::StepStarted {
                step_name,
                step_index,
                ..
            } => {
                println!("    [step {}] {}", step_index + 1, step_name);
            }

            ExecutionEvent::StepOutput {
                output, is_error, ..
            } => {
                if show_step_output {
                    for line in output.lines() {
                        if is_error {
                            output::step_error(line);
                        } else {
                            output::step_output(line);
                        }
                    }
                }
            }

            ExecutionEvent::StepCompleted {
                status,
                duration,
                exit_code,
                ..
            } => {
                let symbol = match status {
                    StepStatus::Succeeded => "OK",
                    StepStatus::Failed => "FAIL",
                    StepStatus::Cancelled => "CANCELLED",
                };
                let exit_info = match exit_code {
                    Some(code) if code != 0 => format!(" (exit code: {})", code),
                    _ => String::new(),
                };
                let line = format!(
                    "      {} ({:.2}s){}",
                    symbol,
                    duration.as_secs_f64(),
                    exit_info
                );
                match status {
                    StepStatus::Cancelled => output::warning(&line),
                    _ => output::outcome_line(status == StepStatus::Succeeded, &line),
                }
            }

            ExecutionEvent::Log { level, message } => match level {
                LogLevel::Error => output::error(&message),
                LogLevel::Warning => output::warning(&message),
                _ => output::dim(&message),
            },
        }
    }

    let result = exec_handle.await?;

    let report = RunReport::from_result(&result);
    match format {
        ReportFormat::Terminal => print!("{}", report.to_terminal()),
        ReportFormat::Json => println!("{}", report.to_json()),
    }

    if !result.success() {
        std::process::exit(1);
    }

    Ok(())
}
