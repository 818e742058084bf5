use crate::output;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use gantry_engine::{JobInstance, MatrixExpander, PipelineLoader, PipelineValidator};

/// Validate a pipeline declaration without running it
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the pipeline YAML file
    pub pipeline: PathBuf,

    /// Skip checking step programs against PATH
    #[arg(long)]
    pub no_path_check: bool,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let pipeline_path = &args.pipeline;

    if !pipeline_path.exists() {
        color_eyre::eyre::bail!("Pipeline file not found: {}", pipeline_path.display());
    }

    // Step 1: YAML syntax and schema
    output::status("Validating", &format!("{}", pipeline_path.display()));

    let pipeline = match PipelineLoader::parse_file(pipeline_path) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            output::error(&format!("Parse error: {}", e.message));
            if !e.context.is_empty() {
                eprintln!("{}", e.context);
            }
            if let Some(suggestion) = &e.suggestion {
                output::info(&format!("Suggestion: {}", suggestion));
            }
            std::process::exit(1);
        }
    };

    output::check("YAML syntax valid");
    output::check(&format!(
        "Structure: {} trigger(s), {} matrix axes, {} step(s)",
        pipeline.on.kinds().len(),
        pipeline.matrix.len(),
        pipeline.steps.len()
    ));

    // Step 2: semantic validation, all findings at once
    match PipelineValidator::validate(&pipeline) {
        Ok(()) => {
            output::check("Semantic validation passed");
        }
        Err(errors) => {
            output::error(&format!("{} validation error(s):", errors.len()));
            for error in &errors {
                output::error(&format!("  - [{}] {}", error.path, error.message));
                if let Some(suggestion) = &error.suggestion {
                    output::info(&format!("    {}", suggestion));
                }
            }
            std::process::exit(1);
        }
    }

    // Step 3: matrix expansion doubles as the pre-flight the executor runs
    let instances = match MatrixExpander::expand(&pipeline) {
        Ok(instances) => instances,
        Err(e) => {
            output::error(&format!("Configuration error: {}", e));
            std::process::exit(1);
        }
    };
    output::check(&format!("Matrix expands to {} instance(s)", instances.len()));

    // Step 4: PATH warnings (optional, never fatal)
    if !args.no_path_check {
        warn_missing_programs(&instances);
    }

    println!();
    output::success("Pipeline is valid");

    Ok(())
}

/// Warn for step programs that do not resolve on PATH.
///
/// Only a command's first token is checked, and only when it looks like a
/// plain program name; anything with shell syntax is left to the shell.
fn warn_missing_programs(instances: &[JobInstance]) {
    let mut checked: Vec<&str> = Vec::new();

    for instance in instances {
        for step in &instance.steps {
            let Some(program) = step.command.split_whitespace().next() else {
                continue;
            };
            if checked.contains(&program) {
                continue;
            }
            checked.push(program);

            if program.chars().any(|c| "$`(){}[]|&;<>\"'=".contains(c)) {
                continue;
            }
            if SHELL_BUILTINS.contains(&program) {
                continue;
            }
            if which::which(program).is_err() {
                output::warning(&format!("program '{}' not found on PATH", program));
            }
        }
    }
}

const SHELL_BUILTINS: &[&str] = &[
    "cd", "echo", "exit", "export", "set", "test", "true", "false", ".", ":",
];
