// Pipeline YAML Loader
// Parses pipeline declaration files and runs semantic validation

use crate::parser::error::{ParseError, ParseErrorKind, ParseResult, ValidationError};
use crate::parser::models::{Pipeline, Step};

use std::fs;
use std::path::Path;

/// Pipeline declaration parser
pub struct PipelineLoader;

impl PipelineLoader {
    /// Parse a pipeline from a YAML string
    pub fn parse(content: &str) -> ParseResult<Pipeline> {
        let pipeline: Pipeline =
            serde_yaml::from_str(content).map_err(|e| ParseError::from_yaml_error(&e, content))?;

        Ok(pipeline)
    }

    /// Parse a pipeline from a file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<Pipeline> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ParseError::io_error(format!("failed to read {}: {}", path.display(), e))
        })?;

        Self::parse(&content)
    }

    /// Parse a pipeline and reject it if semantic validation fails
    pub fn parse_and_validate(content: &str) -> ParseResult<Pipeline> {
        let pipeline = Self::parse(content)?;

        if let Err(errors) = PipelineValidator::validate(&pipeline) {
            let message = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            return Err(ParseError::new(message, 0, 0).with_kind(ParseErrorKind::ValidationError));
        }

        Ok(pipeline)
    }
}

/// Validator for parsed pipeline declarations
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a parsed pipeline for semantic correctness
    pub fn validate(pipeline: &Pipeline) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if pipeline.steps.is_empty() {
            errors.push(
                ValidationError::new("pipeline has no steps", "steps")
                    .with_suggestion("add at least one step with a 'run' command"),
            );
        }

        Self::validate_matrix(pipeline, &mut errors);

        for (i, step) in pipeline.steps.iter().enumerate() {
            Self::validate_step(step, i, &mut errors);
        }

        Self::validate_placeholders(pipeline, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_matrix(pipeline: &Pipeline, errors: &mut Vec<ValidationError>) {
        let mut seen: Vec<&str> = Vec::new();

        for axis in &pipeline.matrix {
            if axis.values.is_empty() {
                errors.push(ValidationError::new(
                    format!("matrix axis '{}' has no values", axis.name),
                    format!("matrix.{}", axis.name),
                ));
            }

            if seen.contains(&axis.name.as_str()) {
                errors.push(ValidationError::new(
                    format!("duplicate matrix axis '{}'", axis.name),
                    format!("matrix.{}", axis.name),
                ));
            }
            seen.push(&axis.name);
        }
    }

    fn validate_step(step: &Step, index: usize, errors: &mut Vec<ValidationError>) {
        if step.run.trim().is_empty() {
            errors.push(
                ValidationError::new("step has an empty 'run' command", format!("steps[{}].run", index))
                    .with_suggestion("every step needs a shell command to execute"),
            );
        }

        if step.timeout_minutes == Some(0) {
            errors.push(
                ValidationError::new(
                    "'timeout-minutes' must be at least 1",
                    format!("steps[{}].timeout-minutes", index),
                )
                .with_suggestion("remove the key to run the step without a timeout"),
            );
        }
    }

    /// Check every `${{ name }}` reference against the declared matrix axes
    fn validate_placeholders(pipeline: &Pipeline, errors: &mut Vec<ValidationError>) {
        let declared: Vec<&str> = pipeline.matrix.iter().map(|a| a.name.as_str()).collect();

        let mut check = |input: &str, path: String| {
            for name in collect_placeholders(input) {
                if !declared.contains(&name.as_str()) {
                    let error = ValidationError::new(
                        format!("undeclared matrix axis '{}'", name),
                        path.clone(),
                    );
                    let error = if declared.is_empty() {
                        error.with_suggestion("declare the axis under 'matrix:'")
                    } else {
                        error.with_suggestion(format!("declared axes: {}", declared.join(", ")))
                    };
                    errors.push(error);
                }
            }
        };

        for (key, value) in &pipeline.env {
            check(value, format!("env.{}", key));
        }
        if let Some(dir) = &pipeline.working_directory {
            check(dir, "working-directory".to_string());
        }

        for (i, step) in pipeline.steps.iter().enumerate() {
            if let Some(name) = &step.name {
                check(name, format!("steps[{}].name", i));
            }
            check(&step.run, format!("steps[{}].run", i));
            if let Some(dir) = &step.working_directory {
                check(dir, format!("steps[{}].working-directory", i));
            }
            for (key, value) in &step.env {
                check(value, format!("steps[{}].env.{}", i, key));
            }
        }
    }
}

/// Collect the axis names referenced as `${{ name }}` in a string.
///
/// An opener without a closing `}}` is treated as literal text, matching
/// the substitution behavior at expansion time.
fn collect_placeholders(input: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find("${{") {
        let after = &rest[start + 3..];
        match after.find("}}") {
            Some(end) => {
                names.push(after[..end].trim().to_string());
                rest = &after[end + 2..];
            }
            None => break,
        }
    }

    names
}
