// Matrix Expansion
// Expands a declaration's matrix into concrete job instances

use crate::error::ConfigError;
use crate::parser::models::{MatrixAxis, Pipeline, Step};

use std::collections::HashMap;
use std::time::Duration;

/// One step of a job instance, with every axis placeholder resolved
#[derive(Debug, Clone)]
pub struct ResolvedStep {
    /// Display name after substitution
    pub name: String,
    /// Shell command after substitution
    pub command: String,
    /// Working directory relative to the run root, if declared
    pub working_directory: Option<String>,
    /// Step-level environment after substitution
    pub env: HashMap<String, String>,
    /// Declared timeout, if any
    pub timeout: Option<Duration>,
}

/// A single job instance (one combination of matrix values)
#[derive(Debug, Clone)]
pub struct JobInstance {
    /// Position in expansion order
    pub index: usize,
    /// Human-readable label (axis values joined with ", ")
    pub label: String,
    /// Axis bindings in axis declaration order
    pub bindings: Vec<(String, String)>,
    /// Pipeline-level environment after substitution
    pub env: HashMap<String, String>,
    /// The steps this instance runs, in declaration order
    pub steps: Vec<ResolvedStep>,
}

/// Matrix expander for pipeline declarations
pub struct MatrixExpander;

impl MatrixExpander {
    /// Expand a pipeline into one instance per axis-value combination.
    ///
    /// A declaration without a matrix yields a single instance labeled
    /// "default". Instance order is row-major with the first declared axis
    /// as the outermost loop.
    pub fn expand(pipeline: &Pipeline) -> Result<Vec<JobInstance>, ConfigError> {
        if pipeline.steps.is_empty() {
            return Err(ConfigError::EmptySteps);
        }

        let mut seen: Vec<&str> = Vec::new();
        for axis in &pipeline.matrix {
            if axis.values.is_empty() {
                return Err(ConfigError::EmptyAxis {
                    axis: axis.name.clone(),
                });
            }
            if seen.contains(&axis.name.as_str()) {
                return Err(ConfigError::DuplicateAxis {
                    axis: axis.name.clone(),
                });
            }
            seen.push(&axis.name);
        }

        let combinations = Self::combinations(&pipeline.matrix);
        let mut instances = Vec::with_capacity(combinations.len());

        for (index, bindings) in combinations.into_iter().enumerate() {
            let label = if bindings.is_empty() {
                "default".to_string()
            } else {
                bindings
                    .iter()
                    .map(|(_, value)| value.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };

            let mut env = HashMap::new();
            for (key, value) in &pipeline.env {
                env.insert(
                    key.clone(),
                    substitute(value, &bindings, &format!("env.{}", key))?,
                );
            }

            let mut steps = Vec::with_capacity(pipeline.steps.len());
            for (i, step) in pipeline.steps.iter().enumerate() {
                steps.push(Self::resolve_step(step, pipeline, &bindings, i)?);
            }

            instances.push(JobInstance {
                index,
                label,
                bindings,
                env,
                steps,
            });
        }

        Ok(instances)
    }

    /// Cartesian product over the declared axes, declaration order preserved
    fn combinations(axes: &[MatrixAxis]) -> Vec<Vec<(String, String)>> {
        let mut combos: Vec<Vec<(String, String)>> = vec![Vec::new()];

        for axis in axes {
            let mut next = Vec::with_capacity(combos.len() * axis.values.len());
            for combo in &combos {
                for value in &axis.values {
                    let mut extended = combo.clone();
                    extended.push((axis.name.clone(), value.clone()));
                    next.push(extended);
                }
            }
            combos = next;
        }

        combos
    }

    /// Substitute one step's fields for a concrete combination
    fn resolve_step(
        step: &Step,
        pipeline: &Pipeline,
        bindings: &[(String, String)],
        index: usize,
    ) -> Result<ResolvedStep, ConfigError> {
        let command = substitute(&step.run, bindings, &format!("steps[{}].run", index))?;
        if command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand {
                step: step.display_name(),
            });
        }

        let name = substitute(
            &step.display_name(),
            bindings,
            &format!("steps[{}].name", index),
        )?;

        // Step-level override wins over the pipeline default
        let declared_dir = step
            .working_directory
            .as_ref()
            .or(pipeline.working_directory.as_ref());
        let working_directory = match declared_dir {
            Some(dir) => Some(substitute(
                dir,
                bindings,
                &format!("steps[{}].working-directory", index),
            )?),
            None => None,
        };

        let mut env = HashMap::new();
        for (key, value) in &step.env {
            env.insert(
                key.clone(),
                substitute(value, bindings, &format!("steps[{}].env.{}", index, key))?,
            );
        }

        Ok(ResolvedStep {
            name,
            command,
            working_directory,
            env,
            timeout: step.timeout(),
        })
    }
}

/// Replace `${{ name }}` placeholders with the bound axis values.
///
/// An opener without a closing `}}` passes through as literal text, as does
/// plain shell `$VAR` and `$(...)` syntax. Referencing an axis that has no
/// binding is a configuration error.
fn substitute(
    input: &str,
    bindings: &[(String, String)],
    location: &str,
) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 3..];

        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match bindings.iter().find(|(key, _)| key == name) {
                    Some((_, value)) => output.push_str(value),
                    None => {
                        return Err(ConfigError::UndeclaredAxis {
                            axis: name.to_string(),
                            location: location.to_string(),
                        });
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                output.push_str(&rest[start..]);
                return Ok(output);
            }
        }
    }

    output.push_str(rest);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PipelineLoader;

    fn parse(yaml: &str) -> Pipeline {
        PipelineLoader::parse(yaml).unwrap()
    }

    #[test]
    fn test_expand_single_axis() {
        let pipeline = parse(
            r#"
name: rust-ci
matrix:
  toolchain: [stable, beta, nightly]
steps:
  - run: rustup default ${{ toolchain }}
  - run: cargo build
"#,
        );

        let instances = MatrixExpander::expand(&pipeline).unwrap();
        assert_eq!(instances.len(), 3);

        let labels: Vec<_> = instances.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["stable", "beta", "nightly"]);

        assert_eq!(instances[1].index, 1);
        assert_eq!(instances[1].steps[0].command, "rustup default beta");
        assert_eq!(instances[1].steps[1].command, "cargo build");
        assert_eq!(
            instances[1].bindings,
            vec![("toolchain".to_string(), "beta".to_string())]
        );
    }

    #[test]
    fn test_expand_is_row_major() {
        let pipeline = parse(
            r#"
matrix:
  toolchain: [stable, beta]
  profile: [debug, release]
steps:
  - run: echo ${{ toolchain }}/${{ profile }}
"#,
        );

        let instances = MatrixExpander::expand(&pipeline).unwrap();
        let labels: Vec<_> = instances.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "stable, debug",
                "stable, release",
                "beta, debug",
                "beta, release"
            ]
        );
    }

    #[test]
    fn test_expand_without_matrix() {
        let pipeline = parse("steps:\n  - run: cargo test");
        let instances = MatrixExpander::expand(&pipeline).unwrap();

        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].label, "default");
        assert!(instances[0].bindings.is_empty());
    }

    #[test]
    fn test_env_overlay_is_distinct_per_instance() {
        let pipeline = parse(
            r#"
matrix:
  profile: [debug, release]
env:
  TARGET_DIR: target/${{ profile }}
steps:
  - run: cargo build
    env:
      PROFILE: ${{ profile }}
"#,
        );

        let instances = MatrixExpander::expand(&pipeline).unwrap();
        assert_eq!(
            instances[0].env.get("TARGET_DIR").map(String::as_str),
            Some("target/debug")
        );
        assert_eq!(
            instances[1].env.get("TARGET_DIR").map(String::as_str),
            Some("target/release")
        );
        assert_eq!(
            instances[1].steps[0].env.get("PROFILE").map(String::as_str),
            Some("release")
        );
    }

    #[test]
    fn test_working_directory_override() {
        let pipeline = parse(
            r#"
matrix:
  crate: [engine, cli]
working-directory: crates/${{ crate }}
steps:
  - run: cargo build
  - run: cargo doc
    working-directory: docs
"#,
        );

        let instances = MatrixExpander::expand(&pipeline).unwrap();
        assert_eq!(
            instances[0].steps[0].working_directory.as_deref(),
            Some("crates/engine")
        );
        assert_eq!(instances[0].steps[1].working_directory.as_deref(), Some("docs"));
    }

    #[test]
    fn test_placeholder_whitespace_is_optional() {
        let pipeline = parse(
            r#"
matrix:
  os: [linux]
steps:
  - run: echo ${{os}} and ${{  os  }}
"#,
        );

        let instances = MatrixExpander::expand(&pipeline).unwrap();
        assert_eq!(instances[0].steps[0].command, "echo linux and linux");
    }

    #[test]
    fn test_shell_syntax_passes_through() {
        let pipeline = parse(
            r#"
steps:
  - run: echo $HOME $(date) ${PWD}
"#,
        );

        let instances = MatrixExpander::expand(&pipeline).unwrap();
        assert_eq!(instances[0].steps[0].command, "echo $HOME $(date) ${PWD}");
    }

    #[test]
    fn test_unterminated_placeholder_is_literal() {
        let pipeline = parse(
            r#"
steps:
  - run: "echo ${{ oops"
"#,
        );

        let instances = MatrixExpander::expand(&pipeline).unwrap();
        assert_eq!(instances[0].steps[0].command, "echo ${{ oops");
    }

    #[test]
    fn test_undeclared_axis_fails_expansion() {
        let pipeline = parse(
            r#"
matrix:
  toolchain: [stable]
steps:
  - run: cargo +${{ toolchain }} test --target ${{ target }}
"#,
        );

        let err = MatrixExpander::expand(&pipeline).unwrap_err();
        match err {
            ConfigError::UndeclaredAxis { axis, location } => {
                assert_eq!(axis, "target");
                assert_eq!(location, "steps[0].run");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_steps_fails_expansion() {
        let pipeline = parse("steps: []");
        assert!(matches!(
            MatrixExpander::expand(&pipeline),
            Err(ConfigError::EmptySteps)
        ));
    }

    #[test]
    fn test_empty_axis_fails_expansion() {
        let pipeline = parse(
            r#"
matrix:
  os: []
steps:
  - run: echo hi
"#,
        );

        assert!(matches!(
            MatrixExpander::expand(&pipeline),
            Err(ConfigError::EmptyAxis { .. })
        ));
    }

    #[test]
    fn test_expand_handles_long_multibyte_unnamed_step() {
        // An unnamed step's label comes from a truncation of its command;
        // multi-byte text at the cut point must expand cleanly, not abort
        let yaml = format!(
            "matrix:\n  toolchain: [stable]\nsteps:\n  - run: {}é {}\n",
            "a".repeat(46),
            "${{ toolchain }}"
        );
        let pipeline = parse(&yaml);

        let instances = MatrixExpander::expand(&pipeline).unwrap();
        assert!(instances[0].steps[0].name.ends_with("é..."));
        assert_eq!(instances[0].steps[0].name.chars().count(), 50);
        assert!(instances[0].steps[0].command.ends_with("stable"));
    }

    #[test]
    fn test_step_name_substitution() {
        let pipeline = parse(
            r#"
matrix:
  toolchain: [beta]
steps:
  - name: test on ${{ toolchain }}
    run: cargo test
"#,
        );

        let instances = MatrixExpander::expand(&pipeline).unwrap();
        assert_eq!(instances[0].steps[0].name, "test on beta");
    }
}
