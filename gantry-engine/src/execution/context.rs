// Scoped Execution Context
// Builds per-step environment and working directory without touching process state

use crate::execution::matrix::{JobInstance, ResolvedStep};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Execution context shared by every instance of a run.
///
/// The ambient environment is captured once at construction. Each step gets
/// a freshly merged environment map handed to its spawned process, so no
/// overlay ever leaks between steps, between instances, or back into the
/// executor's own process.
#[derive(Debug, Clone)]
pub struct ExecContext {
    /// Pipeline display name, injected as PIPELINE_NAME
    pub pipeline_name: String,
    /// Directory that relative working directories resolve against
    pub run_root: PathBuf,
    /// Ambient process environment captured at construction
    ambient: HashMap<String, String>,
}

impl ExecContext {
    /// Create a context, capturing the current process environment
    pub fn new(pipeline_name: impl Into<String>, run_root: impl Into<PathBuf>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            run_root: run_root.into(),
            ambient: std::env::vars().collect(),
        }
    }

    /// Create a context with an explicit ambient environment
    pub fn with_ambient(
        pipeline_name: impl Into<String>,
        run_root: impl Into<PathBuf>,
        ambient: HashMap<String, String>,
    ) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            run_root: run_root.into(),
            ambient,
        }
    }

    /// Build the full environment for one step.
    ///
    /// Layering, lowest precedence first: ambient process environment,
    /// instance overlay (pipeline `env` after substitution), injected
    /// coordinate variables, step-level `env`.
    pub fn step_env(
        &self,
        instance: &JobInstance,
        step: &ResolvedStep,
    ) -> HashMap<String, String> {
        let mut env = self.ambient.clone();

        for (key, value) in &instance.env {
            env.insert(key.clone(), value.clone());
        }

        env.insert("PIPELINE_NAME".to_string(), self.pipeline_name.clone());
        env.insert("PIPELINE_JOB".to_string(), instance.label.clone());
        for (axis, value) in &instance.bindings {
            env.insert(format!("MATRIX_{}", env_var_name(axis)), value.clone());
        }

        for (key, value) in &step.env {
            env.insert(key.clone(), value.clone());
        }

        env
    }

    /// Resolve a step's working directory against the run root.
    ///
    /// An absolute declared path is taken as-is; a step without a declared
    /// directory runs in the run root.
    pub fn resolve_dir(&self, step: &ResolvedStep) -> PathBuf {
        match &step.working_directory {
            Some(dir) => {
                let path = Path::new(dir);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.run_root.join(path)
                }
            }
            None => self.run_root.clone(),
        }
    }
}

/// Mangle an axis name into environment-variable form
fn env_var_name(axis: &str) -> String {
    axis.to_uppercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(env: &[(&str, &str)], dir: Option<&str>) -> ResolvedStep {
        ResolvedStep {
            name: "step".to_string(),
            command: "true".to_string(),
            working_directory: dir.map(String::from),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            timeout: None,
        }
    }

    fn instance(env: &[(&str, &str)], bindings: &[(&str, &str)]) -> JobInstance {
        JobInstance {
            index: 0,
            label: "stable".to_string(),
            bindings: bindings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            steps: Vec::new(),
        }
    }

    fn context(ambient: &[(&str, &str)]) -> ExecContext {
        ExecContext::with_ambient(
            "ci",
            "/repo",
            ambient
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_env_layering_precedence() {
        let ctx = context(&[("SHARED", "ambient"), ("AMBIENT_ONLY", "yes")]);
        let inst = instance(&[("SHARED", "instance"), ("RUSTFLAGS", "-D warnings")], &[]);
        let st = step(&[("SHARED", "step")], None);

        let env = ctx.step_env(&inst, &st);
        assert_eq!(env.get("SHARED").map(String::as_str), Some("step"));
        assert_eq!(env.get("AMBIENT_ONLY").map(String::as_str), Some("yes"));
        assert_eq!(env.get("RUSTFLAGS").map(String::as_str), Some("-D warnings"));
    }

    #[test]
    fn test_instance_overlay_beats_ambient() {
        let ctx = context(&[("CC", "cc")]);
        let inst = instance(&[("CC", "clang")], &[]);
        let env = ctx.step_env(&inst, &step(&[], None));
        assert_eq!(env.get("CC").map(String::as_str), Some("clang"));
    }

    #[test]
    fn test_coordinate_injection() {
        let ctx = context(&[]);
        let inst = instance(&[], &[("toolchain", "stable"), ("target-os", "linux")]);
        let env = ctx.step_env(&inst, &step(&[], None));

        assert_eq!(env.get("PIPELINE_NAME").map(String::as_str), Some("ci"));
        assert_eq!(env.get("PIPELINE_JOB").map(String::as_str), Some("stable"));
        assert_eq!(env.get("MATRIX_TOOLCHAIN").map(String::as_str), Some("stable"));
        assert_eq!(env.get("MATRIX_TARGET_OS").map(String::as_str), Some("linux"));
    }

    #[test]
    fn test_resolve_relative_dir() {
        let ctx = context(&[]);
        assert_eq!(
            ctx.resolve_dir(&step(&[], Some("crates/engine"))),
            PathBuf::from("/repo/crates/engine")
        );
    }

    #[test]
    fn test_resolve_absolute_dir() {
        let ctx = context(&[]);
        assert_eq!(
            ctx.resolve_dir(&step(&[], Some("/tmp/build"))),
            PathBuf::from("/tmp/build")
        );
    }

    #[test]
    fn test_resolve_default_dir() {
        let ctx = context(&[]);
        assert_eq!(ctx.resolve_dir(&step(&[], None)), PathBuf::from("/repo"));
    }
}
