// Pipeline Declaration Models
// Serde models for the gantry pipeline YAML schema and run result types

use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A pipeline declaration: one job template, its matrix, and its triggers.
///
/// This is the top-level structure of a pipeline YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pipeline {
    /// Display name for the pipeline
    #[serde(default)]
    pub name: Option<String>,

    /// The repository event kinds that schedule a run
    #[serde(default, rename = "on")]
    pub on: Trigger,

    /// Pipeline-level environment variables applied to every step
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Default working directory for steps, relative to the run root
    #[serde(default, rename = "working-directory")]
    pub working_directory: Option<String>,

    /// Matrix axes in declaration order
    #[serde(default, deserialize_with = "deserialize_matrix")]
    pub matrix: Vec<MatrixAxis>,

    /// Abort sibling matrix instances as soon as one fails
    #[serde(default, rename = "fail-fast")]
    pub fail_fast: bool,

    /// Maximum instances running at once (0 = no limit)
    #[serde(default, rename = "max-parallel")]
    pub max_parallel: usize,

    /// The ordered steps every matrix instance runs
    pub steps: Vec<Step>,
}

impl Pipeline {
    /// Get a display name, falling back to a generic one.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("pipeline")
    }
}

/// Trigger configuration for when the pipeline should run.
///
/// Supports two forms:
/// - Single: `on: push`
/// - List: `on: [push, pull_request]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Trigger {
    /// Single event trigger: `on: push`
    Single(EventKind),

    /// Multiple events: `on: [push, pull_request]`
    Multiple(Vec<EventKind>),
}

impl Trigger {
    /// The declared event kinds as a list.
    pub fn kinds(&self) -> Vec<EventKind> {
        match self {
            Trigger::Single(kind) => vec![*kind],
            Trigger::Multiple(kinds) => kinds.clone(),
        }
    }

    /// Check whether the given kind is declared.
    pub fn declares(&self, kind: EventKind) -> bool {
        match self {
            Trigger::Single(declared) => *declared == kind,
            Trigger::Multiple(declared) => declared.contains(&kind),
        }
    }
}

impl Default for Trigger {
    // An omitted `on:` block runs for pushes and pull requests.
    fn default() -> Self {
        Trigger::Multiple(vec![EventKind::Push, EventKind::PullRequest])
    }
}

/// The kind of repository event that can schedule a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
    Schedule,
    Manual,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Push => "push",
            EventKind::PullRequest => "pull_request",
            EventKind::Schedule => "schedule",
            EventKind::Manual => "manual",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(EventKind::Push),
            "pull_request" => Ok(EventKind::PullRequest),
            "schedule" => Ok(EventKind::Schedule),
            "manual" => Ok(EventKind::Manual),
            other => Err(format!(
                "unknown event kind '{}' (expected push, pull_request, schedule, or manual)",
                other
            )),
        }
    }
}

/// A repository event delivered by the external version-control hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineEvent {
    pub kind: EventKind,
}

impl PipelineEvent {
    pub fn new(kind: EventKind) -> Self {
        Self { kind }
    }
}

/// One named matrix dimension and its values, in declaration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixAxis {
    pub name: String,
    pub values: Vec<String>,
}

/// A step within the job template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Display name for the step
    #[serde(default)]
    pub name: Option<String>,

    /// Shell command to run
    pub run: String,

    /// Working directory override for this step
    #[serde(default, rename = "working-directory")]
    pub working_directory: Option<String>,

    /// Step-level environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Step timeout in minutes
    #[serde(default, rename = "timeout-minutes")]
    pub timeout_minutes: Option<u64>,
}

impl Step {
    /// Get a display name for the step.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            name.clone()
        } else {
            // Truncate long commands, counting chars so multi-byte text
            // never splits mid-character
            let first_line = self.run.lines().next().unwrap_or(&self.run);
            if first_line.chars().count() > 50 {
                let truncated: String = first_line.chars().take(47).collect();
                format!("{}...", truncated)
            } else {
                first_line.to_string()
            }
        }
    }

    /// The declared timeout as a duration, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_minutes.map(|minutes| Duration::from_secs(minutes * 60))
    }
}

/// Custom deserializer keeping matrix axes in document order.
///
/// A plain `HashMap` would scramble the declaration order, which instance
/// generation and reporting both depend on.
fn deserialize_matrix<'de, D>(deserializer: D) -> Result<Vec<MatrixAxis>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, MapAccess, Visitor};

    struct MatrixVisitor;

    impl<'de> Visitor<'de> for MatrixVisitor {
        type Value = Vec<MatrixAxis>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a mapping of axis names to lists of values")
        }

        fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut axes = Vec::new();
            while let Some((name, raw_values)) =
                map.next_entry::<String, Vec<serde_yaml::Value>>()?
            {
                let mut values = Vec::with_capacity(raw_values.len());
                for raw in &raw_values {
                    values.push(scalar_to_string(raw).map_err(de::Error::custom)?);
                }
                axes.push(MatrixAxis { name, values });
            }
            Ok(axes)
        }
    }

    deserializer.deserialize_map(MatrixVisitor)
}

/// Coerce a YAML scalar to a string (so `1.70` works as a toolchain value)
fn scalar_to_string(value: &serde_yaml::Value) -> Result<String, String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!(
            "matrix values must be scalars, found: {:?}",
            other
        )),
    }
}

// ====== Run result types ======

/// Final status of a single executed step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Failed,
    Cancelled,
}

/// The record of one executed step
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Step display name
    pub name: String,
    /// The command that ran (after axis substitution)
    pub command: String,
    /// Final status
    pub status: StepStatus,
    /// Process exit code, when the process ran to termination
    pub exit_code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Failure detail for spawn errors and timeouts
    pub error: Option<String>,
    /// Wall-clock duration
    pub duration: Duration,
}

/// Outcome of one job instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Every step succeeded
    Success,
    /// Step at this index failed; later steps were never invoked
    FailedAt(usize),
    /// The run was aborted before this instance finished
    Cancelled,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success)
    }

    /// Index of the failing step, if the instance failed.
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            JobOutcome::FailedAt(index) => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Success => write!(f, "success"),
            JobOutcome::FailedAt(index) => write!(f, "failed_at({})", index),
            JobOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The record of one executed job instance
#[derive(Debug, Clone)]
pub struct JobResult {
    /// Instance label (axis values joined with ", ")
    pub label: String,
    /// Position in declaration order
    pub index: usize,
    /// The axis bindings this instance ran under
    pub bindings: Vec<(String, String)>,
    /// Instance outcome
    pub outcome: JobOutcome,
    /// Results for the steps that were actually executed
    pub steps: Vec<StepResult>,
    /// Wall-clock duration
    pub duration: Duration,
}

impl JobResult {
    /// The first failing step, if the instance failed.
    pub fn first_failure(&self) -> Option<&StepResult> {
        self.outcome
            .failed_index()
            .and_then(|index| self.steps.get(index))
    }
}

/// The record of a whole pipeline run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Pipeline display name
    pub pipeline_name: String,
    /// Job results in instance declaration order
    pub jobs: Vec<JobResult>,
    /// Wall-clock duration of the whole run
    pub duration: Duration,
    /// Whether the run was aborted (operator cancel or fail-fast)
    pub cancelled: bool,
}

impl RunResult {
    /// A run succeeds iff every instance succeeded.
    pub fn success(&self) -> bool {
        self.jobs.iter().all(|job| job.outcome.is_success())
    }

    pub fn passed_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.outcome.is_success())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.jobs.len() - self.passed_count()
    }
}
