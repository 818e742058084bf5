// Run Reporter
// Aggregates run results into terminal and JSON reports

use crate::parser::models::RunResult;

use serde::Serialize;
use std::fmt;

/// Output format for run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable terminal output
    Terminal,
    /// JSON for downstream tooling
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Terminal => write!(f, "terminal"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" | "text" | "console" => Ok(ReportFormat::Terminal),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!(
                "Unknown report format '{}'. Valid formats: terminal, json",
                s
            )),
        }
    }
}

/// Summary of one job instance
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    /// Instance label
    pub label: String,
    /// Outcome as a string ("success", "failed_at(i)", "cancelled")
    pub outcome: String,
    /// Whether the instance succeeded
    pub success: bool,
    /// Name of the first failing step, if any
    pub failed_step: Option<String>,
    /// Number of steps that actually ran
    pub steps_run: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Aggregated report for a whole run, ordered by instance declaration order
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Pipeline display name
    pub pipeline: String,
    /// Overall verdict: failure iff at least one instance did not succeed
    pub success: bool,
    /// Whether the run was aborted
    pub cancelled: bool,
    /// Instances that succeeded
    pub passed: usize,
    /// Instances that did not succeed
    pub failed: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Per-instance summaries in declaration order
    pub jobs: Vec<JobSummary>,
}

impl RunReport {
    /// Aggregate a run result.
    ///
    /// Job order follows the result's declaration order, not completion
    /// order.
    pub fn from_result(run: &RunResult) -> Self {
        let jobs = run
            .jobs
            .iter()
            .map(|job| JobSummary {
                label: job.label.clone(),
                outcome: job.outcome.to_string(),
                success: job.outcome.is_success(),
                failed_step: job.first_failure().map(|step| step.name.clone()),
                steps_run: job.steps.len(),
                duration_ms: job.duration.as_millis() as u64,
            })
            .collect();

        Self {
            pipeline: run.pipeline_name.clone(),
            success: run.success(),
            cancelled: run.cancelled,
            passed: run.passed_count(),
            failed: run.failed_count(),
            duration_ms: run.duration.as_millis() as u64,
            jobs,
        }
    }

    /// Render the report in the requested format
    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Terminal => self.to_terminal(),
            ReportFormat::Json => self.to_json(),
        }
    }

    /// Generate human-readable terminal output
    pub fn to_terminal(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("\nPipeline: {}\n", self.pipeline));
        out.push_str(&"=".repeat(60));
        out.push('\n');

        for job in &self.jobs {
            let (symbol, status) = if job.success {
                ("+", "PASS")
            } else if job.outcome == "cancelled" {
                ("-", "CANCELLED")
            } else {
                ("x", "FAIL")
            };

            out.push_str(&format!(
                "  [{}] {} ({:.2}s) {}\n",
                symbol,
                status,
                job.duration_ms as f64 / 1000.0,
                job.label,
            ));

            if let Some(failed_step) = &job.failed_step {
                out.push_str(&format!(
                    "       failed at '{}' (step {} of this instance)\n",
                    failed_step, job.steps_run,
                ));
            }
        }

        out.push_str(&"-".repeat(60));
        out.push('\n');

        let total = self.jobs.len();
        let status_line = if self.failed == 0 {
            format!(
                "  All {} jobs passed ({:.2}s)",
                total,
                self.duration_ms as f64 / 1000.0
            )
        } else {
            format!(
                "  {} of {} jobs failed ({:.2}s)",
                self.failed,
                total,
                self.duration_ms as f64 / 1000.0
            )
        };
        out.push_str(&status_line);
        out.push('\n');

        if self.cancelled {
            out.push_str("  run cancelled before completion\n");
        }

        out.push('\n');
        out
    }

    /// Generate JSON output for downstream tooling
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::models::{JobOutcome, JobResult, StepResult, StepStatus};
    use std::time::Duration;

    fn step(name: &str, status: StepStatus) -> StepResult {
        StepResult {
            name: name.to_string(),
            command: name.to_string(),
            status,
            exit_code: match status {
                StepStatus::Succeeded => Some(0),
                StepStatus::Failed => Some(1),
                StepStatus::Cancelled => None,
            },
            stdout: String::new(),
            stderr: String::new(),
            error: None,
            duration: Duration::from_millis(100),
        }
    }

    fn passing_job(index: usize, label: &str) -> JobResult {
        JobResult {
            label: label.to_string(),
            index,
            bindings: Vec::new(),
            outcome: JobOutcome::Success,
            steps: vec![
                step("build", StepStatus::Succeeded),
                step("test", StepStatus::Succeeded),
            ],
            duration: Duration::from_millis(1500),
        }
    }

    fn failing_job(index: usize, label: &str) -> JobResult {
        JobResult {
            label: label.to_string(),
            index,
            bindings: Vec::new(),
            outcome: JobOutcome::FailedAt(1),
            steps: vec![
                step("build", StepStatus::Succeeded),
                step("test", StepStatus::Failed),
            ],
            duration: Duration::from_millis(800),
        }
    }

    fn run(jobs: Vec<JobResult>, cancelled: bool) -> RunResult {
        RunResult {
            pipeline_name: "rust-ci".to_string(),
            jobs,
            duration: Duration::from_millis(2300),
            cancelled,
        }
    }

    #[test]
    fn test_report_preserves_declaration_order() {
        let result = run(
            vec![
                passing_job(0, "stable"),
                failing_job(1, "beta"),
                passing_job(2, "nightly"),
            ],
            false,
        );

        let report = RunReport::from_result(&result);
        let labels: Vec<_> = report.jobs.iter().map(|j| j.label.as_str()).collect();
        assert_eq!(labels, vec!["stable", "beta", "nightly"]);
        assert!(!report.success);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_terminal_output() {
        let result = run(vec![passing_job(0, "stable"), failing_job(1, "beta")], false);
        let terminal = RunReport::from_result(&result).to_terminal();

        assert!(terminal.contains("Pipeline: rust-ci"));
        assert!(terminal.contains("[+] PASS"));
        assert!(terminal.contains("[x] FAIL"));
        assert!(terminal.contains("failed at 'test'"));
        assert!(terminal.contains("1 of 2 jobs failed"));
    }

    #[test]
    fn test_terminal_all_pass() {
        let result = run(vec![passing_job(0, "stable"), passing_job(1, "beta")], false);
        let terminal = RunReport::from_result(&result).to_terminal();
        assert!(terminal.contains("All 2 jobs passed"));
    }

    #[test]
    fn test_terminal_notes_cancellation() {
        let mut cancelled_job = passing_job(1, "beta");
        cancelled_job.outcome = JobOutcome::Cancelled;
        cancelled_job.steps = vec![step("build", StepStatus::Succeeded)];

        let result = run(vec![passing_job(0, "stable"), cancelled_job], true);
        let terminal = RunReport::from_result(&result).to_terminal();

        assert!(terminal.contains("[-] CANCELLED"));
        assert!(terminal.contains("run cancelled before completion"));
    }

    #[test]
    fn test_json_output() {
        let result = run(vec![failing_job(0, "beta")], false);
        let json = RunReport::from_result(&result).to_json();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pipeline"], "rust-ci");
        assert_eq!(value["success"], false);
        assert_eq!(value["jobs"][0]["label"], "beta");
        assert_eq!(value["jobs"][0]["outcome"], "failed_at(1)");
        assert_eq!(value["jobs"][0]["failed_step"], "test");
    }

    #[test]
    fn test_report_format_parsing() {
        assert_eq!(
            "terminal".parse::<ReportFormat>().unwrap(),
            ReportFormat::Terminal
        );
        assert_eq!(
            "Console".parse::<ReportFormat>().unwrap(),
            ReportFormat::Terminal
        );
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("yaml".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_render_dispatches() {
        let result = run(vec![passing_job(0, "stable")], false);
        let report = RunReport::from_result(&result);

        assert!(report.render(ReportFormat::Terminal).contains("Pipeline:"));
        assert!(report.render(ReportFormat::Json).starts_with('{'));
    }
}
