// End-to-end run scenarios through the public API with real shell steps

use gantry_engine::{
    EventKind, ExecContext, Executor, ExecutorConfig, JobOutcome, MatrixExpander, PipelineEvent,
    PipelineLoader, RunReport, TriggerEvaluator,
};

use std::collections::HashMap;
use std::path::Path;

/// The shell runner spawns children without the inherited environment, so
/// PATH has to be part of the captured ambient set.
fn context(name: &str, root: &Path) -> ExecContext {
    let mut ambient = HashMap::new();
    ambient.insert(
        "PATH".to_string(),
        std::env::var("PATH").unwrap_or_default(),
    );
    ExecContext::with_ambient(name, root, ambient)
}

#[tokio::test]
async fn test_toolchain_matrix_with_beta_failure() {
    let yaml = r#"
name: rust-ci
on: [push, pull_request]

matrix:
  toolchain: [stable, beta, nightly]

steps:
  - name: build
    run: echo building ${{ toolchain }}
  - name: test
    run: '[ "${{ toolchain }}" != beta ]'
  - name: fmt-check
    run: echo fmt ${{ toolchain }}
  - name: lint
    run: echo lint ${{ toolchain }}
"#;

    let pipeline = PipelineLoader::parse_and_validate(yaml).unwrap();
    let instances = MatrixExpander::expand(&pipeline).unwrap();
    assert_eq!(instances.len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(context("rust-ci", dir.path()));
    let result = executor.run_all(instances).await;

    assert!(!result.success());
    assert!(!result.cancelled);

    let labels: Vec<_> = result.jobs.iter().map(|j| j.label.as_str()).collect();
    assert_eq!(labels, vec!["stable", "beta", "nightly"]);

    // stable and nightly run all four steps
    assert_eq!(result.jobs[0].outcome, JobOutcome::Success);
    assert_eq!(result.jobs[0].steps.len(), 4);
    assert!(result.jobs[0].steps[0].stdout.contains("building stable"));
    assert_eq!(result.jobs[2].outcome, JobOutcome::Success);
    assert_eq!(result.jobs[2].steps.len(), 4);

    // beta stops at its test step; fmt-check and lint never ran
    assert_eq!(result.jobs[1].outcome, JobOutcome::FailedAt(1));
    assert_eq!(result.jobs[1].steps.len(), 2);
    assert_eq!(result.jobs[1].first_failure().unwrap().name, "test");

    let report = RunReport::from_result(&result);
    assert!(!report.success);
    assert_eq!(report.passed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.jobs[1].failed_step.as_deref(), Some("test"));
}

#[tokio::test]
async fn test_env_overlay_does_not_leak() {
    // The first step declares RUSTFLAGS for its own invocation only; the
    // second step, and every sibling instance, must not observe it.
    let yaml = r#"
matrix:
  lane: [one, two]

steps:
  - name: strict
    run: echo strict=$RUSTFLAGS
    env:
      RUSTFLAGS: -Dwarnings
  - name: plain
    run: echo plain=$RUSTFLAGS
"#;

    let pipeline = PipelineLoader::parse_and_validate(yaml).unwrap();
    let instances = MatrixExpander::expand(&pipeline).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(context("env-scope", dir.path()));
    let result = executor.run_all(instances).await;

    assert!(result.success());
    for job in &result.jobs {
        assert!(job.steps[0].stdout.contains("strict=-Dwarnings"));
        assert_eq!(job.steps[1].stdout.trim(), "plain=");
    }
}

#[tokio::test]
async fn test_undeclared_trigger_skips_the_run() {
    let yaml = r#"
on: [push, pull_request]
steps:
  - run: echo should not execute
"#;

    let pipeline = PipelineLoader::parse_and_validate(yaml).unwrap();

    for kind in [EventKind::Push, EventKind::PullRequest] {
        assert!(TriggerEvaluator::should_run(
            &pipeline.on,
            &PipelineEvent::new(kind)
        ));
    }

    // A non-declared kind skips before expansion; nothing runs and no
    // result exists for it.
    let event = PipelineEvent::new(EventKind::Schedule);
    assert!(!TriggerEvaluator::should_run(&pipeline.on, &event));
    let reason = TriggerEvaluator::skip_reason(&pipeline.on, &event);
    assert!(reason.contains("schedule"));
}

#[tokio::test]
async fn test_working_directories_resolve_per_step() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("svc")).unwrap();
    std::fs::create_dir_all(root.join("docs")).unwrap();
    std::fs::write(root.join("svc/marker.txt"), "from svc").unwrap();
    std::fs::write(root.join("docs/marker.txt"), "from docs").unwrap();

    let yaml = r#"
working-directory: svc
steps:
  - name: default dir
    run: cat marker.txt
  - name: override dir
    run: cat marker.txt
    working-directory: docs
"#;

    let pipeline = PipelineLoader::parse_and_validate(yaml).unwrap();
    let instances = MatrixExpander::expand(&pipeline).unwrap();

    let executor = Executor::new(context("workdirs", root));
    let result = executor.run_all(instances).await;

    assert!(result.success());
    let job = &result.jobs[0];
    assert!(job.steps[0].stdout.contains("from svc"));
    assert!(job.steps[1].stdout.contains("from docs"));
}

#[tokio::test]
async fn test_missing_program_is_contained_to_its_instance() {
    let yaml = r#"
matrix:
  lane: [broken, healthy]

steps:
  - name: maybe-missing
    run: ${{ lane }}-program-that-does-not-exist-anywhere || [ "${{ lane }}" = healthy ]
  - name: after
    run: echo after ${{ lane }}
"#;

    let pipeline = PipelineLoader::parse_and_validate(yaml).unwrap();
    let instances = MatrixExpander::expand(&pipeline).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(context("containment", dir.path()))
        .with_config(ExecutorConfig {
            max_parallel: 2,
            ..Default::default()
        });
    let result = executor.run_all(instances).await;

    // The broken lane fails at its first step and runs nothing more; the
    // healthy lane is unaffected.
    assert_eq!(result.jobs[0].outcome, JobOutcome::FailedAt(0));
    assert_eq!(result.jobs[0].steps.len(), 1);
    assert_eq!(result.jobs[1].outcome, JobOutcome::Success);
    assert!(result.jobs[1].steps[1].stdout.contains("after healthy"));
}

#[tokio::test]
async fn test_matrix_coordinates_reach_step_processes() {
    let yaml = r#"
name: coords
matrix:
  toolchain: [beta]
steps:
  - run: echo job=$PIPELINE_JOB chan=$MATRIX_TOOLCHAIN
"#;

    let pipeline = PipelineLoader::parse_and_validate(yaml).unwrap();
    let instances = MatrixExpander::expand(&pipeline).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(context("coords", dir.path()));
    let result = executor.run_all(instances).await;

    assert!(result.success());
    let stdout = &result.jobs[0].steps[0].stdout;
    assert!(stdout.contains("job=beta"));
    assert!(stdout.contains("chan=beta"));
}
