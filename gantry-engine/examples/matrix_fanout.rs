use gantry_engine::{
    progress_channel, ExecContext, ExecutionEvent, Executor, MatrixExpander, PipelineLoader,
    RunReport,
};

#[tokio::main]
async fn main() {
    let yaml = r#"
name: fanout-demo
on: [push, pull_request]

env:
  CARGO_TERM_COLOR: always

matrix:
  toolchain: [stable, beta, nightly]

steps:
  - name: build
    run: echo building with ${{ toolchain }}
  - name: test
    run: echo testing with ${{ toolchain }}
"#;

    let pipeline = PipelineLoader::parse_and_validate(yaml).expect("declaration should be valid");
    let instances = MatrixExpander::expand(&pipeline).expect("matrix should expand");

    println!("Expanded {} instances:", instances.len());
    for instance in &instances {
        println!("  [{}] {}", instance.index, instance.label);
        for step in &instance.steps {
            println!("      {}", step.command);
        }
    }
    println!();

    let context = ExecContext::new(
        pipeline.display_name(),
        std::env::current_dir().expect("cwd should exist"),
    );

    let (tx, mut rx) = progress_channel();
    let executor = Executor::new(context).with_progress(tx);
    let handle = tokio::spawn(async move { executor.run_all(instances).await });

    while let Some(event) = rx.recv().await {
        match event {
            ExecutionEvent::RunStarted {
                pipeline_name,
                total_jobs,
            } => println!("==> run '{}' ({} jobs)", pipeline_name, total_jobs),
            ExecutionEvent::JobStarted { job_label, .. } => {
                println!("  job '{}' started", job_label)
            }
            ExecutionEvent::StepCompleted {
                job_label,
                step_name,
                status,
                ..
            } => println!("    [{}] {} -> {:?}", job_label, step_name, status),
            ExecutionEvent::JobCompleted {
                job_label, outcome, ..
            } => println!("  job '{}' {}", job_label, outcome),
            _ => {}
        }
    }

    let result = handle.await.expect("executor task should not panic");
    print!("{}", RunReport::from_result(&result).to_terminal());
}
