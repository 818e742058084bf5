// Gantry Engine Library
// Core engine for pipeline declaration parsing, matrix expansion, and execution

pub mod error;
pub mod execution;
pub mod parser;
pub mod report;
pub mod runners;
pub mod trigger;
pub mod utils;

// Re-export commonly used types
pub use error::{ConfigError, EngineError, EngineResult};

// Re-export parser types
pub use parser::{
    ParseError, ParseErrorKind, ParseResult, PipelineLoader, PipelineValidator, ValidationError,
};

// Re-export declaration and result models
pub use parser::models::{
    EventKind, JobOutcome, JobResult, MatrixAxis, Pipeline, PipelineEvent, RunResult, Step,
    StepResult, StepStatus, Trigger,
};

// Re-export execution types
pub use execution::{
    progress_channel, CancelHandle, EventSender, ExecContext, ExecutionEvent, Executor,
    ExecutorConfig, JobInstance, LogLevel, MatrixExpander, ProgressReceiver, ProgressSender,
    ResolvedStep,
};

// Re-export runner types
pub use runners::{ShellRunner, StepInvocation, StepOutput, StepRunner};

// Re-export reporting types
pub use report::{JobSummary, ReportFormat, RunReport};

// Re-export trigger evaluation
pub use trigger::TriggerEvaluator;
