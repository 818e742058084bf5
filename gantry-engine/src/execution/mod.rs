// Execution Engine Module
// Handles matrix expansion, scoped contexts, and run orchestration

pub mod context;
pub mod events;
pub mod executor;
pub mod matrix;

// Re-export key types
pub use context::ExecContext;
pub use events::{
    progress_channel, EventSender, ExecutionEvent, LogLevel, ProgressReceiver, ProgressSender,
};
pub use executor::{CancelHandle, Executor, ExecutorConfig};
pub use matrix::{JobInstance, MatrixExpander, ResolvedStep};
