// Parser module for gantry pipeline declarations
// Provides YAML parsing and semantic validation

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ParseError, ParseErrorKind, ParseResult, ValidationError};
pub use loader::{PipelineLoader, PipelineValidator};
pub use models::*;
