// Engine Errors
// Crate-level error umbrella and the configuration error taxonomy

use crate::parser::error::ParseError;

use std::io;
use thiserror::Error;

/// Errors that make a declaration unrunnable before any process spawns
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pipeline has no steps")]
    EmptySteps,

    #[error("matrix axis '{axis}' has no values")]
    EmptyAxis { axis: String },

    #[error("matrix axis '{axis}' is declared more than once")]
    DuplicateAxis { axis: String },

    #[error("undeclared matrix axis '{axis}' referenced at {location}")]
    UndeclaredAxis { axis: String, location: String },

    #[error("step '{step}' has an empty command")]
    EmptyCommand { step: String },
}

/// Top-level error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
