use algolab_common::types::ErrorInfo;
use thiserror::Error;

use crate::engine::parse_line_number;

/// Failures raised by the engine around user code. They never leave the
/// execution primitives; [`EngineError::to_error_info`] turns them into the
/// `error` field of a failed result.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Function \"{0}\" is not defined")]
    MissingFunction(String),

    #[error("Source code exceeds maximum size of {max} bytes (got {actual})")]
    SourceTooLarge { max: usize, actual: usize },

    #[error("Input exceeds maximum size of {max} bytes (got {actual})")]
    InputTooLarge { max: usize, actual: usize },

    #[error("Failed to serialize arguments: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error the interpreter reported outside the harness catch-all
    /// (runtime limits, harness parse failures).
    #[error("{0}")]
    Script(String),

    #[error("Malformed execution result: {0}")]
    MalformedEnvelope(String),
}

impl EngineError {
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            EngineError::Script(message) => ErrorInfo {
                message: message.clone(),
                line_number: parse_line_number(message),
                stack: message.clone(),
            },
            other => ErrorInfo::new(other.to_string()),
        }
    }
}
