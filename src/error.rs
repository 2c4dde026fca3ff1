//! Error types for plan compilation.

use thiserror::Error;

/// The error type for compiling plans and modification batches to KQL.
///
/// Compilation either succeeds completely or fails fast; there is no
/// partial output. Plan shapes the dialect has no rewrite for surface as
/// `Unsupported` rather than degrading to a no-op.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    /// The plan contains a construct the KQL dialect cannot express.
    #[error("Unsupported construct: {0}")]
    Unsupported(String),

    /// An insert or update command carries no write-flagged columns.
    #[error("No writable columns in {operation} command for table '{table}'")]
    EmptyWriteSet {
        table: String,
        operation: &'static str,
    },

    /// An expression or predicate tree exceeded the descent budget.
    #[error("Expression tree exceeds maximum depth of {0}")]
    DepthExceeded(usize),
}

impl CompileError {
    /// Create an unsupported-construct error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }
}

/// Result type alias for compilation.
pub type CompileResult<T> = Result<T, CompileError>;
