//! Engine error types

use hyperslab::SelectionError;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported across the engine boundary
#[derive(Debug, Error)]
pub enum EngineError {
    /// Container or dataset does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Container or dataset already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Handle was never issued or has been closed
    #[error("invalid or closed handle: {0}")]
    InvalidHandle(String),

    /// Dataset name cannot be stored by this container
    #[error("invalid dataset name: {0:?}")]
    InvalidName(String),

    /// Mutation attempted on a container opened read-only
    #[error("container opened read-only")]
    ReadOnly,

    /// Malformed shape or maximum shape
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Hyperslab rejected by the space it was selected on
    #[error("invalid selection: {0}")]
    InvalidSelection(#[from] SelectionError),

    /// Memory and file selections select different element counts
    #[error("memory selection has {memory} elements, file selection has {file}")]
    SelectionMismatch { memory: u64, file: u64 },

    /// Transfer buffer does not match the memory space
    #[error("buffer is {actual} bytes, memory space needs {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// Stored metadata could not be parsed
    #[error("corrupt container: {0}")]
    Corrupt(String),

    /// Failure injected by [`crate::FailingEngine`]
    #[error("injected failure: {0}")]
    Injected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
