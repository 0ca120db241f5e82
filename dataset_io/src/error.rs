//! Dataset access errors

use crate::HandleState;
use array_types::{CodecError, TypeDescriptor};
use hyperslab::{BoundsError, SelectionError};
use storage_engine::EngineError;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors returned by dataset handles and the file registry
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Selection reaches past the dataset extent
    #[error(transparent)]
    Bounds(#[from] BoundsError),

    /// Selection is malformed for this dataset
    #[error("invalid selection: {0}")]
    Selection(SelectionError),

    /// Caller buffer does not match the transfer size
    #[error("buffer is {actual} bytes, transfer needs {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Engine-side failure; not retried
    #[error("transfer failed: {0}")]
    Transfer(#[source] EngineError),

    /// Operation on a closed handle or registry
    #[error("{target} is {state}")]
    InvalidState { target: String, state: HandleState },

    /// Dataset exists on disk and recreation was not requested
    #[error("dataset already exists: {0}")]
    AlreadyExists(String),

    /// Typed access with an element type the dataset does not hold
    #[error("dataset {name} holds {actual}, requested {requested}")]
    TypeMismatch {
        name: String,
        actual: TypeDescriptor,
        requested: TypeDescriptor,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<SelectionError> for DatasetError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::Bounds(bounds) => DatasetError::Bounds(bounds),
            other => DatasetError::Selection(other),
        }
    }
}

impl From<EngineError> for DatasetError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::AlreadyExists(name) => DatasetError::AlreadyExists(name),
            other => DatasetError::Transfer(other),
        }
    }
}
