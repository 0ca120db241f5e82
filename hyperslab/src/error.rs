//! Selection errors

use thiserror::Error;

/// A selection reaches past the extent of one dimension.
///
/// `requested` is the exclusive end index the selection would touch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("selection out of bounds in dimension {dimension}: end {requested} exceeds extent {extent}")]
pub struct BoundsError {
    pub dimension: usize,
    pub requested: u64,
    pub extent: u64,
}

/// Errors produced while validating a selection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error(transparent)]
    Bounds(#[from] BoundsError),

    /// A per-dimension vector has the wrong number of entries
    #[error("{field} has {actual} dimensions, extent has {expected}")]
    RankMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Blocks would overlap, selecting an index more than once
    #[error("stride {stride} is smaller than block {block} in dimension {dimension}")]
    OverlappingBlocks {
        dimension: usize,
        stride: u64,
        block: u64,
    },

    /// Element or byte counts overflow the address space
    #[error("selection size overflows")]
    TooLarge,
}
