//! Hyperslab selections
//!
//! For each dimension `d` a [`Selection`] picks the indices
//! `offset[d] + k * stride[d] + b` for `k < count[d]` and `b < block[d]`.
//! Stride and block default to one, which describes a contiguous range.

use crate::runs::Runs;
use crate::{BoundsError, SelectionError};
use array_types::Shape;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub offset: Vec<u64>,
    pub stride: Option<Vec<u64>>,
    pub count: Vec<u64>,
    pub block: Option<Vec<u64>>,
}

impl Selection {
    /// Creates a contiguous selection of `count` elements from `offset`
    pub fn contiguous(offset: Vec<u64>, count: Vec<u64>) -> Self {
        Self {
            offset,
            stride: None,
            count,
            block: None,
        }
    }

    /// Creates a fully specified hyperslab
    pub fn strided(
        offset: Vec<u64>,
        stride: Option<Vec<u64>>,
        count: Vec<u64>,
        block: Option<Vec<u64>>,
    ) -> Self {
        Self {
            offset,
            stride,
            count,
            block,
        }
    }

    /// Selects every element of `shape`
    pub fn all(shape: &Shape) -> Self {
        Self::contiguous(vec![0; shape.rank()], shape.dims().to_vec())
    }

    pub fn rank(&self) -> usize {
        self.offset.len()
    }

    pub fn stride_at(&self, dim: usize) -> u64 {
        self.stride.as_ref().map_or(1, |s| s[dim])
    }

    pub fn block_at(&self, dim: usize) -> u64 {
        self.block.as_ref().map_or(1, |b| b[dim])
    }

    /// Returns a copy with stride and block written out explicitly
    pub fn with_defaults(&self) -> Self {
        let rank = self.rank();
        Self {
            offset: self.offset.clone(),
            stride: Some((0..rank).map(|d| self.stride_at(d)).collect()),
            count: self.count.clone(),
            block: Some((0..rank).map(|d| self.block_at(d)).collect()),
        }
    }

    /// Checks this selection against `extent`.
    ///
    /// Dimensions are checked in order and the first violation is returned.
    pub fn validate(&self, extent: &Shape) -> Result<(), SelectionError> {
        let rank = extent.rank();
        check_rank("offset", rank, self.offset.len())?;
        check_rank("count", rank, self.count.len())?;
        if let Some(stride) = &self.stride {
            check_rank("stride", rank, stride.len())?;
        }
        if let Some(block) = &self.block {
            check_rank("block", rank, block.len())?;
        }

        for dim in 0..rank {
            let offset = self.offset[dim];
            let count = self.count[dim];
            let stride = self.stride_at(dim);
            let block = self.block_at(dim);

            // An empty dimension still has to start inside (or at the end of) the extent.
            let requested = if count == 0 {
                offset
            } else {
                (count - 1)
                    .checked_mul(stride)
                    .and_then(|v| v.checked_add(block))
                    .and_then(|v| v.checked_add(offset))
                    .ok_or(SelectionError::TooLarge)?
            };
            if requested > extent[dim] {
                return Err(BoundsError {
                    dimension: dim,
                    requested,
                    extent: extent[dim],
                }
                .into());
            }

            if count > 1 && block > 0 && stride < block {
                return Err(SelectionError::OverlappingBlocks {
                    dimension: dim,
                    stride,
                    block,
                });
            }
        }
        Ok(())
    }

    /// Number of elements selected along each dimension
    pub fn memory_dims(&self) -> Result<Vec<u64>, SelectionError> {
        (0..self.rank())
            .map(|d| {
                self.count[d]
                    .checked_mul(self.block_at(d))
                    .ok_or(SelectionError::TooLarge)
            })
            .collect()
    }

    /// Total number of selected elements
    pub fn element_count(&self) -> Result<u64, SelectionError> {
        self.memory_dims()?
            .iter()
            .try_fold(1u64, |acc, &d| acc.checked_mul(d))
            .ok_or(SelectionError::TooLarge)
    }

    /// Whether no element is selected
    pub fn is_empty(&self) -> bool {
        (0..self.rank()).any(|d| self.count[d] == 0 || self.block_at(d) == 0)
    }

    /// Selected source indices along `dim`, ascending
    pub fn indices(&self, dim: usize) -> impl Iterator<Item = u64> + '_ {
        let offset = self.offset[dim];
        let stride = self.stride_at(dim);
        let block = self.block_at(dim);
        (0..self.count[dim])
            .flat_map(move |k| (0..block).map(move |b| offset + k * stride + b))
    }

    /// Lowers the selection to contiguous row-major runs over `extent`.
    ///
    /// The selection must already be validated against `extent`.
    pub fn runs(&self, extent: &Shape) -> Runs {
        Runs::new(self, extent)
    }
}

fn check_rank(field: &'static str, expected: usize, actual: usize) -> Result<(), SelectionError> {
    if expected != actual {
        return Err(SelectionError::RankMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}
