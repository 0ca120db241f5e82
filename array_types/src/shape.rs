//! Array extents

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use thiserror::Error;

/// Errors constructing a [`Shape`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// A shape needs at least one dimension
    #[error("shape must have at least one dimension")]
    Empty,
}

/// Per-dimension extent of an array.
///
/// Dimension 0 is the slicing (record) dimension. The rank is always at
/// least one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct Shape(Vec<u64>);

impl Shape {
    /// Creates a shape from per-dimension sizes
    pub fn new(dims: impl Into<Vec<u64>>) -> Result<Self, ShapeError> {
        let dims = dims.into();
        if dims.is_empty() {
            return Err(ShapeError::Empty);
        }
        Ok(Self(dims))
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[u64] {
        &self.0
    }

    /// Total number of elements, or `None` if the product overflows `u64`
    pub fn checked_element_count(&self) -> Option<u64> {
        checked_product(&self.0)
    }

    /// Number of elements in one record along dimension 0, or `None` on
    /// overflow
    pub fn checked_row_elements(&self) -> Option<u64> {
        checked_product(&self.0[1..])
    }

    /// Returns a copy with dimension 0 replaced by `rows`
    pub fn with_rows(&self, rows: u64) -> Self {
        let mut dims = self.0.clone();
        dims[0] = rows;
        Self(dims)
    }
}

fn checked_product(dims: &[u64]) -> Option<u64> {
    dims.iter().try_fold(1u64, |acc, &d| acc.checked_mul(d))
}

impl Index<usize> for Shape {
    type Output = u64;

    fn index(&self, dim: usize) -> &u64 {
        &self.0[dim]
    }
}

impl TryFrom<Vec<u64>> for Shape {
    type Error = ShapeError;

    fn try_from(dims: Vec<u64>) -> Result<Self, ShapeError> {
        Self::new(dims)
    }
}

impl From<Shape> for Vec<u64> {
    fn from(shape: Shape) -> Self {
        shape.0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}
