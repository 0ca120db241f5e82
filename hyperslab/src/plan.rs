//! Turning access requests into validated selection plans

use crate::{BoundsError, Selection, SelectionError};
use array_types::Shape;

/// The two access patterns the dataset layer issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRequest {
    /// `count` full records along dimension 0 starting at `start`
    Range { start: u64, count: u64 },
    /// An explicit hyperslab, stride and block optional
    Strided(Selection),
}

impl SelectionRequest {
    pub fn range(start: u64, count: u64) -> Self {
        Self::Range { start, count }
    }

    pub fn strided(
        offset: Vec<u64>,
        stride: Option<Vec<u64>>,
        count: Vec<u64>,
        block: Option<Vec<u64>>,
    ) -> Self {
        Self::Strided(Selection::strided(offset, stride, count, block))
    }

    /// Projects the request onto a hyperslab over `extent`
    fn to_selection(&self, extent: &Shape) -> Selection {
        match self {
            Self::Range { start, count } => {
                let mut offset = vec![0; extent.rank()];
                offset[0] = *start;
                Selection::contiguous(offset, extent.with_rows(*count).dims().to_vec())
            }
            Self::Strided(selection) => selection.clone(),
        }
    }
}

/// A validated selection together with the buffer layout that backs it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPlan {
    /// File-side selection with stride and block made explicit
    pub selection: Selection,
    /// Shape of the packed in-memory buffer
    pub memory_shape: Shape,
    pub element_count: u64,
    /// Required buffer length in bytes
    pub byte_len: usize,
}

impl SelectionPlan {
    /// Selection covering the whole memory buffer
    pub fn memory_selection(&self) -> Selection {
        Selection::all(&self.memory_shape)
    }

    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }
}

/// Validates `request` against `extent` and sizes the transfer.
///
/// Nothing is clamped: any dimension reaching past the extent fails with a
/// [`BoundsError`] and no plan is produced.
pub fn compute_selection(
    extent: &Shape,
    request: &SelectionRequest,
    byte_size: usize,
) -> Result<SelectionPlan, SelectionError> {
    if let SelectionRequest::Range { start, count } = request {
        let requested = start.checked_add(*count).ok_or(SelectionError::TooLarge)?;
        if requested > extent[0] {
            return Err(BoundsError {
                dimension: 0,
                requested,
                extent: extent[0],
            }
            .into());
        }
    }

    let selection = request.to_selection(extent);
    selection.validate(extent)?;
    let selection = selection.with_defaults();

    let memory_dims = selection.memory_dims()?;
    let element_count = selection.element_count()?;
    let byte_len = usize::try_from(element_count)
        .ok()
        .and_then(|n| n.checked_mul(byte_size))
        .ok_or(SelectionError::TooLarge)?;
    let memory_shape = Shape::new(memory_dims).map_err(|_| SelectionError::RankMismatch {
        field: "count",
        expected: extent.rank(),
        actual: 0,
    })?;

    Ok(SelectionPlan {
        selection,
        memory_shape,
        element_count,
        byte_len,
    })
}
