//! Dataspaces

use crate::{EngineError, EngineResult};
use array_types::Shape;
use hyperslab::{Runs, Selection};

/// An extent with an optional hyperslab selected on it
#[derive(Debug, Clone)]
pub struct Dataspace {
    extent: Shape,
    selection: Option<Selection>,
}

impl Dataspace {
    pub fn new(extent: Shape) -> Self {
        Self {
            extent,
            selection: None,
        }
    }

    pub fn extent(&self) -> &Shape {
        &self.extent
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Validates and installs `selection`, replacing any previous one
    pub fn select(&mut self, selection: &Selection) -> EngineResult<()> {
        selection.validate(&self.extent)?;
        self.selection = Some(selection.clone());
        Ok(())
    }

    /// Number of selected elements; the whole extent when nothing is selected
    pub fn selected_elements(&self) -> EngineResult<u64> {
        match &self.selection {
            Some(sel) => Ok(sel.element_count()?),
            None => self
                .extent
                .checked_element_count()
                .ok_or_else(|| EngineError::InvalidShape(format!("{} is too large", self.extent))),
        }
    }

    /// Row-major runs of the effective selection
    pub fn runs(&self) -> Runs {
        match &self.selection {
            Some(sel) => sel.runs(&self.extent),
            None => Selection::all(&self.extent).runs(&self.extent),
        }
    }
}
