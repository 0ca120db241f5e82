//! The storage engine trait

use crate::{DatasetId, EngineResult, FileId, SpaceId};
use array_types::{Shape, TypeDescriptor};
use hyperslab::Selection;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Access mode for an opened container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    ReadOnly,
    #[default]
    ReadWrite,
}

impl OpenMode {
    pub fn is_writable(&self) -> bool {
        matches!(self, OpenMode::ReadWrite)
    }
}

/// Storage engine operations.
///
/// Implementations must be callable from many threads at once. The engine
/// does not order selection and transfer calls made by different callers on
/// the same dataspace; callers that share a dataspace serialize themselves.
pub trait StorageEngine: Send + Sync {
    /// Opens an existing container
    fn open_file(&self, path: &Path, mode: OpenMode) -> EngineResult<FileId>;

    /// Creates a new, empty container and opens it read-write
    fn create_file(&self, path: &Path) -> EngineResult<FileId>;

    fn close_file(&self, file: FileId) -> EngineResult<()>;

    fn open_dataset(&self, file: FileId, name: &str) -> EngineResult<DatasetId>;

    /// Creates a dataset and opens it.
    ///
    /// `max_shape`, when given, must have the rank of `shape` and be at least
    /// as large in every dimension. It is recorded but never used to grow the
    /// dataset.
    fn create_dataset(
        &self,
        file: FileId,
        name: &str,
        dtype: TypeDescriptor,
        shape: &Shape,
        max_shape: Option<&Shape>,
    ) -> EngineResult<DatasetId>;

    fn dataset_exists(&self, file: FileId, name: &str) -> EngineResult<bool>;

    /// Deletes a dataset from the container
    fn remove_dataset(&self, file: FileId, name: &str) -> EngineResult<()>;

    fn close_dataset(&self, dataset: DatasetId) -> EngineResult<()>;

    fn shape(&self, dataset: DatasetId) -> EngineResult<Shape>;

    fn dtype(&self, dataset: DatasetId) -> EngineResult<TypeDescriptor>;

    /// Returns a new dataspace over the dataset's extent, nothing selected
    fn dataset_space(&self, dataset: DatasetId) -> EngineResult<SpaceId>;

    /// Returns a new dataspace over `shape`, nothing selected
    fn create_simple_space(&self, shape: &Shape) -> EngineResult<SpaceId>;

    /// Replaces the space's selection with `selection`
    fn select_hyperslab(&self, space: SpaceId, selection: &Selection) -> EngineResult<()>;

    fn close_space(&self, space: SpaceId) -> EngineResult<()>;

    /// Copies the file-space selection into the memory-space selection of `out`.
    ///
    /// `out` must be exactly as long as the memory space's extent. A space with
    /// nothing selected stands for its whole extent.
    fn read(
        &self,
        dataset: DatasetId,
        memory_space: SpaceId,
        file_space: SpaceId,
        out: &mut [u8],
    ) -> EngineResult<()>;

    /// Copies the memory-space selection of `data` into the file-space selection
    fn write(
        &self,
        dataset: DatasetId,
        memory_space: SpaceId,
        file_space: SpaceId,
        data: &[u8],
    ) -> EngineResult<()>;
}
