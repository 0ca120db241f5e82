//! Handle-table engine over pluggable container stores
//!
//! [`ContainerEngine`] implements the [`StorageEngine`] handle model (files,
//! datasets, dataspaces, hyperslab transfers) once. A [`Store`] only has to
//! open and create containers; a [`Container`] only has to keep dataset
//! metadata and move bytes at element offsets.

use crate::ids::IdAllocator;
use crate::{
    Dataspace, DatasetId, EngineError, EngineResult, FileId, OpenMode, SpaceId, StorageEngine,
};
use array_types::{Shape, TypeDescriptor};
use hyperslab::{pair_runs, Selection};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Persistent description of one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub dtype: TypeDescriptor,
    pub shape: Shape,
    pub max_shape: Option<Shape>,
}

impl DatasetMeta {
    /// Size of the dataset's raw data in bytes
    pub fn byte_len(&self) -> EngineResult<u64> {
        self.shape
            .checked_element_count()
            .and_then(|n| n.checked_mul(self.dtype.byte_size() as u64))
            .ok_or_else(|| too_large(&self.shape))
    }

    /// Checks that the shape, maximum shape and element type can be stored
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(max) = &self.max_shape {
            if max.rank() != self.shape.rank() {
                return Err(EngineError::InvalidShape(format!(
                    "max shape {} has rank {}, shape {} has rank {}",
                    max,
                    max.rank(),
                    self.shape,
                    self.shape.rank()
                )));
            }
            if max.dims().iter().zip(self.shape.dims()).any(|(m, s)| m < s) {
                return Err(EngineError::InvalidShape(format!(
                    "max shape {} is smaller than shape {}",
                    max, self.shape
                )));
            }
        }
        if self.dtype.byte_size() == 0 {
            return Err(EngineError::InvalidShape(
                "element type has zero width".to_string(),
            ));
        }
        self.byte_len().map(|_| ())
    }
}

fn too_large(shape: &Shape) -> EngineError {
    EngineError::InvalidShape(format!("{} is too large", shape))
}

/// An opened container holding named datasets.
///
/// Offsets passed to `read_at`/`write_at` are byte offsets into the
/// dataset's row-major data.
pub trait Container: Send {
    fn contains(&self, name: &str) -> EngineResult<bool>;

    fn metadata(&self, name: &str) -> EngineResult<DatasetMeta>;

    /// Creates a zero-filled dataset
    fn create(&mut self, name: &str, meta: &DatasetMeta) -> EngineResult<()>;

    fn remove(&mut self, name: &str) -> EngineResult<()>;

    fn read_at(&mut self, name: &str, offset: u64, buf: &mut [u8]) -> EngineResult<()>;

    fn write_at(&mut self, name: &str, offset: u64, data: &[u8]) -> EngineResult<()>;

    /// Makes completed writes durable, where the store supports it
    fn flush(&mut self) -> EngineResult<()> {
        Ok(())
    }
}

/// Opens and creates containers by path
pub trait Store: Send + Sync {
    type Container: Container;

    /// Opens an existing container. Containers opened `ReadOnly` only need
    /// read access to their backing storage.
    fn open(&self, path: &Path, mode: OpenMode) -> EngineResult<Self::Container>;

    fn create(&self, path: &Path) -> EngineResult<Self::Container>;
}

struct OpenFile<C> {
    path: PathBuf,
    mode: OpenMode,
    container: Mutex<C>,
}

struct OpenDataset<C> {
    file: Arc<OpenFile<C>>,
    name: String,
    meta: DatasetMeta,
}

// Manual impl: the container itself is not `Clone`.
impl<C> Clone for OpenDataset<C> {
    fn clone(&self) -> Self {
        Self {
            file: Arc::clone(&self.file),
            name: self.name.clone(),
            meta: self.meta.clone(),
        }
    }
}

/// [`StorageEngine`] built from a [`Store`]
pub struct ContainerEngine<S: Store> {
    store: S,
    ids: IdAllocator,
    files: Mutex<HashMap<FileId, Arc<OpenFile<S::Container>>>>,
    datasets: Mutex<HashMap<DatasetId, OpenDataset<S::Container>>>,
    spaces: Mutex<HashMap<SpaceId, Dataspace>>,
}

impl<S: Store> ContainerEngine<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            ids: IdAllocator::new(),
            files: Mutex::new(HashMap::new()),
            datasets: Mutex::new(HashMap::new()),
            spaces: Mutex::new(HashMap::new()),
        }
    }

    /// Number of dataspaces currently allocated
    pub fn open_spaces(&self) -> usize {
        self.spaces.lock().len()
    }

    /// Number of datasets currently open
    pub fn open_datasets(&self) -> usize {
        self.datasets.lock().len()
    }

    fn file(&self, file: FileId) -> EngineResult<Arc<OpenFile<S::Container>>> {
        self.files
            .lock()
            .get(&file)
            .cloned()
            .ok_or_else(|| EngineError::InvalidHandle(file.to_string()))
    }

    /// Looks up a dataset whose file is still open
    fn dataset(&self, dataset: DatasetId) -> EngineResult<OpenDataset<S::Container>> {
        let entry = self
            .datasets
            .lock()
            .get(&dataset)
            .cloned()
            .ok_or_else(|| EngineError::InvalidHandle(dataset.to_string()))?;
        let file_open = self
            .files
            .lock()
            .values()
            .any(|f| Arc::ptr_eq(f, &entry.file));
        if !file_open {
            return Err(EngineError::InvalidHandle(format!(
                "{} belongs to closed file {}",
                dataset,
                entry.file.path.display()
            )));
        }
        Ok(entry)
    }

    fn space(&self, space: SpaceId) -> EngineResult<Dataspace> {
        self.spaces
            .lock()
            .get(&space)
            .cloned()
            .ok_or_else(|| EngineError::InvalidHandle(space.to_string()))
    }

    fn insert_file(&self, path: &Path, mode: OpenMode, container: S::Container) -> FileId {
        let id: FileId = self.ids.next();
        self.files.lock().insert(
            id,
            Arc::new(OpenFile {
                path: path.to_path_buf(),
                mode,
                container: Mutex::new(container),
            }),
        );
        debug!(file = %id, path = %path.display(), ?mode, "container opened");
        id
    }

    fn insert_dataset(
        &self,
        file: Arc<OpenFile<S::Container>>,
        name: &str,
        meta: DatasetMeta,
    ) -> DatasetId {
        let id: DatasetId = self.ids.next();
        self.datasets.lock().insert(
            id,
            OpenDataset {
                file,
                name: name.to_string(),
                meta,
            },
        );
        id
    }

    /// Checks both spaces against the dataset and buffer and returns the
    /// element copy segments
    fn plan_transfer(
        &self,
        dataset: &OpenDataset<S::Container>,
        memory_space: SpaceId,
        file_space: SpaceId,
        buf_len: usize,
    ) -> EngineResult<Vec<hyperslab::Segment>> {
        let mem = self.space(memory_space)?;
        let file = self.space(file_space)?;

        if file.extent() != &dataset.meta.shape {
            return Err(EngineError::InvalidHandle(format!(
                "{} has extent {}, dataset has {}",
                file_space,
                file.extent(),
                dataset.meta.shape
            )));
        }

        let expected = mem
            .extent()
            .checked_element_count()
            .and_then(|n| usize::try_from(n).ok())
            .and_then(|n| n.checked_mul(dataset.meta.dtype.byte_size()))
            .ok_or_else(|| too_large(mem.extent()))?;
        if buf_len != expected {
            return Err(EngineError::BufferSize {
                expected,
                actual: buf_len,
            });
        }

        let (mem_count, file_count) = (mem.selected_elements()?, file.selected_elements()?);
        if mem_count != file_count {
            return Err(EngineError::SelectionMismatch {
                memory: mem_count,
                file: file_count,
            });
        }

        Ok(pair_runs(file.runs(), mem.runs()).collect())
    }
}

impl<S: Store> StorageEngine for ContainerEngine<S> {
    fn open_file(&self, path: &Path, mode: OpenMode) -> EngineResult<FileId> {
        let container = self.store.open(path, mode)?;
        Ok(self.insert_file(path, mode, container))
    }

    fn create_file(&self, path: &Path) -> EngineResult<FileId> {
        let container = self.store.create(path)?;
        Ok(self.insert_file(path, OpenMode::ReadWrite, container))
    }

    fn close_file(&self, file: FileId) -> EngineResult<()> {
        let entry = self
            .files
            .lock()
            .remove(&file)
            .ok_or_else(|| EngineError::InvalidHandle(file.to_string()))?;
        debug!(file = %file, path = %entry.path.display(), "container closed");
        let result = entry.container.lock().flush();
        result
    }

    fn open_dataset(&self, file: FileId, name: &str) -> EngineResult<DatasetId> {
        let entry = self.file(file)?;
        let meta = entry.container.lock().metadata(name)?;
        Ok(self.insert_dataset(entry, name, meta))
    }

    fn create_dataset(
        &self,
        file: FileId,
        name: &str,
        dtype: TypeDescriptor,
        shape: &Shape,
        max_shape: Option<&Shape>,
    ) -> EngineResult<DatasetId> {
        let entry = self.file(file)?;
        if !entry.mode.is_writable() {
            return Err(EngineError::ReadOnly);
        }
        let meta = DatasetMeta {
            dtype,
            shape: shape.clone(),
            max_shape: max_shape.cloned(),
        };
        meta.validate()?;
        {
            let mut container = entry.container.lock();
            if container.contains(name)? {
                return Err(EngineError::AlreadyExists(name.to_string()));
            }
            container.create(name, &meta)?;
        }
        Ok(self.insert_dataset(entry, name, meta))
    }

    fn dataset_exists(&self, file: FileId, name: &str) -> EngineResult<bool> {
        let entry = self.file(file)?;
        let exists = entry.container.lock().contains(name);
        exists
    }

    fn remove_dataset(&self, file: FileId, name: &str) -> EngineResult<()> {
        let entry = self.file(file)?;
        if !entry.mode.is_writable() {
            return Err(EngineError::ReadOnly);
        }
        let removed = entry.container.lock().remove(name);
        removed
    }

    fn close_dataset(&self, dataset: DatasetId) -> EngineResult<()> {
        self.datasets
            .lock()
            .remove(&dataset)
            .map(|_| ())
            .ok_or_else(|| EngineError::InvalidHandle(dataset.to_string()))
    }

    fn shape(&self, dataset: DatasetId) -> EngineResult<Shape> {
        Ok(self.dataset(dataset)?.meta.shape)
    }

    fn dtype(&self, dataset: DatasetId) -> EngineResult<TypeDescriptor> {
        Ok(self.dataset(dataset)?.meta.dtype)
    }

    fn dataset_space(&self, dataset: DatasetId) -> EngineResult<SpaceId> {
        let shape = self.dataset(dataset)?.meta.shape;
        self.create_simple_space(&shape)
    }

    fn create_simple_space(&self, shape: &Shape) -> EngineResult<SpaceId> {
        if shape.checked_element_count().is_none() {
            return Err(too_large(shape));
        }
        let id: SpaceId = self.ids.next();
        self.spaces.lock().insert(id, Dataspace::new(shape.clone()));
        Ok(id)
    }

    fn select_hyperslab(&self, space: SpaceId, selection: &Selection) -> EngineResult<()> {
        self.spaces
            .lock()
            .get_mut(&space)
            .ok_or_else(|| EngineError::InvalidHandle(space.to_string()))?
            .select(selection)
    }

    fn close_space(&self, space: SpaceId) -> EngineResult<()> {
        self.spaces
            .lock()
            .remove(&space)
            .map(|_| ())
            .ok_or_else(|| EngineError::InvalidHandle(space.to_string()))
    }

    fn read(
        &self,
        dataset: DatasetId,
        memory_space: SpaceId,
        file_space: SpaceId,
        out: &mut [u8],
    ) -> EngineResult<()> {
        let ds = self.dataset(dataset)?;
        let segments = self.plan_transfer(&ds, memory_space, file_space, out.len())?;
        let size = ds.meta.dtype.byte_size() as u64;

        let mut container = ds.file.container.lock();
        for seg in &segments {
            let mem_start = (seg.mem_start * size) as usize;
            let len = (seg.len * size) as usize;
            container.read_at(
                &ds.name,
                seg.file_start * size,
                &mut out[mem_start..mem_start + len],
            )?;
        }
        debug!(dataset = %dataset, segments = segments.len(), bytes = out.len(), "read");
        Ok(())
    }

    fn write(
        &self,
        dataset: DatasetId,
        memory_space: SpaceId,
        file_space: SpaceId,
        data: &[u8],
    ) -> EngineResult<()> {
        let ds = self.dataset(dataset)?;
        if !ds.file.mode.is_writable() {
            return Err(EngineError::ReadOnly);
        }
        let segments = self.plan_transfer(&ds, memory_space, file_space, data.len())?;
        let size = ds.meta.dtype.byte_size() as u64;

        let mut container = ds.file.container.lock();
        for seg in &segments {
            let mem_start = (seg.mem_start * size) as usize;
            let len = (seg.len * size) as usize;
            container.write_at(
                &ds.name,
                seg.file_start * size,
                &data[mem_start..mem_start + len],
            )?;
        }
        debug!(dataset = %dataset, segments = segments.len(), bytes = data.len(), "write");
        Ok(())
    }
}
