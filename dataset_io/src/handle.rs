//! Dataset handles
//!
//! A [`DatasetHandle`] owns one open engine dataset, the dataspace over its
//! extent, and a single cached memory dataspace for range transfers.
//!
//! ## Locking
//!
//! Selecting a hyperslab on a dataspace and transferring through it are two
//! engine calls. Every transfer therefore runs under the handle's lock, from
//! choosing the memory space to the end of the copy. Threads reading the same
//! handle serialize; different handles never contend.
//!
//! ## Memory space cache
//!
//! Range reads and writes in a scan loop almost always use the same record
//! count. The handle keeps the memory dataspace of the last range transfer and
//! reuses it while the count stays the same; a different count replaces it.
//! Strided transfers use a dataspace per call and leave the cache alone.

use crate::error::{DatasetError, DatasetResult};
use crate::guard::SpaceGuard;
use array_types::{decode, encode, Element, Shape, TypeDescriptor};
use hyperslab::{compute_selection, Selection, SelectionError, SelectionPlan, SelectionRequest};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use storage_engine::{DatasetId, EngineResult, FileId, SpaceId, StorageEngine};
use tracing::{debug, info, warn};

/// Lifecycle state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Open,
    Closed,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleState::Open => write!(f, "open"),
            HandleState::Closed => write!(f, "closed"),
        }
    }
}

enum HandleInner {
    Open(OpenDataset),
    Closed,
}

struct OpenDataset {
    dataset: DatasetId,
    file_space: SpaceGuard,
    memory_cache: Option<CachedMemorySpace>,
}

struct CachedMemorySpace {
    count: u64,
    space: SpaceGuard,
}

impl OpenDataset {
    /// Returns the memory dataspace for a range transfer of `count` records
    fn memory_space(
        &mut self,
        engine: &Arc<dyn StorageEngine>,
        plan: &SelectionPlan,
        count: u64,
    ) -> EngineResult<SpaceId> {
        if let Some(cached) = &self.memory_cache {
            if cached.count == count {
                return Ok(cached.space.id());
            }
        }
        if let Some(stale) = self.memory_cache.take() {
            stale.space.release()?;
        }

        let space = SpaceGuard::create(engine, &plan.memory_shape)?;
        engine.select_hyperslab(space.id(), &plan.memory_selection())?;
        let id = space.id();
        debug!(count, space = %id, "memory space cached");
        self.memory_cache = Some(CachedMemorySpace { count, space });
        Ok(id)
    }
}

/// An open dataset with hyperslab read/write access.
///
/// Shape and element type are read once at open and never change. Handles are
/// shared as `Arc<DatasetHandle>` and may be used from many threads.
pub struct DatasetHandle {
    name: String,
    engine: Arc<dyn StorageEngine>,
    shape: Shape,
    dtype: TypeDescriptor,
    inner: Mutex<HandleInner>,
}

impl DatasetHandle {
    pub(crate) fn open(
        engine: &Arc<dyn StorageEngine>,
        file: FileId,
        name: &str,
    ) -> DatasetResult<Self> {
        let dataset = engine.open_dataset(file, name)?;
        Self::attach(engine, name, dataset)
    }

    pub(crate) fn create(
        engine: &Arc<dyn StorageEngine>,
        file: FileId,
        name: &str,
        dtype: TypeDescriptor,
        shape: &Shape,
        max_shape: Option<&Shape>,
    ) -> DatasetResult<Self> {
        let dataset = engine.create_dataset(file, name, dtype, shape, max_shape)?;
        Self::attach(engine, name, dataset)
    }

    /// Reads shape and type of an engine dataset and takes ownership of it.
    /// On failure the engine dataset is closed again.
    fn attach(
        engine: &Arc<dyn StorageEngine>,
        name: &str,
        dataset: DatasetId,
    ) -> DatasetResult<Self> {
        let described = engine.shape(dataset).and_then(|shape| {
            let dtype = engine.dtype(dataset)?;
            let file_space = SpaceGuard::for_dataset(engine, dataset)?;
            Ok((shape, dtype, file_space))
        });
        let (shape, dtype, file_space) = match described {
            Ok(parts) => parts,
            Err(err) => {
                if let Err(close_err) = engine.close_dataset(dataset) {
                    warn!(dataset = name, error = %close_err, "failed to close dataset after open error");
                }
                return Err(err.into());
            }
        };

        info!(dataset = name, %shape, %dtype, "dataset opened");
        Ok(Self {
            name: name.to_string(),
            engine: Arc::clone(engine),
            shape,
            dtype,
            inner: Mutex::new(HandleInner::Open(OpenDataset {
                dataset,
                file_space,
                memory_cache: None,
            })),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// On-disk extent, fixed for the life of the handle
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn dtype(&self) -> TypeDescriptor {
        self.dtype
    }

    pub fn state(&self) -> HandleState {
        match *self.inner.lock() {
            HandleInner::Open(_) => HandleState::Open,
            HandleInner::Closed => HandleState::Closed,
        }
    }

    /// Record count the cached memory dataspace was built for, if any
    pub fn cached_memory_count(&self) -> Option<u64> {
        match &*self.inner.lock() {
            HandleInner::Open(open) => open.memory_cache.as_ref().map(|c| c.count),
            HandleInner::Closed => None,
        }
    }

    /// Reads `count` records starting at record `start`.
    ///
    /// Returns `count * row elements * element size` bytes, row-major.
    pub fn read_slice(&self, start: u64, count: u64) -> DatasetResult<Vec<u8>> {
        let mut open = self.lock_open()?;
        let plan = self.plan(&SelectionRequest::range(start, count))?;
        let mut out = vec![0u8; plan.byte_len];
        if plan.is_empty() {
            return Ok(out);
        }

        let memory_space = open.memory_space(&self.engine, &plan, count)?;
        let file_space = open.file_space.id();
        self.engine.select_hyperslab(file_space, &plan.selection)?;
        self.engine
            .read(open.dataset, memory_space, file_space, &mut out)?;
        Ok(out)
    }

    /// Reads an explicit hyperslab. Stride and block default to all ones.
    ///
    /// The result is packed with shape `count[d] * block[d]` per dimension.
    pub fn read_strided(
        &self,
        offset: &[u64],
        stride: Option<&[u64]>,
        count: &[u64],
        block: Option<&[u64]>,
    ) -> DatasetResult<Vec<u8>> {
        let open = self.lock_open()?;
        let plan = self.plan(&strided_request(offset, stride, count, block))?;
        self.read_uncached(&open, &plan)
    }

    /// Reads the whole dataset
    pub fn read_all(&self) -> DatasetResult<Vec<u8>> {
        let open = self.lock_open()?;
        let plan = self.plan(&SelectionRequest::Strided(Selection::all(&self.shape)))?;
        self.read_uncached(&open, &plan)
    }

    /// Writes whole records starting at record `start`.
    ///
    /// The record count is `data.len()` divided by the record size; `data`
    /// must hold a whole number of records.
    pub fn write_slice(&self, start: u64, data: &[u8]) -> DatasetResult<()> {
        let mut open = self.lock_open()?;
        let row_bytes = self.row_bytes()?;
        let count = if row_bytes == 0 {
            0
        } else {
            data.len() / row_bytes
        };
        let expected = count * row_bytes;
        if data.len() != expected {
            return Err(DatasetError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        let count = count as u64;
        let plan = self.plan(&SelectionRequest::range(start, count))?;
        if plan.is_empty() {
            return Ok(());
        }

        let memory_space = open.memory_space(&self.engine, &plan, count)?;
        let file_space = open.file_space.id();
        self.engine.select_hyperslab(file_space, &plan.selection)?;
        self.engine
            .write(open.dataset, memory_space, file_space, data)?;
        Ok(())
    }

    /// Writes an explicit hyperslab from a packed buffer
    pub fn write_strided(
        &self,
        offset: &[u64],
        stride: Option<&[u64]>,
        count: &[u64],
        block: Option<&[u64]>,
        data: &[u8],
    ) -> DatasetResult<()> {
        let open = self.lock_open()?;
        let plan = self.plan(&strided_request(offset, stride, count, block))?;
        if data.len() != plan.byte_len {
            return Err(DatasetError::SizeMismatch {
                expected: plan.byte_len,
                actual: data.len(),
            });
        }
        if plan.is_empty() {
            return Ok(());
        }

        let memory = SpaceGuard::create(&self.engine, &plan.memory_shape)?;
        self.engine
            .select_hyperslab(memory.id(), &plan.memory_selection())?;
        self.engine
            .select_hyperslab(open.file_space.id(), &plan.selection)?;
        self.engine
            .write(open.dataset, memory.id(), open.file_space.id(), data)?;
        memory.release()?;
        Ok(())
    }

    /// [`read_slice`](Self::read_slice) decoded as `T`
    pub fn read_slice_as<T: Element>(&self, start: u64, count: u64) -> DatasetResult<Vec<T>> {
        self.check_type::<T>()?;
        Ok(decode(&self.read_slice(start, count)?)?)
    }

    /// [`write_slice`](Self::write_slice) from values of `T`
    pub fn write_slice_from<T: Element>(&self, start: u64, values: &[T]) -> DatasetResult<()> {
        self.check_type::<T>()?;
        self.write_slice(start, &encode(values))
    }

    /// Releases the engine dataset and its dataspaces.
    ///
    /// Closing a closed handle does nothing. Every resource is released even
    /// if an earlier one fails; the first failure is returned.
    pub fn close(&self) -> DatasetResult<()> {
        let previous = std::mem::replace(&mut *self.inner.lock(), HandleInner::Closed);
        let HandleInner::Open(open) = previous else {
            return Ok(());
        };

        let OpenDataset {
            dataset,
            file_space,
            memory_cache,
        } = open;
        let mut result = Ok(());
        if let Some(cached) = memory_cache {
            result = result.and(cached.space.release());
        }
        result = result.and(file_space.release());
        result = result.and(self.engine.close_dataset(dataset));
        info!(dataset = %self.name, "dataset closed");
        result.map_err(DatasetError::from)
    }

    fn lock_open(&self) -> DatasetResult<MappedMutexGuard<'_, OpenDataset>> {
        MutexGuard::try_map(self.inner.lock(), |inner| match inner {
            HandleInner::Open(open) => Some(open),
            HandleInner::Closed => None,
        })
        .map_err(|_| DatasetError::InvalidState {
            target: self.name.clone(),
            state: HandleState::Closed,
        })
    }

    fn plan(&self, request: &SelectionRequest) -> DatasetResult<SelectionPlan> {
        Ok(compute_selection(
            &self.shape,
            request,
            self.dtype.byte_size(),
        )?)
    }

    fn row_bytes(&self) -> DatasetResult<usize> {
        self.shape
            .checked_row_elements()
            .and_then(|n| usize::try_from(n).ok())
            .and_then(|n| n.checked_mul(self.dtype.byte_size()))
            .ok_or(DatasetError::Selection(SelectionError::TooLarge))
    }

    fn check_type<T: Element>(&self) -> DatasetResult<()> {
        if !self.dtype.check::<T>() {
            return Err(DatasetError::TypeMismatch {
                name: self.name.clone(),
                actual: self.dtype,
                requested: T::DESCRIPTOR,
            });
        }
        Ok(())
    }

    /// Transfer through a memory dataspace that lives for this call only
    fn read_uncached(&self, open: &OpenDataset, plan: &SelectionPlan) -> DatasetResult<Vec<u8>> {
        let mut out = vec![0u8; plan.byte_len];
        if plan.is_empty() {
            return Ok(out);
        }

        let memory = SpaceGuard::create(&self.engine, &plan.memory_shape)?;
        self.engine
            .select_hyperslab(memory.id(), &plan.memory_selection())?;
        self.engine
            .select_hyperslab(open.file_space.id(), &plan.selection)?;
        self.engine
            .read(open.dataset, memory.id(), open.file_space.id(), &mut out)?;
        memory.release()?;
        Ok(out)
    }
}

fn strided_request(
    offset: &[u64],
    stride: Option<&[u64]>,
    count: &[u64],
    block: Option<&[u64]>,
) -> SelectionRequest {
    SelectionRequest::strided(
        offset.to_vec(),
        stride.map(<[u64]>::to_vec),
        count.to_vec(),
        block.map(<[u64]>::to_vec),
    )
}

impl fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetHandle")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for DatasetHandle {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(dataset = %self.name, error = %err, "failed to close dataset on drop");
        }
    }
}
