//! # Failing Engine
//!
//! A [`StorageEngine`] wrapper that can simulate transfer failures and counts
//! the calls it forwards. Useful for checking that failures surface to callers
//! and that handles and dataspaces are released on every path.

use crate::{DatasetId, EngineError, EngineResult, FileId, OpenMode, SpaceId, StorageEngine};
use array_types::{Shape, TypeDescriptor};
use hyperslab::Selection;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Policy for when transfers should fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Never fail (passthrough)
    Never,
    /// Fail every transfer after N successful ones
    AfterTransfers(usize),
    /// Fail every read
    Reads,
    /// Fail every write
    Writes,
}

/// Snapshot of forwarded call counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub dataset_opens: usize,
    pub dataset_creates: usize,
    pub dataset_closes: usize,
    pub spaces_created: usize,
    pub spaces_closed: usize,
    pub reads: usize,
    pub writes: usize,
}

impl EngineStats {
    /// Dataspaces created and not yet closed
    pub fn live_spaces(&self) -> usize {
        self.spaces_created - self.spaces_closed
    }
}

#[derive(Default)]
struct Counters {
    dataset_opens: AtomicUsize,
    dataset_creates: AtomicUsize,
    dataset_closes: AtomicUsize,
    spaces_created: AtomicUsize,
    spaces_closed: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

/// Wrapper around a [`StorageEngine`] that can simulate failures
pub struct FailingEngine<E: StorageEngine> {
    inner: E,
    policy: Mutex<FailurePolicy>,
    transfers: AtomicUsize,
    counters: Counters,
}

impl<E: StorageEngine> FailingEngine<E> {
    /// Create a new failing engine with the given policy
    pub fn new(inner: E, policy: FailurePolicy) -> Self {
        Self {
            inner,
            policy: Mutex::new(policy),
            transfers: AtomicUsize::new(0),
            counters: Counters::default(),
        }
    }

    /// Get the underlying engine (for inspection)
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Reset the failure policy and the transfer count it is based on
    pub fn set_policy(&self, policy: FailurePolicy) {
        *self.policy.lock() = policy;
        self.transfers.store(0, Ordering::SeqCst);
    }

    pub fn stats(&self) -> EngineStats {
        let c = &self.counters;
        EngineStats {
            dataset_opens: c.dataset_opens.load(Ordering::SeqCst),
            dataset_creates: c.dataset_creates.load(Ordering::SeqCst),
            dataset_closes: c.dataset_closes.load(Ordering::SeqCst),
            spaces_created: c.spaces_created.load(Ordering::SeqCst),
            spaces_closed: c.spaces_closed.load(Ordering::SeqCst),
            reads: c.reads.load(Ordering::SeqCst),
            writes: c.writes.load(Ordering::SeqCst),
        }
    }

    /// Check if a transfer should fail based on policy
    fn should_fail(&self, is_write: bool) -> bool {
        match &*self.policy.lock() {
            FailurePolicy::Never => false,
            FailurePolicy::AfterTransfers(n) => self.transfers.load(Ordering::SeqCst) >= *n,
            FailurePolicy::Reads => !is_write,
            FailurePolicy::Writes => is_write,
        }
    }
}

impl<E: StorageEngine> StorageEngine for FailingEngine<E> {
    fn open_file(&self, path: &Path, mode: OpenMode) -> EngineResult<FileId> {
        self.inner.open_file(path, mode)
    }

    fn create_file(&self, path: &Path) -> EngineResult<FileId> {
        self.inner.create_file(path)
    }

    fn close_file(&self, file: FileId) -> EngineResult<()> {
        self.inner.close_file(file)
    }

    fn open_dataset(&self, file: FileId, name: &str) -> EngineResult<DatasetId> {
        bump(&self.counters.dataset_opens);
        self.inner.open_dataset(file, name)
    }

    fn create_dataset(
        &self,
        file: FileId,
        name: &str,
        dtype: TypeDescriptor,
        shape: &Shape,
        max_shape: Option<&Shape>,
    ) -> EngineResult<DatasetId> {
        bump(&self.counters.dataset_creates);
        self.inner.create_dataset(file, name, dtype, shape, max_shape)
    }

    fn dataset_exists(&self, file: FileId, name: &str) -> EngineResult<bool> {
        self.inner.dataset_exists(file, name)
    }

    fn remove_dataset(&self, file: FileId, name: &str) -> EngineResult<()> {
        self.inner.remove_dataset(file, name)
    }

    fn close_dataset(&self, dataset: DatasetId) -> EngineResult<()> {
        bump(&self.counters.dataset_closes);
        self.inner.close_dataset(dataset)
    }

    fn shape(&self, dataset: DatasetId) -> EngineResult<Shape> {
        self.inner.shape(dataset)
    }

    fn dtype(&self, dataset: DatasetId) -> EngineResult<TypeDescriptor> {
        self.inner.dtype(dataset)
    }

    fn dataset_space(&self, dataset: DatasetId) -> EngineResult<SpaceId> {
        let space = self.inner.dataset_space(dataset)?;
        bump(&self.counters.spaces_created);
        Ok(space)
    }

    fn create_simple_space(&self, shape: &Shape) -> EngineResult<SpaceId> {
        let space = self.inner.create_simple_space(shape)?;
        bump(&self.counters.spaces_created);
        Ok(space)
    }

    fn select_hyperslab(&self, space: SpaceId, selection: &Selection) -> EngineResult<()> {
        self.inner.select_hyperslab(space, selection)
    }

    fn close_space(&self, space: SpaceId) -> EngineResult<()> {
        self.inner.close_space(space)?;
        bump(&self.counters.spaces_closed);
        Ok(())
    }

    fn read(
        &self,
        dataset: DatasetId,
        memory_space: SpaceId,
        file_space: SpaceId,
        out: &mut [u8],
    ) -> EngineResult<()> {
        bump(&self.counters.reads);
        if self.should_fail(false) {
            return Err(EngineError::Injected(format!("read of {}", dataset)));
        }
        self.inner.read(dataset, memory_space, file_space, out)?;
        self.transfers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn write(
        &self,
        dataset: DatasetId,
        memory_space: SpaceId,
        file_space: SpaceId,
        data: &[u8],
    ) -> EngineResult<()> {
        bump(&self.counters.writes);
        if self.should_fail(true) {
            return Err(EngineError::Injected(format!("write to {}", dataset)));
        }
        self.inner.write(dataset, memory_space, file_space, data)?;
        self.transfers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryEngine;

    fn setup(policy: FailurePolicy) -> (FailingEngine<MemoryEngine>, DatasetId, SpaceId, SpaceId) {
        let engine = FailingEngine::new(MemoryEngine::new(), policy);
        let file = engine.create_file(Path::new("f")).unwrap();
        let shape = Shape::new([4]).unwrap();
        let ds = engine
            .create_dataset(file, "ds", TypeDescriptor::uint8(), &shape, None)
            .unwrap();
        let file_space = engine.dataset_space(ds).unwrap();
        let mem_space = engine.create_simple_space(&shape).unwrap();
        (engine, ds, mem_space, file_space)
    }

    #[test]
    fn test_failing_engine_never() {
        let (engine, ds, mem, file) = setup(FailurePolicy::Never);
        engine.write(ds, mem, file, &[1, 2, 3, 4]).unwrap();
        let mut out = [0u8; 4];
        engine.read(ds, mem, file, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn test_failing_engine_after_transfers() {
        let (engine, ds, mem, file) = setup(FailurePolicy::AfterTransfers(2));
        let mut out = [0u8; 4];
        assert!(engine.read(ds, mem, file, &mut out).is_ok());
        assert!(engine.read(ds, mem, file, &mut out).is_ok());
        assert!(matches!(
            engine.read(ds, mem, file, &mut out),
            Err(EngineError::Injected(_))
        ));
    }

    #[test]
    fn test_failing_engine_reads_only() {
        let (engine, ds, mem, file) = setup(FailurePolicy::Reads);
        assert!(engine.write(ds, mem, file, &[0; 4]).is_ok());
        let mut out = [0u8; 4];
        assert!(engine.read(ds, mem, file, &mut out).is_err());
    }

    #[test]
    fn test_failing_engine_set_policy() {
        let (engine, ds, mem, file) = setup(FailurePolicy::Writes);
        assert!(engine.write(ds, mem, file, &[0; 4]).is_err());
        engine.set_policy(FailurePolicy::Never);
        assert!(engine.write(ds, mem, file, &[0; 4]).is_ok());
    }

    #[test]
    fn test_stats() {
        let (engine, ds, mem, file) = setup(FailurePolicy::Never);
        let stats = engine.stats();
        assert_eq!(stats.dataset_creates, 1);
        assert_eq!(stats.spaces_created, 2);
        assert_eq!(stats.live_spaces(), 2);

        engine.close_space(mem).unwrap();
        engine.close_space(file).unwrap();
        engine.close_dataset(ds).unwrap();
        let stats = engine.stats();
        assert_eq!(stats.live_spaces(), 0);
        assert_eq!(stats.dataset_closes, 1);
    }
}
