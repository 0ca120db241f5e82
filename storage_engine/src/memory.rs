//! In-memory container store
//!
//! Containers live as long as the [`MemoryStore`] does. Opening the same path
//! twice shares one container, so data written through one open is visible
//! through the other. Data is lost when the store is dropped.

use crate::{Container, DatasetMeta, EngineError, EngineResult, OpenMode, Store};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct MemoryDataset {
    meta: DatasetMeta,
    data: Vec<u8>,
}

type Datasets = Arc<Mutex<HashMap<String, MemoryDataset>>>;

#[derive(Default)]
pub struct MemoryStore {
    containers: Mutex<HashMap<PathBuf, Datasets>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    type Container = MemoryContainer;

    fn open(&self, path: &Path, _mode: OpenMode) -> EngineResult<MemoryContainer> {
        self.containers
            .lock()
            .get(path)
            .cloned()
            .map(|datasets| MemoryContainer { datasets })
            .ok_or_else(|| EngineError::NotFound(path.display().to_string()))
    }

    fn create(&self, path: &Path) -> EngineResult<MemoryContainer> {
        let mut containers = self.containers.lock();
        if containers.contains_key(path) {
            return Err(EngineError::AlreadyExists(path.display().to_string()));
        }
        let datasets = Datasets::default();
        containers.insert(path.to_path_buf(), Arc::clone(&datasets));
        Ok(MemoryContainer { datasets })
    }
}

/// An open view of an in-memory container
pub struct MemoryContainer {
    datasets: Datasets,
}

fn byte_range(offset: u64, len: usize, total: usize) -> EngineResult<std::ops::Range<usize>> {
    let start = usize::try_from(offset).map_err(|_| EngineError::Corrupt("offset".into()))?;
    match start.checked_add(len) {
        Some(end) if end <= total => Ok(start..end),
        _ => Err(EngineError::Corrupt(format!(
            "access {}..{} past end of {} bytes",
            start,
            start.saturating_add(len),
            total
        ))),
    }
}

impl Container for MemoryContainer {
    fn contains(&self, name: &str) -> EngineResult<bool> {
        Ok(self.datasets.lock().contains_key(name))
    }

    fn metadata(&self, name: &str) -> EngineResult<DatasetMeta> {
        self.datasets
            .lock()
            .get(name)
            .map(|ds| ds.meta.clone())
            .ok_or_else(|| EngineError::NotFound(name.to_string()))
    }

    fn create(&mut self, name: &str, meta: &DatasetMeta) -> EngineResult<()> {
        let len = usize::try_from(meta.byte_len()?)
            .map_err(|_| EngineError::InvalidShape(format!("{} is too large", meta.shape)))?;
        self.datasets.lock().insert(
            name.to_string(),
            MemoryDataset {
                meta: meta.clone(),
                data: vec![0; len],
            },
        );
        Ok(())
    }

    fn remove(&mut self, name: &str) -> EngineResult<()> {
        self.datasets
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(name.to_string()))
    }

    fn read_at(&mut self, name: &str, offset: u64, buf: &mut [u8]) -> EngineResult<()> {
        let datasets = self.datasets.lock();
        let ds = datasets
            .get(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        let range = byte_range(offset, buf.len(), ds.data.len())?;
        buf.copy_from_slice(&ds.data[range]);
        Ok(())
    }

    fn write_at(&mut self, name: &str, offset: u64, data: &[u8]) -> EngineResult<()> {
        let mut datasets = self.datasets.lock();
        let ds = datasets
            .get_mut(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        let range = byte_range(offset, data.len(), ds.data.len())?;
        ds.data[range].copy_from_slice(data);
        Ok(())
    }
}
