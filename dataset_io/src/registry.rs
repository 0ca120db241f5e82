//! File registry
//!
//! A [`FileRegistry`] owns one open container and the handles of the datasets
//! opened from it. Each name maps to at most one [`DatasetHandle`] while the
//! registry is open.

use crate::config::RegistryConfig;
use crate::error::{DatasetError, DatasetResult};
use crate::handle::{DatasetHandle, HandleState};
use array_types::{Shape, TypeDescriptor};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage_engine::{DatasetMeta, FileId, StorageEngine};
use tracing::{debug, info, warn};

enum RegistryInner {
    Open {
        file: FileId,
        datasets: HashMap<String, Arc<DatasetHandle>>,
    },
    Closed,
}

/// Open container plus a name -> handle cache
pub struct FileRegistry {
    path: PathBuf,
    engine: Arc<dyn StorageEngine>,
    config: RegistryConfig,
    inner: Mutex<RegistryInner>,
}

impl FileRegistry {
    /// Opens an existing container with the configured mode
    pub fn open(
        engine: Arc<dyn StorageEngine>,
        path: impl AsRef<Path>,
        config: RegistryConfig,
    ) -> DatasetResult<Self> {
        let path = path.as_ref();
        let file = engine.open_file(path, config.mode)?;
        info!(path = %path.display(), mode = ?config.mode, "container opened");
        Ok(Self::with_file(engine, path, config, file))
    }

    /// Creates a new, empty container. The container is always writable.
    pub fn create(
        engine: Arc<dyn StorageEngine>,
        path: impl AsRef<Path>,
        config: RegistryConfig,
    ) -> DatasetResult<Self> {
        let path = path.as_ref();
        let file = engine.create_file(path)?;
        info!(path = %path.display(), "container created");
        Ok(Self::with_file(engine, path, config, file))
    }

    fn with_file(
        engine: Arc<dyn StorageEngine>,
        path: &Path,
        config: RegistryConfig,
        file: FileId,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            engine,
            config,
            inner: Mutex::new(RegistryInner::Open {
                file,
                datasets: HashMap::new(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.inner.lock(), RegistryInner::Open { .. })
    }

    /// Whether a handle for `name` is cached
    pub fn contains(&self, name: &str) -> bool {
        match &*self.inner.lock() {
            RegistryInner::Open { datasets, .. } => datasets.contains_key(name),
            RegistryInner::Closed => false,
        }
    }

    /// Names of the cached handles, sorted
    pub fn dataset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match &*self.inner.lock() {
            RegistryInner::Open { datasets, .. } => datasets.keys().cloned().collect(),
            RegistryInner::Closed => Vec::new(),
        };
        names.sort();
        names
    }

    /// Returns the handle for `name`, opening it on first use.
    ///
    /// The registry lock is held while the dataset opens, so concurrent callers
    /// asking for the same name share one handle.
    pub fn open_dataset(&self, name: &str) -> DatasetResult<Arc<DatasetHandle>> {
        let mut inner = self.inner.lock();
        let RegistryInner::Open { file, datasets } = &mut *inner else {
            return Err(self.closed_error());
        };
        if let Some(handle) = datasets.get(name) {
            debug!(dataset = name, "dataset handle reused");
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(DatasetHandle::open(&self.engine, *file, name)?);
        datasets.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Creates `name` and returns its handle.
    ///
    /// A cached handle for `name` is returned as is. A dataset that exists on
    /// disk but is not cached is replaced when `recreate_existing` is set and
    /// rejected with `AlreadyExists` otherwise.
    pub fn create_dataset(
        &self,
        name: &str,
        dtype: TypeDescriptor,
        shape: &Shape,
        max_shape: Option<&Shape>,
    ) -> DatasetResult<Arc<DatasetHandle>> {
        let mut inner = self.inner.lock();
        let RegistryInner::Open { file, datasets } = &mut *inner else {
            return Err(self.closed_error());
        };
        if let Some(handle) = datasets.get(name) {
            debug!(dataset = name, "dataset handle reused");
            return Ok(Arc::clone(handle));
        }

        if self.engine.dataset_exists(*file, name)? {
            if !self.config.recreate_existing {
                return Err(DatasetError::AlreadyExists(name.to_string()));
            }
            // Validate the replacement before removing the original
            DatasetMeta {
                dtype,
                shape: shape.clone(),
                max_shape: max_shape.cloned(),
            }
            .validate()?;
            self.engine.remove_dataset(*file, name)?;
            info!(dataset = name, "existing dataset removed for recreation");
        }

        let handle = Arc::new(DatasetHandle::create(
            &self.engine,
            *file,
            name,
            dtype,
            shape,
            max_shape,
        )?);
        datasets.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Closes every cached handle, then the container.
    ///
    /// Handles still held by callers become closed. Closing a closed registry
    /// does nothing. All resources are released even when one fails; the
    /// first failure is returned.
    pub fn close(&self) -> DatasetResult<()> {
        let previous = std::mem::replace(&mut *self.inner.lock(), RegistryInner::Closed);
        let RegistryInner::Open { file, datasets } = previous else {
            return Ok(());
        };

        let mut result = Ok(());
        let mut handles: Vec<_> = datasets.into_iter().collect();
        handles.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, handle) in handles {
            result = result.and(handle.close());
        }
        result = result.and(self.engine.close_file(file).map_err(DatasetError::from));
        info!(path = %self.path.display(), "container closed");
        result
    }

    fn closed_error(&self) -> DatasetError {
        DatasetError::InvalidState {
            target: self.path.display().to_string(),
            state: HandleState::Closed,
        }
    }
}

impl fmt::Debug for FileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRegistry")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("open", &self.is_open())
            .field("datasets", &self.dataset_names())
            .finish()
    }
}

impl Drop for FileRegistry {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(path = %self.path.display(), error = %err, "failed to close container on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_engine::{EngineError, FailingEngine, FailurePolicy, MemoryEngine};

    fn engine() -> (Arc<FailingEngine<MemoryEngine>>, Arc<dyn StorageEngine>) {
        let failing = Arc::new(FailingEngine::new(MemoryEngine::new(), FailurePolicy::Never));
        let engine: Arc<dyn StorageEngine> = failing.clone();
        (failing, engine)
    }

    fn shape() -> Shape {
        Shape::new([8, 3]).unwrap()
    }

    #[test]
    fn test_open_missing_container() {
        let (_, engine) = engine();
        let err = FileRegistry::open(engine, "missing.h5", RegistryConfig::default()).unwrap_err();
        assert!(matches!(err, DatasetError::Transfer(EngineError::NotFound(_))));
    }

    #[test]
    fn test_open_dataset_is_idempotent() {
        let (failing, engine) = engine();
        let registry =
            FileRegistry::create(engine, "reg.h5", RegistryConfig::default()).unwrap();
        registry
            .create_dataset("DS1", TypeDescriptor::int32(), &shape(), None)
            .unwrap();
        registry.close().unwrap();

        let engine: Arc<dyn StorageEngine> = failing.clone();
        let registry = FileRegistry::open(engine, "reg.h5", RegistryConfig::default()).unwrap();
        let a = registry.open_dataset("DS1").unwrap();
        let b = registry.open_dataset("DS1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(failing.stats().dataset_opens, 1);
        assert_eq!(registry.dataset_names(), vec!["DS1".to_string()]);
        assert!(registry.contains("DS1"));
    }

    #[test]
    fn test_create_returns_cached_handle() {
        let (failing, engine) = engine();
        let registry = FileRegistry::create(engine, "reg.h5", RegistryConfig::default()).unwrap();
        let a = registry
            .create_dataset("DS2", TypeDescriptor::int32(), &shape(), None)
            .unwrap();
        let b = registry
            .create_dataset("DS2", TypeDescriptor::int32(), &shape(), None)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(failing.stats().dataset_creates, 1);
    }

    #[test]
    fn test_create_existing_on_disk() {
        let (failing, engine) = engine();
        let registry =
            FileRegistry::create(engine.clone(), "reg.h5", RegistryConfig::default()).unwrap();
        registry
            .create_dataset("DS2", TypeDescriptor::int32(), &shape(), None)
            .unwrap();
        registry.close().unwrap();

        let registry =
            FileRegistry::open(engine.clone(), "reg.h5", RegistryConfig::default()).unwrap();
        let err = registry
            .create_dataset("DS2", TypeDescriptor::int32(), &shape(), None)
            .unwrap_err();
        assert!(matches!(err, DatasetError::AlreadyExists(name) if name == "DS2"));
        registry.close().unwrap();

        let config = RegistryConfig::default().with_recreate_existing(true);
        let registry = FileRegistry::open(engine, "reg.h5", config).unwrap();
        let handle = registry
            .create_dataset("DS2", TypeDescriptor::float64(), &Shape::new([2]).unwrap(), None)
            .unwrap();
        assert_eq!(handle.dtype(), TypeDescriptor::float64());
        assert_eq!(handle.shape().dims(), &[2]);
        assert_eq!(failing.stats().dataset_creates, 2);
    }

    #[test]
    fn test_rejected_recreate_keeps_original() {
        let (_, engine) = engine();
        let registry =
            FileRegistry::create(engine.clone(), "reg.h5", RegistryConfig::default()).unwrap();
        registry
            .create_dataset("DS2", TypeDescriptor::int32(), &shape(), None)
            .unwrap()
            .write_slice_from(0, &[7i32; 24])
            .unwrap();
        registry.close().unwrap();

        let config = RegistryConfig::default().with_recreate_existing(true);
        let registry = FileRegistry::open(engine, "reg.h5", config).unwrap();
        let bad_max = Shape::new([5, 4]).unwrap();
        let err = registry
            .create_dataset(
                "DS2",
                TypeDescriptor::int32(),
                &Shape::new([10, 4]).unwrap(),
                Some(&bad_max),
            )
            .unwrap_err();
        assert!(matches!(err, DatasetError::Transfer(EngineError::InvalidShape(_))));
        assert!(!registry.contains("DS2"));

        let handle = registry.open_dataset("DS2").unwrap();
        assert_eq!(handle.shape(), &shape());
        assert_eq!(handle.read_slice_as::<i32>(7, 1).unwrap(), vec![7; 3]);
    }

    #[test]
    fn test_oversized_create() {
        let (_, engine) = engine();
        let registry = FileRegistry::create(engine, "reg.h5", RegistryConfig::default()).unwrap();
        let err = registry
            .create_dataset(
                "big",
                TypeDescriptor::int32(),
                &Shape::new([u64::MAX, 4]).unwrap(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, DatasetError::Transfer(EngineError::InvalidShape(_))));
        assert!(!registry.contains("big"));
    }

    #[test]
    fn test_create_in_read_only_registry() {
        let (_, engine) = engine();
        FileRegistry::create(engine.clone(), "reg.h5", RegistryConfig::default())
            .unwrap()
            .close()
            .unwrap();

        let registry = FileRegistry::open(engine, "reg.h5", RegistryConfig::read_only()).unwrap();
        let err = registry
            .create_dataset("DS2", TypeDescriptor::int32(), &shape(), None)
            .unwrap_err();
        assert!(matches!(err, DatasetError::Transfer(EngineError::ReadOnly)));
        assert!(!registry.contains("DS2"));
    }

    #[test]
    fn test_close_closes_handles() {
        let (failing, engine) = engine();
        let registry = FileRegistry::create(engine, "reg.h5", RegistryConfig::default()).unwrap();
        let handle = registry
            .create_dataset("DS2", TypeDescriptor::int32(), &shape(), None)
            .unwrap();
        handle.read_slice(0, 2).unwrap();

        registry.close().unwrap();
        assert!(!registry.is_open());
        assert_eq!(handle.state(), HandleState::Closed);
        assert_eq!(failing.stats().live_spaces(), 0);
        assert!(registry.dataset_names().is_empty());

        registry.close().unwrap();
        let err = registry.open_dataset("DS2").unwrap_err();
        assert!(matches!(err, DatasetError::InvalidState { .. }));
        assert_eq!(err.to_string(), "reg.h5 is closed");
    }

    #[test]
    fn test_drop_closes_container() {
        let (failing, engine) = engine();
        {
            let registry =
                FileRegistry::create(engine.clone(), "reg.h5", RegistryConfig::default()).unwrap();
            registry
                .create_dataset("DS2", TypeDescriptor::int32(), &shape(), None)
                .unwrap();
        }
        let stats = failing.stats();
        assert_eq!(stats.dataset_closes, 1);
        assert_eq!(stats.live_spaces(), 0);

        // Container was flushed and closed, so it opens again
        let registry = FileRegistry::open(engine, "reg.h5", RegistryConfig::default()).unwrap();
        assert_eq!(registry.open_dataset("DS2").unwrap().shape(), &shape());
    }
}
