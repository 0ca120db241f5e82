//! # Storage Engine Boundary
//!
//! This crate defines the boundary between the dataset access layer and the
//! engine that owns the container format.
//!
//! ## Philosophy
//!
//! **The access layer never touches container bytes directly.**
//!
//! Everything goes through [`StorageEngine`]: files, datasets and dataspaces
//! are opaque typed handles, and transfers are described by a memory space and
//! a file space with hyperslabs selected on them.
//!
//! ## Engines
//!
//! - [`MemoryEngine`]: volatile containers kept for the life of the engine
//! - [`DirectoryEngine`]: one directory per container, a JSON header and a raw
//!   data file per dataset
//! - [`FailingEngine`]: wraps another engine to inject transfer failures and
//!   count calls, for tests

pub mod container;
pub mod directory;
pub mod engine;
pub mod error;
pub mod failing;
pub mod ids;
pub mod memory;
pub mod space;

pub use container::{Container, ContainerEngine, DatasetMeta, Store};
pub use directory::{DirectoryContainer, DirectoryStore};
pub use engine::{OpenMode, StorageEngine};
pub use error::{EngineError, EngineResult};
pub use failing::{EngineStats, FailingEngine, FailurePolicy};
pub use ids::{DatasetId, FileId, SpaceId};
pub use memory::{MemoryContainer, MemoryStore};
pub use space::Dataspace;

/// Engine keeping every container in memory
pub type MemoryEngine = ContainerEngine<MemoryStore>;

/// Engine storing containers as directories on the local filesystem
pub type DirectoryEngine = ContainerEngine<DirectoryStore>;

impl MemoryEngine {
    pub fn new() -> Self {
        ContainerEngine::with_store(MemoryStore::new())
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryEngine {
    pub fn new() -> Self {
        ContainerEngine::with_store(DirectoryStore)
    }
}

impl Default for DirectoryEngine {
    fn default() -> Self {
        Self::new()
    }
}
