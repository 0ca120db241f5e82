//! # Dataset Access
//!
//! Hyperslab reads and writes over datasets held by a storage engine.
//!
//! ## Philosophy
//!
//! - **One handle per name**: a [`FileRegistry`] opens each dataset at most
//!   once and hands out shared [`DatasetHandle`]s.
//! - **Selections are serialized per handle**: selecting a dataspace and
//!   transferring through it happen under one lock, so concurrent readers of
//!   the same handle never see each other's selections.
//! - **Scoped resources**: engine dataspaces and datasets are released when
//!   their owner closes or drops, including on error paths.
//! - **Errors go to the caller**: nothing is retried and nothing is only
//!   logged.
//!
//! ## Example
//!
//! ```ignore
//! use dataset_io::{FileRegistry, RegistryConfig};
//! use storage_engine::MemoryEngine;
//!
//! let engine = std::sync::Arc::new(MemoryEngine::new());
//! let registry = FileRegistry::create(engine, "data.h5", RegistryConfig::default())?;
//! let ds = registry.create_dataset("DS2", TypeDescriptor::int32(), &shape, None)?;
//! let row = ds.read_slice(0, 1)?;
//! registry.close()?;
//! ```

pub mod config;
pub mod error;
mod guard;
pub mod handle;
pub mod registry;

pub use config::{ConfigError, RegistryConfig};
pub use error::{DatasetError, DatasetResult};
pub use handle::{DatasetHandle, HandleState};
pub use registry::FileRegistry;
pub use storage_engine::OpenMode;
