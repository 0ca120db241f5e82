//! Dataset Test Utilities
//!
//! Shared setup for the cross-crate dataset tests.
//!
//! ## Test Philosophy
//!
//! - **Known contents**: seeded datasets hold values computable from their
//!   coordinates, so any slice can be checked without a second copy
//! - **Observable resources**: engines are wrapped in a `FailingEngine` whose
//!   counters show leaked dataspaces and repeated opens
//! - **Injected faults**: transfer failures are triggered by policy, never by
//!   timing

use array_types::{Shape, TypeDescriptor};
use dataset_io::{DatasetHandle, FileRegistry, RegistryConfig};
use std::env;
use std::sync::Arc;
use storage_engine::{FailingEngine, FailurePolicy, MemoryEngine, StorageEngine};

/// Records in the seeded grid
pub const ROWS: u64 = 5000;
/// Elements per record in the seeded grid
pub const COLS: u64 = 30;
/// Name of the seeded grid dataset
pub const GRID: &str = "DS2";

/// Installs a compact tracing subscriber once; honours `RUST_LOG`
pub fn init_logger() {
    if env::var("RUST_LOG").is_err() {
        return;
    }
    _ = tracing_subscriber::fmt()
        .compact()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Value stored at `(row, col)` of the seeded grid
pub fn grid_value(row: u64, col: u64) -> i32 {
    (row + col) as i32
}

/// In-memory engine behind a counting wrapper, as both its concrete and
/// trait-object form
pub fn counting_engine() -> (Arc<FailingEngine<MemoryEngine>>, Arc<dyn StorageEngine>) {
    let failing = Arc::new(FailingEngine::new(MemoryEngine::new(), FailurePolicy::Never));
    let engine: Arc<dyn StorageEngine> = failing.clone();
    (failing, engine)
}

/// Creates the `ROWS x COLS` int32 grid in `registry`, filled with
/// [`grid_value`]
pub fn seed_grid(registry: &FileRegistry) -> Arc<DatasetHandle> {
    init_logger();
    let shape = Shape::new([ROWS, COLS]).unwrap();
    let handle = registry
        .create_dataset(GRID, TypeDescriptor::int32(), &shape, None)
        .unwrap();

    let chunk = 500;
    for start in (0..ROWS).step_by(chunk as usize) {
        let values: Vec<i32> = (start..start + chunk)
            .flat_map(|row| (0..COLS).map(move |col| grid_value(row, col)))
            .collect();
        handle.write_slice_from(start, &values).unwrap();
    }
    handle
}

/// Fresh in-memory registry holding the seeded grid
pub fn seeded_registry() -> (Arc<FailingEngine<MemoryEngine>>, FileRegistry, Arc<DatasetHandle>) {
    let (failing, engine) = counting_engine();
    let registry = FileRegistry::create(engine, "grid.h5", RegistryConfig::default()).unwrap();
    let handle = seed_grid(&registry);
    (failing, registry, handle)
}

/// Expected decoded contents of rows `start..start + count`
pub fn expected_rows(start: u64, count: u64) -> Vec<i32> {
    (start..start + count)
        .flat_map(|row| (0..COLS).map(move |col| grid_value(row, col)))
        .collect()
}
