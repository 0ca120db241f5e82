//! Scoped engine dataspaces

use array_types::Shape;
use std::sync::Arc;
use storage_engine::{DatasetId, EngineResult, SpaceId, StorageEngine};
use tracing::warn;

/// Owns one engine dataspace and closes it when dropped.
///
/// Use [`SpaceGuard::release`] where the close error must reach the caller.
pub(crate) struct SpaceGuard {
    engine: Arc<dyn StorageEngine>,
    id: SpaceId,
    closed: bool,
}

impl SpaceGuard {
    pub(crate) fn create(engine: &Arc<dyn StorageEngine>, shape: &Shape) -> EngineResult<Self> {
        let id = engine.create_simple_space(shape)?;
        Ok(Self {
            engine: Arc::clone(engine),
            id,
            closed: false,
        })
    }

    pub(crate) fn for_dataset(
        engine: &Arc<dyn StorageEngine>,
        dataset: DatasetId,
    ) -> EngineResult<Self> {
        let id = engine.dataset_space(dataset)?;
        Ok(Self {
            engine: Arc::clone(engine),
            id,
            closed: false,
        })
    }

    pub(crate) fn id(&self) -> SpaceId {
        self.id
    }

    /// Closes the dataspace now, reporting failure
    pub(crate) fn release(mut self) -> EngineResult<()> {
        self.closed = true;
        self.engine.close_space(self.id)
    }
}

impl Drop for SpaceGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.engine.close_space(self.id) {
            warn!(space = %self.id, error = %err, "failed to close dataspace");
        }
    }
}
