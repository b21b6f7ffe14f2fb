use crate::{error::InternalError, metadata::EntityMetadata};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

///
/// MetadataCache
///
/// Process-wide memo of resolved entity metadata, keyed by entity path.
/// Population may race; the first insert wins and later builds are discarded.
///

#[derive(Default)]
pub(crate) struct MetadataCache {
    entries: RwLock<HashMap<&'static str, Arc<EntityMetadata>>>,
}

impl MetadataCache {
    pub(crate) fn get_or_try_insert(
        &self,
        path: &'static str,
        build: impl FnOnce() -> Result<EntityMetadata, InternalError>,
    ) -> Result<Arc<EntityMetadata>, InternalError> {
        if let Some(hit) = self.entries.read().get(path) {
            return Ok(Arc::clone(hit));
        }

        // Build outside the lock; resolution only reads static models.
        let built = Arc::new(build()?);
        let mut entries = self.entries.write();

        Ok(Arc::clone(entries.entry(path).or_insert(built)))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}
