use crate::{
    error::InternalError,
    metadata::{EntityMetadata, MetadataCache, RelationMeta},
    model::{entity::EntityModel, field::EntityFieldModel, relation::Cardinality},
    traits::EntityKind,
};
use std::{collections::BTreeMap, sync::Arc};

///
/// EntityRegistry
///
/// Set of entity models known to the reconciler, keyed by entity name.
///
/// Registration happens up front (`&mut self`); afterwards the registry is
/// shared read-only, and metadata is resolved lazily into a concurrent cache.
///

#[derive(Default)]
pub struct EntityRegistry {
    models: BTreeMap<&'static str, &'static EntityModel>,
    cache: MetadataCache,
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model. Re-registering the same path is a no-op.
    pub fn register(&mut self, model: &'static EntityModel) -> Result<(), InternalError> {
        if let Some(existing) = self.models.get(model.entity_name) {
            if existing.path == model.path {
                return Ok(());
            }

            return Err(InternalError::metadata_conflict(format!(
                "entity name '{}' is already registered by {}",
                model.entity_name, existing.path
            )));
        }
        self.models.insert(model.entity_name, model);

        Ok(())
    }

    pub fn register_kind<E: EntityKind>(&mut self) -> Result<(), InternalError> {
        self.register(E::MODEL)
    }

    /// Builder form of [`Self::register`].
    pub fn with(mut self, model: &'static EntityModel) -> Result<Self, InternalError> {
        self.register(model)?;

        Ok(self)
    }

    #[must_use]
    pub fn model(&self, entity_name: &str) -> Option<&'static EntityModel> {
        self.models.get(entity_name).copied()
    }

    pub fn models(&self) -> impl Iterator<Item = &'static EntityModel> + '_ {
        self.models.values().copied()
    }

    /// Resolve every registered model, surfacing declaration errors eagerly.
    pub fn validate(&self) -> Result<(), InternalError> {
        for model in self.models.values() {
            self.metadata(model)?;
        }

        Ok(())
    }

    /// Cached metadata for a registered model.
    pub fn metadata(&self, model: &'static EntityModel) -> Result<Arc<EntityMetadata>, InternalError> {
        match self.models.get(model.entity_name) {
            Some(registered) if registered.path == model.path => {}
            _ => return Err(InternalError::unknown_entity(model.entity_name)),
        }

        self.cache.get_or_try_insert(model.path, || {
            EntityMetadata::build(model, |name| self.model(name))
        })
    }

    /// Relations of `model` with the given cardinality.
    pub fn relational_fields(
        &self,
        model: &'static EntityModel,
        cardinality: Cardinality,
    ) -> Result<Vec<RelationMeta>, InternalError> {
        Ok(self.metadata(model)?.relations(cardinality).to_vec())
    }

    /// Scalar fields of `model` copied during a merge.
    pub fn mergeable_fields(
        &self,
        model: &'static EntityModel,
    ) -> Result<Vec<&'static EntityFieldModel>, InternalError> {
        Ok(self.metadata(model)?.mergeable_fields().to_vec())
    }

    /// Identifier field of `model`, possibly inherited.
    pub fn identifier_field(
        &self,
        model: &'static EntityModel,
    ) -> Result<&'static EntityFieldModel, InternalError> {
        Ok(self.metadata(model)?.primary_key())
    }

    /// Number of models with resolved metadata.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
