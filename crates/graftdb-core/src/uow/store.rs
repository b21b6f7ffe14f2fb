use crate::{
    entity::Record,
    error::{ErrorClass, ErrorOrigin, InternalError},
    key::Key,
    metadata::EntityMetadata,
    model::{
        entity::EntityModel,
        field::{EntityFieldKind, ScalarKind},
    },
    registry::EntityRegistry,
    uow::UnitOfWork,
};
use derive_more::Display;
use std::{collections::BTreeMap, sync::Arc};

///
/// RowRef
///
/// Reference from one stored row to another, by entity name and key.
///

#[derive(Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{entity}[{key}]")]
pub struct RowRef {
    pub entity: &'static str,
    pub key: Key,
}

impl RowRef {
    #[must_use]
    pub fn new(entity: &'static str, key: impl Into<Key>) -> Self {
        Self {
            entity,
            key: key.into(),
        }
    }
}

/// Committed row.
pub type StoredRecord = Record<RowRef>;

///
/// Table
///

#[derive(Clone, Debug, Default)]
pub(crate) struct Table {
    rows: BTreeMap<Key, StoredRecord>,
    next_id: u64,
}

impl Table {
    // keep generated identifiers clear of explicitly inserted ones
    fn observe(&mut self, key: &Key) {
        let next = match key {
            Key::Int(v) => u64::try_from(*v).ok().map(|v| v.saturating_add(1)),
            Key::Uint(v) => Some(v.saturating_add(1)),
            Key::Text(_) => None,
        };
        if let Some(next) = next {
            self.next_id = self.next_id.max(next);
        }
    }
}

///
/// Tables
///
/// Every table of a store. Cloned wholesale to stage a flush.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct Tables(BTreeMap<&'static str, Table>);

impl Tables {
    pub(crate) fn get(&self, entity: &str, key: &Key) -> Option<&StoredRecord> {
        self.0.get(entity).and_then(|table| table.rows.get(key))
    }

    pub(crate) fn put(&mut self, entity: &'static str, key: Key, row: StoredRecord) {
        let table = self.0.entry(entity).or_default();
        table.observe(&key);
        table.rows.insert(key, row);
    }

    /// Keep generated identifiers clear of `key` before its row is written.
    pub(crate) fn reserve(&mut self, entity: &'static str, key: &Key) {
        self.0.entry(entity).or_default().observe(key);
    }

    pub(crate) fn delete(&mut self, entity: &str, key: &Key) -> bool {
        self.0
            .get_mut(entity)
            .is_some_and(|table| table.rows.remove(key).is_some())
    }

    /// Next identifier for an entity whose key is generated by the store.
    pub(crate) fn generate_key(&mut self, meta: &EntityMetadata) -> Result<Key, InternalError> {
        let model = meta.model();
        let pk = meta.primary_key();
        let EntityFieldKind::Scalar(kind) = pk.kind else {
            return Err(InternalError::store_invariant(format!(
                "{}.{} is not a scalar identifier",
                model.path, pk.name
            )));
        };
        if !kind.is_generated() {
            return Err(InternalError::new(
                ErrorClass::Unsupported,
                ErrorOrigin::Store,
                format!(
                    "{} has no identifier and {}.{} cannot be generated",
                    model.path, model.path, pk.name
                ),
            ));
        }

        let table = self.0.entry(model.entity_name).or_default();
        let next = table.next_id.max(1);
        table.next_id = next.saturating_add(1);

        match kind {
            ScalarKind::Uint => Ok(Key::Uint(next)),
            _ => i64::try_from(next).map(Key::Int).map_err(|_| {
                InternalError::store_invariant(format!("{} identifier space exhausted", model.path))
            }),
        }
    }

    fn len(&self, entity: &str) -> usize {
        self.0.get(entity).map_or(0, |table| table.rows.len())
    }

    fn rows(&self, entity: &str) -> impl Iterator<Item = (&Key, &StoredRecord)> {
        self.0.get(entity).into_iter().flat_map(|table| table.rows.iter())
    }
}

///
/// MemoryStore
///
/// Committed rows of every registered entity, keyed by entity name.
///

pub struct MemoryStore {
    registry: Arc<EntityRegistry>,
    tables: Tables,
}

impl MemoryStore {
    #[must_use]
    pub fn new(registry: Arc<EntityRegistry>) -> Self {
        Self {
            registry,
            tables: Tables::default(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Seed a row directly, bypassing any unit of work.
    /// Rows without an identifier get a generated one.
    pub fn insert(&mut self, mut row: StoredRecord) -> Result<Key, InternalError> {
        let meta = self.registry.metadata(row.model())?;
        let key = match meta.key_of(&row)? {
            Some(key) => key,
            None => self.tables.generate_key(&meta)?,
        };
        row.set_scalar(meta.primary_key().name, key.to_value());
        self.tables.put(row.model().entity_name, key.clone(), row);

        Ok(key)
    }

    #[must_use]
    pub fn get(&self, model: &'static EntityModel, key: &Key) -> Option<&StoredRecord> {
        self.tables.get(model.entity_name, key)
    }

    #[must_use]
    pub fn contains(&self, model: &'static EntityModel, key: &Key) -> bool {
        self.get(model, key).is_some()
    }

    #[must_use]
    pub fn len(&self, model: &'static EntityModel) -> usize {
        self.tables.len(model.entity_name)
    }

    pub fn rows(
        &self,
        model: &'static EntityModel,
    ) -> impl Iterator<Item = (&Key, &StoredRecord)> + '_ {
        self.tables.rows(model.entity_name)
    }

    /// Open a unit of work over this store.
    pub fn begin(&mut self) -> UnitOfWork<'_> {
        UnitOfWork::new(self)
    }

    pub(crate) fn registry_arc(&self) -> Arc<EntityRegistry> {
        Arc::clone(&self.registry)
    }

    pub(crate) const fn tables(&self) -> &Tables {
        &self.tables
    }

    pub(crate) fn commit(&mut self, tables: Tables) {
        self.tables = tables;
    }
}
