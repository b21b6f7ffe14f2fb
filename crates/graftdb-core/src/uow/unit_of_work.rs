use crate::{
    entity::{AttachedRecord, EntityHandle, Record, Refs, Slot},
    error::{ErrorClass, ErrorOrigin, InternalError},
    gateway::PersistenceGateway,
    key::Key,
    model::entity::EntityModel,
    registry::EntityRegistry,
    uow::store::{MemoryStore, RowRef, StoredRecord, Tables},
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::debug;

///
/// EntityState
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntityState {
    /// Instantiated in this unit of work; inserted on flush.
    New,
    /// Attached from the store.
    Managed,
    /// Scheduled for deletion.
    Removed,
}

///
/// FlushReport
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FlushReport {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
}

struct ManagedEntity {
    record: AttachedRecord,
    state: EntityState,
    // key of the stored row this entity was attached from
    origin: Option<Key>,
}

///
/// UnitOfWork
///
/// Identity-mapped view of a `MemoryStore`. Every stored row is attached at
/// most once, so two lookups of the same key yield the same handle.
///

pub struct UnitOfWork<'s> {
    store: &'s mut MemoryStore,
    registry: Arc<EntityRegistry>,
    entities: Vec<ManagedEntity>,
    identity: HashMap<(&'static str, Key), EntityHandle>,
}

impl<'s> UnitOfWork<'s> {
    pub(crate) fn new(store: &'s mut MemoryStore) -> Self {
        let registry = store.registry_arc();

        Self {
            store,
            registry,
            entities: Vec::new(),
            identity: HashMap::new(),
        }
    }

    #[must_use]
    pub fn state(&self, handle: EntityHandle) -> Option<EntityState> {
        self.entities.get(handle.index()).map(|entity| entity.state)
    }

    /// Number of entities tracked, including removed ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Current identifier of an attached entity.
    pub fn key_of(&self, handle: EntityHandle) -> Result<Option<Key>, InternalError> {
        let record = self
            .entity(handle)
            .ok_or_else(|| InternalError::stale_handle(handle))?;

        self.registry.metadata(record.model())?.key_of(record)
    }

    /// Handle of an already attached row, without touching the store.
    #[must_use]
    pub fn attached(&self, model: &'static EntityModel, key: &Key) -> Option<EntityHandle> {
        self.identity.get(&(model.entity_name, key.clone())).copied()
    }

    /// Write every change back to the store.
    ///
    /// New entities receive generated identifiers, removed entities are
    /// deleted, and references to removed entities are dropped. The store is
    /// only updated when every entity converts cleanly.
    pub fn flush(&mut self) -> Result<FlushReport, InternalError> {
        let mut staged = self.store.tables().clone();
        let keys = self.assign_keys(&mut staged)?;
        let mut report = FlushReport::default();

        for (index, entity) in self.entities.iter().enumerate() {
            let model = entity.record.model();

            match (entity.state, &keys[index]) {
                (EntityState::Removed, _) => {
                    if let Some(origin) = &entity.origin
                        && staged.delete(model.entity_name, origin)
                    {
                        debug!(entity = model.path, key = %origin, "row deleted");
                        report.deleted += 1;
                    }
                }
                (state, Some(key)) => {
                    let row = self.to_row(&entity.record, key, &keys)?;
                    let changed = staged
                        .get(model.entity_name, key)
                        .is_none_or(|stored| !stored.slots().eq(row.slots()));

                    if state == EntityState::New {
                        report.inserted += 1;
                    } else if changed {
                        report.updated += 1;
                    }
                    if changed {
                        debug!(entity = model.path, key = %key, ?state, "row written");
                    }
                    staged.put(model.entity_name, key.clone(), row);
                }
                (_, None) => {
                    return Err(InternalError::store_invariant(format!(
                        "{} has no identifier after key assignment",
                        model.path
                    )));
                }
            }
        }

        self.store.commit(staged);
        self.settle(keys)?;

        Ok(report)
    }

    // Identifiers for every live entity; generated for new entities that have none.
    // Explicit keys are claimed first so generated ones stay clear of them.
    fn assign_keys(
        &self,
        staged: &mut Tables,
    ) -> Result<Vec<Option<Key>>, InternalError> {
        let mut keys = Vec::with_capacity(self.entities.len());
        let mut claimed: HashSet<(&'static str, Key)> = HashSet::new();

        for entity in &self.entities {
            let meta = self.registry.metadata(entity.record.model())?;
            let model = meta.model();
            let current = meta.key_of(&entity.record)?;

            match (entity.state, &current) {
                (EntityState::Managed, _) if current != entity.origin => {
                    return Err(InternalError::new(
                        ErrorClass::Conflict,
                        ErrorOrigin::Store,
                        format!(
                            "identifier of {} cannot change from {:?} to {:?}",
                            model.path, entity.origin, current
                        ),
                    ));
                }
                (EntityState::New, Some(key)) => {
                    if staged.get(model.entity_name, key).is_some()
                        || !claimed.insert((model.entity_name, key.clone()))
                    {
                        return Err(InternalError::new(
                            ErrorClass::Conflict,
                            ErrorOrigin::Store,
                            format!("{}[{key}] already exists", model.path),
                        ));
                    }
                    staged.reserve(model.entity_name, key);
                }
                _ => {}
            }
            keys.push(current);
        }

        for (entity, key) in self.entities.iter().zip(keys.iter_mut()) {
            if entity.state == EntityState::New && key.is_none() {
                let meta = self.registry.metadata(entity.record.model())?;
                *key = Some(staged.generate_key(&meta)?);
            }
        }

        Ok(keys)
    }

    fn to_row(
        &self,
        record: &AttachedRecord,
        key: &Key,
        keys: &[Option<Key>],
    ) -> Result<StoredRecord, InternalError> {
        let meta = self.registry.metadata(record.model())?;
        let mut row = StoredRecord::new(record.model());

        for (field, slot) in record.slots() {
            let slot = match slot {
                Slot::Scalar(value) => Slot::Scalar(value.clone()),
                Slot::One(target) => Slot::One(target.and_then(|target| self.row_ref(target, keys))),
                Slot::Many(members) => Slot::Many(members.as_ref().map(|members| {
                    Refs::from_items(
                        members.kind(),
                        members
                            .iter()
                            .filter_map(|&member| self.row_ref(member, keys)),
                    )
                })),
            };
            row.set(field, slot);
        }

        row.set_scalar(meta.primary_key().name, key.to_value());

        Ok(row)
    }

    fn row_ref(&self, handle: EntityHandle, keys: &[Option<Key>]) -> Option<RowRef> {
        let entity = self.entities.get(handle.index())?;
        if entity.state == EntityState::Removed {
            return None;
        }

        keys.get(handle.index())
            .cloned()
            .flatten()
            .map(|key| RowRef::new(entity.record.model().entity_name, key))
    }

    // Align tracked entities with what was just committed.
    fn settle(&mut self, keys: Vec<Option<Key>>) -> Result<(), InternalError> {
        for (index, (entity, key)) in self.entities.iter_mut().zip(keys).enumerate() {
            let model = entity.record.model();

            match entity.state {
                EntityState::Removed => {
                    if let Some(origin) = entity.origin.take() {
                        self.identity.remove(&(model.entity_name, origin));
                    }
                }
                EntityState::New | EntityState::Managed => {
                    let key = key.ok_or_else(|| {
                        InternalError::store_invariant(format!(
                            "{} has no identifier after flush",
                            model.path
                        ))
                    })?;
                    let pk = self.registry.metadata(model)?.primary_key().name;

                    entity.record.set_scalar(pk, key.to_value());
                    entity.state = EntityState::Managed;
                    entity.origin = Some(key.clone());
                    self.identity
                        .insert((model.entity_name, key), EntityHandle::new(index));
                }
            }
        }

        Ok(())
    }

    ///
    /// ATTACH
    ///

    fn track(
        &mut self,
        record: AttachedRecord,
        state: EntityState,
        origin: Option<Key>,
    ) -> EntityHandle {
        self.entities.push(ManagedEntity {
            record,
            state,
            origin,
        });

        EntityHandle::new(self.entities.len() - 1)
    }

    // Attach a stored row and, eagerly, everything it references.
    fn attach(
        &mut self,
        model: &'static EntityModel,
        key: &Key,
    ) -> Result<Option<EntityHandle>, InternalError> {
        if let Some(&handle) = self.identity.get(&(model.entity_name, key.clone())) {
            return Ok(Some(handle));
        }
        let Some(stored) = self.store.get(model, key).cloned() else {
            return Ok(None);
        };

        // placeholder first, so cyclic references resolve to this handle
        let handle = self.track(Record::new(model), EntityState::Managed, Some(key.clone()));
        self.identity.insert((model.entity_name, key.clone()), handle);

        let mut record = AttachedRecord::new(stored.model());
        for (field, slot) in stored.slots() {
            let slot = match slot {
                Slot::Scalar(value) => Slot::Scalar(value.clone()),
                Slot::One(None) => Slot::One(None),
                Slot::One(Some(row)) => Slot::One(self.attach_row(row)?),
                Slot::Many(None) => Slot::Many(None),
                Slot::Many(Some(rows)) => {
                    let mut members = Refs::new(rows.kind());
                    for row in rows.iter() {
                        if let Some(member) = self.attach_row(row)? {
                            members.push(member);
                        }
                    }
                    Slot::Many(Some(members))
                }
            };
            record.set(field, slot);
        }

        self.entities[handle.index()].record = record;
        debug!(entity = model.path, key = %key, handle = %handle, "row attached");

        Ok(Some(handle))
    }

    fn attach_row(&mut self, row: &RowRef) -> Result<Option<EntityHandle>, InternalError> {
        let model = self
            .registry
            .model(row.entity)
            .ok_or_else(|| InternalError::unknown_entity(row.entity))?;
        let handle = self.attach(model, &row.key)?;

        if handle.is_none() {
            debug!(row = %row, "dangling reference skipped");
        }

        Ok(handle)
    }
}

impl PersistenceGateway for UnitOfWork<'_> {
    fn find_by_id(
        &mut self,
        model: &'static EntityModel,
        key: &Key,
    ) -> Result<Option<EntityHandle>, InternalError> {
        self.registry.metadata(model)?;

        let handle = self.attach(model, key)?;
        Ok(handle.filter(|&handle| self.is_managed(handle)))
    }

    fn is_managed(&self, handle: EntityHandle) -> bool {
        self.state(handle)
            .is_some_and(|state| state != EntityState::Removed)
    }

    fn instantiate(&mut self, model: &'static EntityModel) -> Result<EntityHandle, InternalError> {
        self.registry.metadata(model)?;

        Ok(self.track(Record::new(model), EntityState::New, None))
    }

    fn remove(&mut self, handle: EntityHandle) -> Result<(), InternalError> {
        let entity = self
            .entities
            .get_mut(handle.index())
            .ok_or_else(|| InternalError::stale_handle(handle))?;
        entity.state = EntityState::Removed;

        Ok(())
    }

    fn entity(&self, handle: EntityHandle) -> Option<&AttachedRecord> {
        self.entities
            .get(handle.index())
            .map(|entity| &entity.record)
    }

    fn entity_mut(&mut self, handle: EntityHandle) -> Option<&mut AttachedRecord> {
        self.entities
            .get_mut(handle.index())
            .map(|entity| &mut entity.record)
    }
}
