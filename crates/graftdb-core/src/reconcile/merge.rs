use crate::{
    config::ReconcileConfig,
    entity::{AttachedRecord, CollectionKind, DetachedGraph, DetachedRecord, EntityHandle, NodeId},
    error::{
        AuthorizationScope, ErrorClass, ErrorOrigin, InternalError, KeyLabel, ReconcileError,
    },
    gateway::{AuthorizationDenied, AuthorizeEntity, EntityRef, PersistenceGateway},
    key::Key,
    metadata::{EntityMetadata, RelationMeta},
    model::{entity::EntityModel, field::EntityFieldModel, relation::Cardinality},
    obs::sink::{self, MetricsEvent},
    operation::OperationType,
    reconcile::{
        ReconcileReport, ReconcileStats, UnlinkedMember, access_error, cascade, mapped_by,
        pairing::{self, EntityPair},
    },
    registry::EntityRegistry,
};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

///
/// MergeContext
///
/// State of one reconcile call. The history map records every detached node
/// already merged and the attached entity it resolved to; it is what makes
/// cycles and shared children terminate.
///

pub(crate) struct MergeContext<'a, G: ?Sized, A> {
    registry: &'a EntityRegistry,
    authorizer: &'a A,
    config: ReconcileConfig,
    graph: &'a DetachedGraph,
    gateway: &'a mut G,
    operation: OperationType,
    history: HashMap<NodeId, EntityHandle>,
    stats: ReconcileStats,
    unlinked: Vec<UnlinkedMember>,
}

impl<'a, G, A> MergeContext<'a, G, A>
where
    G: PersistenceGateway + ?Sized,
    A: AuthorizeEntity,
{
    pub(crate) fn new(
        registry: &'a EntityRegistry,
        authorizer: &'a A,
        config: ReconcileConfig,
        graph: &'a DetachedGraph,
        gateway: &'a mut G,
        operation: OperationType,
    ) -> Self {
        Self {
            registry,
            authorizer,
            config,
            graph,
            gateway,
            operation,
            history: HashMap::new(),
            stats: ReconcileStats::default(),
            unlinked: Vec::new(),
        }
    }

    pub(crate) const fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    pub(crate) fn into_report(self, root: EntityHandle) -> ReconcileReport {
        ReconcileReport {
            root,
            stats: self.stats,
            unlinked: self.unlinked,
        }
    }

    ///
    /// ROOT
    ///

    /// Resolve `node` and merge everything reachable from it.
    pub(crate) fn merge_root(&mut self, node: NodeId) -> Result<EntityHandle, InternalError> {
        let handle = self.resolve_root(node)?;
        self.deep_merge(node, handle, self.config.merge)?;

        Ok(handle)
    }

    // A root with an identifier must exist; a root without one is created
    // for SAVE-family calls and rejected otherwise.
    fn resolve_root(&mut self, node: NodeId) -> Result<EntityHandle, InternalError> {
        if let Some(&handle) = self.history.get(&node) {
            return Ok(handle);
        }

        let record = self.detached(node)?;
        let model = record.model();
        match self.metadata(model)?.key_of(record)? {
            Some(key) => self
                .find(model, &key)?
                .ok_or_else(|| not_found(model, Some(key))),
            None if self.operation.is_save() => self.create(model),
            None => Err(not_found(model, None)),
        }
    }

    ///
    /// DEEP MERGE
    ///

    fn deep_merge(
        &mut self,
        node: NodeId,
        handle: EntityHandle,
        merge: bool,
    ) -> Result<(), InternalError> {
        if self.history.contains_key(&node) {
            return Ok(());
        }
        self.history.insert(node, handle);

        let detached = self.detached(node)?;
        let meta = self.metadata(detached.model())?;
        self.authorize(&meta, handle)?;

        self.stats.merged += 1;
        sink::record(MetricsEvent::NodeMerged {
            entity_path: meta.model().path,
        });

        if merge && self.operation.is_save() {
            self.merge_scalars(&meta, detached, handle)?;
        }

        for cardinality in Cardinality::MERGE_ORDER {
            for relation in meta.relations(cardinality) {
                let eligible = cascade::cascades(self.operation, relation.relation.cascade, merge);

                if cardinality.is_plural() {
                    self.merge_collection(node, detached, handle, relation, eligible)?;
                } else {
                    self.merge_singular(node, detached, handle, relation, eligible)?;
                }
            }
        }

        Ok(())
    }

    fn merge_scalars(
        &mut self,
        meta: &EntityMetadata,
        detached: &DetachedRecord,
        handle: EntityHandle,
    ) -> Result<(), InternalError> {
        let entity = meta.model().path;

        if let Some(key) = meta.key_of(detached)? {
            let pk = meta.primary_key().name;
            self.attached_mut(handle)?.set_scalar(pk, key.to_value());
        }

        let dirty = detached
            .dirty_fields()
            .filter(|_| self.config.respect_dirty_tracking);

        for &field in meta.mergeable_fields() {
            if dirty.is_some_and(|dirty| !dirty.contains(field.name)) {
                continue;
            }

            let value = detached
                .get_scalar(field.name)
                .map_err(|source| meta.access_error(field.name, source))?
                .clone();
            self.authorize_field(meta, handle, field)?;

            let attached = self.attached_mut(handle)?;
            let previous = attached
                .get_scalar(field.name)
                .map_err(|source| meta.access_error(field.name, source))?;
            if *previous != value {
                debug!(
                    entity,
                    handle = %handle,
                    field = field.name,
                    old = %previous,
                    new = %value,
                    "MERGE"
                );
                attached.set_scalar(field.name, value);
            }
        }

        Ok(())
    }

    ///
    /// SINGULAR RELATIONS
    ///

    fn merge_singular(
        &mut self,
        owner: NodeId,
        detached: &DetachedRecord,
        handle: EntityHandle,
        relation: &RelationMeta,
        eligible: bool,
    ) -> Result<(), InternalError> {
        let field = relation.name();
        let detached_child = detached
            .get_one(field)
            .map_err(|source| access_error(detached.model().path, field, source))?
            .copied();
        let mut attached_child = {
            let record = self.attached(handle)?;
            record
                .get_one(field)
                .map_err(|source| access_error(record.model().path, field, source))?
                .copied()
        };

        if let Some(child) = detached_child {
            self.check_target(relation, child)?;
        }

        if let (Some(child), Some(current)) = (detached_child, attached_child)
            && self.is_retarget(child, current)?
        {
            self.unlink_singular(handle, relation, current)?;
            attached_child = None;
        }

        // an unset attached link still finds an existing row before anything is created
        if attached_child.is_none()
            && let Some(child) = detached_child
        {
            attached_child = self.resolve_existing(child)?;
        }

        match (detached_child, attached_child) {
            (None, None) => {}

            (Some(child), None) => {
                if !eligible {
                    self.note_unlinked(owner, field, child);
                    return Ok(());
                }

                match self.resolve_for_link(child)? {
                    Some(target) => {
                        self.link_singular(handle, relation, target)?;
                        self.deep_merge(child, target, eligible)?;
                    }
                    None => self.note_unlinked(owner, field, child),
                }
            }

            (None, Some(current)) => {
                if eligible {
                    self.unlink_singular(handle, relation, current)?;
                    self.remove_orphan(current)?;
                }
            }

            (Some(child), Some(current)) => {
                self.link_singular(handle, relation, current)?;
                self.deep_merge(child, current, eligible)?;
            }
        }

        Ok(())
    }

    // The detached child names a different row than the one currently linked.
    fn is_retarget(&self, child: NodeId, current: EntityHandle) -> Result<bool, InternalError> {
        if let Some(&resolved) = self.history.get(&child) {
            return Ok(resolved != current);
        }

        match (self.detached_key(child)?, self.attached_key(current)?) {
            (Some(wanted), Some(linked)) => Ok(wanted != linked),
            _ => Ok(false),
        }
    }

    fn link_singular(
        &mut self,
        handle: EntityHandle,
        relation: &RelationMeta,
        target: EntityHandle,
    ) -> Result<(), InternalError> {
        let field = relation.name();
        let (entity, changed) = {
            let record = self.attached_mut(handle)?;
            let entity = record.model().path;
            let current = record
                .get_one(field)
                .map_err(|source| access_error(entity, field, source))?
                .copied();
            let changed = current != Some(target);
            if changed {
                record.set_one(field, Some(target));
            }

            (entity, changed)
        };

        if changed {
            self.note_link(entity, handle, field, target, true);
        }
        mapped_by::set_inverse(&mut *self.gateway, handle, relation, target, false)?;

        Ok(())
    }

    fn unlink_singular(
        &mut self,
        handle: EntityHandle,
        relation: &RelationMeta,
        target: EntityHandle,
    ) -> Result<(), InternalError> {
        let field = relation.name();
        let entity = {
            let record = self.attached_mut(handle)?;
            record.set_one(field, None);
            record.model().path
        };

        self.note_link(entity, handle, field, target, false);
        mapped_by::set_inverse(&mut *self.gateway, handle, relation, target, true)?;

        Ok(())
    }

    ///
    /// COLLECTION RELATIONS
    ///

    fn merge_collection(
        &mut self,
        owner: NodeId,
        detached: &DetachedRecord,
        handle: EntityHandle,
        relation: &RelationMeta,
        eligible: bool,
    ) -> Result<(), InternalError> {
        let field = relation.name();
        let detached_members = detached
            .get_many(field)
            .map_err(|source| access_error(detached.model().path, field, source))?;
        let attached_members = {
            let record = self.attached(handle)?;
            record
                .get_many(field)
                .map_err(|source| access_error(record.model().path, field, source))?
                .cloned()
        };

        if detached_members.is_none() && attached_members.is_none() {
            return Ok(());
        }
        self.collection_kind(detached.model(), relation)?;

        let detached_keyed = detached_members
            .map(|members| self.keyed_nodes(relation, members))
            .transpose()?;
        let attached_keyed = attached_members
            .as_ref()
            .map(|members| self.keyed_handles(members))
            .transpose()?;

        let pairs = pairing::pair_members(detached_keyed.as_deref(), attached_keyed.as_deref());
        for EntityPair { detached: child, attached: member } in pairs {
            match (child, member) {
                (Some(child), None) => {
                    let resolved = if eligible {
                        self.resolve_for_link(child)?
                    } else {
                        self.resolve_existing(child)?
                    };

                    match resolved {
                        Some(member) => {
                            self.add_member(handle, relation, member)?;
                            self.deep_merge(child, member, eligible)?;
                        }
                        None => self.note_unlinked(owner, field, child),
                    }
                }

                // an absent detached collection is "not sent", never "emptied"
                (None, Some(member)) => {
                    if eligible && detached_members.is_some() {
                        self.remove_member(handle, relation, member)?;
                        self.remove_orphan(member)?;
                    }
                }

                (Some(child), Some(member)) => self.deep_merge(child, member, eligible)?,

                (None, None) => {}
            }
        }

        Ok(())
    }

    fn keyed_nodes(
        &self,
        relation: &RelationMeta,
        members: &[NodeId],
    ) -> Result<Vec<(NodeId, Option<Key>)>, InternalError> {
        members
            .iter()
            .map(|&node| {
                self.check_target(relation, node)?;
                Ok((node, self.detached_key(node)?))
            })
            .collect()
    }

    fn keyed_handles(
        &self,
        members: &[EntityHandle],
    ) -> Result<Vec<(EntityHandle, Option<Key>)>, InternalError> {
        members
            .iter()
            .map(|&handle| Ok((handle, self.attached_key(handle)?)))
            .collect()
    }

    fn collection_kind(
        &self,
        owner: &'static EntityModel,
        relation: &RelationMeta,
    ) -> Result<CollectionKind, InternalError> {
        let container = relation.relation.container;

        CollectionKind::for_container(container).ok_or_else(|| {
            ReconcileError::UnsupportedCollectionType {
                entity: owner.path,
                field: relation.name(),
                container,
            }
            .into()
        })
    }

    fn add_member(
        &mut self,
        handle: EntityHandle,
        relation: &RelationMeta,
        member: EntityHandle,
    ) -> Result<(), InternalError> {
        let field = relation.name();
        let owner = self.attached(handle)?.model();
        let kind = self.collection_kind(owner, relation)?;

        let added = self
            .attached_mut(handle)?
            .many_mut(field, kind)
            .map_err(|source| access_error(owner.path, field, source))?
            .insert_unique(member);

        if added {
            self.note_link(owner.path, handle, field, member, true);
        }
        mapped_by::set_inverse(&mut *self.gateway, handle, relation, member, false)?;

        Ok(())
    }

    fn remove_member(
        &mut self,
        handle: EntityHandle,
        relation: &RelationMeta,
        member: EntityHandle,
    ) -> Result<(), InternalError> {
        let field = relation.name();
        let owner = self.attached(handle)?.model();
        let kind = self.collection_kind(owner, relation)?;

        let removed = self
            .attached_mut(handle)?
            .many_mut(field, kind)
            .map_err(|source| access_error(owner.path, field, source))?
            .remove(&member);

        if removed {
            self.note_link(owner.path, handle, field, member, false);
        }
        mapped_by::set_inverse(&mut *self.gateway, handle, relation, member, true)?;

        Ok(())
    }

    ///
    /// RESOLUTION
    ///

    /// Existing counterpart of a detached node; never creates anything.
    fn resolve_existing(&mut self, node: NodeId) -> Result<Option<EntityHandle>, InternalError> {
        if let Some(&handle) = self.history.get(&node) {
            return Ok(Some(handle));
        }

        let record = self.detached(node)?;
        let model = record.model();
        match self.metadata(model)?.key_of(record)? {
            Some(key) => self.find(model, &key),
            None => Ok(None),
        }
    }

    /// Counterpart for a cascade-eligible link.
    ///
    /// Nodes without an identifier are instantiated under SAVE-family
    /// operations. An identifier that matches no row is an error when saving
    /// and leaves the member unlinked otherwise.
    fn resolve_for_link(&mut self, node: NodeId) -> Result<Option<EntityHandle>, InternalError> {
        if let Some(&handle) = self.history.get(&node) {
            return Ok(Some(handle));
        }

        let record = self.detached(node)?;
        let model = record.model();
        match self.metadata(model)?.key_of(record)? {
            None if self.operation.is_save() => self.create(model).map(Some),
            None => Ok(None),
            Some(key) => match self.find(model, &key)? {
                Some(handle) => Ok(Some(handle)),
                None if self.operation.is_save() => Err(not_found(model, Some(key))),
                None => Ok(None),
            },
        }
    }

    fn find(
        &mut self,
        model: &'static EntityModel,
        key: &Key,
    ) -> Result<Option<EntityHandle>, InternalError> {
        let found = self.gateway.find_by_id(model, key)?;

        match found {
            Some(handle) => {
                debug!(entity = model.path, key = %key, handle = %handle, "LOAD");
                self.stats.loaded += 1;
                sink::record(MetricsEvent::EntityLoaded {
                    entity_path: model.path,
                });
            }
            None => debug!(entity = model.path, key = %key, "entity not found"),
        }

        Ok(found)
    }

    fn create(&mut self, model: &'static EntityModel) -> Result<EntityHandle, InternalError> {
        let handle = self.gateway.instantiate(model)?;

        debug!(entity = model.path, handle = %handle, "CREATE");
        self.stats.created += 1;
        sink::record(MetricsEvent::EntityCreated {
            entity_path: model.path,
        });

        Ok(handle)
    }

    fn remove_orphan(&mut self, handle: EntityHandle) -> Result<(), InternalError> {
        if !self.gateway.is_managed(handle) {
            return Ok(());
        }

        let entity = self.attached(handle)?.model().path;
        self.gateway.remove(handle)?;

        debug!(entity, handle = %handle, "DELETE");
        self.stats.removed += 1;
        sink::record(MetricsEvent::OrphanRemoved {
            entity_path: entity,
        });

        Ok(())
    }

    ///
    /// AUTHORIZATION
    ///

    fn authorize(&self, meta: &EntityMetadata, handle: EntityHandle) -> Result<(), InternalError> {
        let record = self.attached(handle)?;

        self.authorizer
            .authorize(EntityRef { handle, record }, self.operation)
            .map_err(|denied| {
                denial(
                    meta,
                    record,
                    AuthorizationScope::Entity(self.operation),
                    denied,
                )
            })
    }

    fn authorize_field(
        &self,
        meta: &EntityMetadata,
        handle: EntityHandle,
        field: &'static EntityFieldModel,
    ) -> Result<(), InternalError> {
        let record = self.attached(handle)?;

        self.authorizer
            .authorize_field(EntityRef { handle, record }, field)
            .map_err(|denied| denial(meta, record, AuthorizationScope::Field(field.name), denied))
    }

    ///
    /// BOOKKEEPING
    ///

    fn note_link(
        &mut self,
        entity: &'static str,
        owner: EntityHandle,
        field: &'static str,
        target: EntityHandle,
        added: bool,
    ) {
        if added {
            debug!(entity, handle = %owner, field, target = %target, "LINK");
            self.stats.links_added += 1;
            sink::record(MetricsEvent::LinkAdded {
                entity_path: entity,
            });
        } else {
            debug!(entity, handle = %owner, field, target = %target, "UNLINK");
            self.stats.links_removed += 1;
            sink::record(MetricsEvent::LinkRemoved {
                entity_path: entity,
            });
        }
    }

    fn note_unlinked(&mut self, owner: NodeId, field: &'static str, member: NodeId) {
        debug!(owner = %owner, field, member = %member, "detached member left unlinked");
        self.unlinked.push(UnlinkedMember {
            owner,
            field,
            member,
        });
    }

    ///
    /// ACCESS
    ///

    fn metadata(&self, model: &'static EntityModel) -> Result<Arc<EntityMetadata>, InternalError> {
        self.registry.metadata(model)
    }

    fn detached(&self, node: NodeId) -> Result<&'a DetachedRecord, InternalError> {
        let graph = self.graph;

        graph.get(node).ok_or_else(|| {
            InternalError::new(
                ErrorClass::InvariantViolation,
                ErrorOrigin::Reconcile,
                format!("detached node {node} does not exist"),
            )
        })
    }

    fn attached(&self, handle: EntityHandle) -> Result<&AttachedRecord, InternalError> {
        self.gateway
            .entity(handle)
            .ok_or_else(|| InternalError::stale_handle(handle))
    }

    fn attached_mut(&mut self, handle: EntityHandle) -> Result<&mut AttachedRecord, InternalError> {
        self.gateway
            .entity_mut(handle)
            .ok_or_else(|| InternalError::stale_handle(handle))
    }

    fn detached_key(&self, node: NodeId) -> Result<Option<Key>, InternalError> {
        let record = self.detached(node)?;

        self.metadata(record.model())?.key_of(record)
    }

    fn attached_key(&self, handle: EntityHandle) -> Result<Option<Key>, InternalError> {
        let record = self.attached(handle)?;

        self.metadata(record.model())?.key_of(record)
    }

    fn check_target(&self, relation: &RelationMeta, node: NodeId) -> Result<(), InternalError> {
        let model = self.detached(node)?.model();
        if model.is_a(relation.target.entity_name) {
            return Ok(());
        }

        Err(InternalError::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Reconcile,
            format!(
                "detached node {node} ({}) cannot be linked through '{}': expected {}",
                model.path,
                relation.name(),
                relation.target.path
            ),
        ))
    }
}

fn not_found(model: &'static EntityModel, key: Option<Key>) -> InternalError {
    ReconcileError::NotFound {
        entity: model.path,
        key: KeyLabel(key),
    }
    .into()
}

fn denial(
    meta: &EntityMetadata,
    record: &AttachedRecord,
    scope: AuthorizationScope,
    denied: AuthorizationDenied,
) -> InternalError {
    let entity = meta.model().path;
    debug!(entity, scope = %scope, reason = %denied, "authorization denied");
    sink::record(MetricsEvent::AuthorizationDenied {
        entity_path: entity,
    });

    ReconcileError::Unauthorized {
        entity,
        key: KeyLabel(meta.key_of(record).ok().flatten()),
        scope,
        reason: denied.reason,
    }
    .into()
}
