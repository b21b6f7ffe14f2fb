//! Deep merge of a detached entity graph into attached state.
//!
//! The reconciler walks a `DetachedGraph` from a root node, resolves every
//! node to an attached entity through the `PersistenceGateway`, copies scalar
//! state, and brings relations into line. Children are only merged, created or
//! removed where the relation's cascade admits the operation; everything else
//! is linked to existing rows or reported as unlinked.

pub mod cascade;
pub mod mapped_by;
pub mod pairing;

mod merge;


use crate::{
    config::ReconcileConfig,
    entity::{DetachedGraph, DetachedRecord, EntityHandle, NodeId},
    error::{
        AccessFault, AuthorizationScope, ErrorClass, ErrorOrigin, InternalError, KeyLabel,
        ReconcileError,
    },
    gateway::{AuthorizeEntity, EntityRef, PermitAll, PersistenceGateway},
    key::Key,
    model::entity::EntityModel,
    obs::sink::{self, MetricsEvent, Span},
    operation::OperationType,
    registry::EntityRegistry,
};
use merge::MergeContext;
use tracing::{debug, debug_span};

///
/// ReconcileStats
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReconcileStats {
    /// Detached nodes merged (each node at most once per call).
    pub merged: u64,
    pub loaded: u64,
    pub created: u64,
    pub links_added: u64,
    pub links_removed: u64,
    /// Orphaned entities scheduled for removal.
    pub removed: u64,
}

///
/// UnlinkedMember
///
/// Detached relation member that was left without an attached counterpart,
/// because the relation does not cascade or its identifier matched nothing.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnlinkedMember {
    pub owner: NodeId,
    pub field: &'static str,
    pub member: NodeId,
}

///
/// ReconcileReport
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReconcileReport {
    pub root: EntityHandle,
    pub stats: ReconcileStats,
    pub unlinked: Vec<UnlinkedMember>,
}

///
/// Reconciler
///
/// Stateless entry point; every call builds its own merge context, so one
/// reconciler may be shared across threads as long as each call gets its own
/// gateway.
///

#[derive(Clone, Copy)]
pub struct Reconciler<'r, A = PermitAll> {
    registry: &'r EntityRegistry,
    authorizer: A,
    config: ReconcileConfig,
}

impl<'r> Reconciler<'r> {
    #[must_use]
    pub fn new(registry: &'r EntityRegistry) -> Self {
        Self {
            registry,
            authorizer: PermitAll,
            config: ReconcileConfig::default(),
        }
    }
}

impl<'r, A: AuthorizeEntity> Reconciler<'r, A> {
    #[must_use]
    pub fn with_authorizer<B: AuthorizeEntity>(self, authorizer: B) -> Reconciler<'r, B> {
        Reconciler {
            registry: self.registry,
            authorizer,
            config: self.config,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &'r EntityRegistry {
        self.registry
    }

    /// Merge the graph reachable from `root` and return its attached counterpart.
    pub fn reconcile<G: PersistenceGateway + ?Sized>(
        &self,
        graph: &DetachedGraph,
        root: NodeId,
        operation: OperationType,
        gateway: &mut G,
    ) -> Result<EntityHandle, InternalError> {
        self.reconcile_with_report(graph, root, operation, gateway)
            .map(|report| report.root)
    }

    /// [`Self::reconcile`], also returning what the call did.
    pub fn reconcile_with_report<G: PersistenceGateway + ?Sized>(
        &self,
        graph: &DetachedGraph,
        root: NodeId,
        operation: OperationType,
        gateway: &mut G,
    ) -> Result<ReconcileReport, InternalError> {
        let model = root_model(graph, root)?;
        let _enter = debug_span!("reconcile", entity = model.path, %operation).entered();
        let mut span = Span::new(operation, model.path);

        let mut ctx = MergeContext::new(
            self.registry,
            &self.authorizer,
            self.config,
            graph,
            gateway,
            operation,
        );
        let handle = ctx.merge_root(root)?;

        let stats = ctx.stats();
        span.succeed(stats.merged, stats.removed);
        debug!(root = %handle, merged = stats.merged, removed = stats.removed, "reconciled");

        Ok(ctx.into_report(handle))
    }

    pub fn save<G: PersistenceGateway + ?Sized>(
        &self,
        graph: &DetachedGraph,
        root: NodeId,
        gateway: &mut G,
    ) -> Result<EntityHandle, InternalError> {
        self.reconcile(graph, root, OperationType::Save, gateway)
    }

    /// Save several roots of one graph in order.
    ///
    /// The roots share a merge history, so a node reachable from more than
    /// one root is merged once and resolves to the same entity.
    pub fn save_all<G: PersistenceGateway + ?Sized>(
        &self,
        graph: &DetachedGraph,
        roots: &[NodeId],
        gateway: &mut G,
    ) -> Result<Vec<EntityHandle>, InternalError> {
        let operation = OperationType::Save;
        let _enter = debug_span!("reconcile_all", roots = roots.len(), %operation).entered();

        let mut ctx = MergeContext::new(
            self.registry,
            &self.authorizer,
            self.config,
            graph,
            gateway,
            operation,
        );

        let mut handles = Vec::with_capacity(roots.len());
        for &root in roots {
            let mut span = Span::new(operation, root_model(graph, root)?.path);
            let before = *ctx.stats();
            let handle = ctx.merge_root(root)?;

            let after = ctx.stats();
            span.succeed(after.merged - before.merged, after.removed - before.removed);
            handles.push(handle);
        }

        Ok(handles)
    }

    /// Reconcile under DELETE, then remove the root itself.
    ///
    /// A root without an identifier has never been stored, so there is
    /// nothing to delete and `None` is returned.
    pub fn delete<G: PersistenceGateway + ?Sized>(
        &self,
        graph: &DetachedGraph,
        root: NodeId,
        gateway: &mut G,
    ) -> Result<Option<EntityHandle>, InternalError> {
        let record = root_record(graph, root)?;
        let model = record.model();
        if self.registry.metadata(model)?.key_of(record)?.is_none() {
            debug!(entity = model.path, node = %root, "delete skipped: entity is new");
            return Ok(None);
        }

        let handle = self.reconcile(graph, root, OperationType::Delete, gateway)?;
        remove_root(gateway, handle)?;

        Ok(Some(handle))
    }

    /// [`Self::delete`] for several roots of one graph, in order.
    pub fn delete_all<G: PersistenceGateway + ?Sized>(
        &self,
        graph: &DetachedGraph,
        roots: &[NodeId],
        gateway: &mut G,
    ) -> Result<Vec<Option<EntityHandle>>, InternalError> {
        roots
            .iter()
            .map(|&root| self.delete(graph, root, gateway))
            .collect()
    }

    /// Remove the entity stored under `key`, if any, without reconciling
    /// its relations.
    pub fn delete_by_id<G: PersistenceGateway + ?Sized>(
        &self,
        model: &'static EntityModel,
        key: &Key,
        gateway: &mut G,
    ) -> Result<Option<EntityHandle>, InternalError> {
        let operation = OperationType::Delete;
        self.registry.metadata(model)?;
        let mut span = Span::new(operation, model.path);

        let Some(handle) = gateway.find_by_id(model, key)? else {
            debug!(entity = model.path, key = %key, "entity not found");
            span.succeed(0, 0);
            return Ok(None);
        };
        self.authorize_found(model, key, handle, operation, gateway)?;
        remove_root(gateway, handle)?;
        span.succeed(0, 1);

        Ok(Some(handle))
    }

    /// Look up one entity by identifier and authorize it for RETRIEVE.
    pub fn load<G: PersistenceGateway + ?Sized>(
        &self,
        model: &'static EntityModel,
        key: &Key,
        gateway: &mut G,
    ) -> Result<EntityHandle, InternalError> {
        let operation = OperationType::Retrieve;
        self.registry.metadata(model)?;
        let mut span = Span::new(operation, model.path);

        let handle = gateway
            .find_by_id(model, key)?
            .ok_or_else(|| ReconcileError::NotFound {
                entity: model.path,
                key: KeyLabel(Some(key.clone())),
            })?;
        self.authorize_found(model, key, handle, operation, gateway)?;

        sink::record(MetricsEvent::EntityLoaded {
            entity_path: model.path,
        });
        span.succeed(0, 0);

        Ok(handle)
    }

    fn authorize_found<G: PersistenceGateway + ?Sized>(
        &self,
        model: &'static EntityModel,
        key: &Key,
        handle: EntityHandle,
        operation: OperationType,
        gateway: &G,
    ) -> Result<(), InternalError> {
        let record = gateway
            .entity(handle)
            .ok_or_else(|| InternalError::stale_handle(handle))?;

        if let Err(denied) = self
            .authorizer
            .authorize(EntityRef { handle, record }, operation)
        {
            sink::record(MetricsEvent::AuthorizationDenied {
                entity_path: model.path,
            });

            return Err(ReconcileError::Unauthorized {
                entity: model.path,
                key: KeyLabel(Some(key.clone())),
                scope: AuthorizationScope::Entity(operation),
                reason: denied.reason,
            }
            .into());
        }

        Ok(())
    }
}

fn remove_root<G: PersistenceGateway + ?Sized>(
    gateway: &mut G,
    handle: EntityHandle,
) -> Result<(), InternalError> {
    if gateway.is_managed(handle) {
        let entity = gateway
            .entity(handle)
            .map_or("?", |record| record.model().path);
        gateway.remove(handle)?;
        debug!(entity, handle = %handle, "DELETE");
    }

    Ok(())
}

fn root_model(graph: &DetachedGraph, root: NodeId) -> Result<&'static EntityModel, InternalError> {
    root_record(graph, root).map(DetachedRecord::model)
}

fn root_record(graph: &DetachedGraph, root: NodeId) -> Result<&DetachedRecord, InternalError> {
    graph.get(root).ok_or_else(|| {
        InternalError::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Reconcile,
            format!("detached node {root} does not exist"),
        )
    })
}

/// Field access failure on `entity.field`.
pub(crate) fn access_error(
    entity: &'static str,
    field: &'static str,
    source: AccessFault,
) -> InternalError {
    ReconcileError::Access {
        entity,
        field,
        source,
    }
    .into()
}
