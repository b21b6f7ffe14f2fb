//! Collaborator seams of the reconciler.
//!
//! The reconciler never owns persistence: it asks a `PersistenceGateway` to
//! find, create and remove entities, and an `AuthorizeEntity` hook to vet
//! every entity and merged field it touches.

use crate::{
    entity::{AttachedRecord, EntityHandle},
    error::InternalError,
    key::Key,
    model::{entity::EntityModel, field::EntityFieldModel},
    operation::OperationType,
};
use thiserror::Error as ThisError;

///
/// PersistenceGateway
///
/// Unit-of-work view used by the reconciler.
/// Handles are only meaningful to the gateway that issued them.
///

pub trait PersistenceGateway {
    /// Look an entity up by identifier, attaching it if needed.
    fn find_by_id(
        &mut self,
        model: &'static EntityModel,
        key: &Key,
    ) -> Result<Option<EntityHandle>, InternalError>;

    /// Whether the handle refers to a live (not removed) entity.
    fn is_managed(&self, handle: EntityHandle) -> bool;

    /// Create a fresh, empty attached instance.
    fn instantiate(&mut self, model: &'static EntityModel) -> Result<EntityHandle, InternalError>;

    /// Schedule an attached entity for removal.
    fn remove(&mut self, handle: EntityHandle) -> Result<(), InternalError>;

    fn entity(&self, handle: EntityHandle) -> Option<&AttachedRecord>;

    fn entity_mut(&mut self, handle: EntityHandle) -> Option<&mut AttachedRecord>;
}

///
/// EntityRef
/// Attached entity presented to authorization hooks.
///

#[derive(Clone, Copy, Debug)]
pub struct EntityRef<'a> {
    pub handle: EntityHandle,
    pub record: &'a AttachedRecord,
}

impl EntityRef<'_> {
    #[must_use]
    pub const fn model(&self) -> &'static EntityModel {
        self.record.model()
    }
}

///
/// AuthorizationDenied
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{reason}")]
pub struct AuthorizationDenied {
    pub reason: String,
}

impl AuthorizationDenied {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

///
/// AuthorizeEntity
///
/// Authorization hook consulted once per merged entity and once per merged scalar field.
///

pub trait AuthorizeEntity {
    fn authorize(
        &self,
        entity: EntityRef<'_>,
        operation: OperationType,
    ) -> Result<(), AuthorizationDenied>;

    fn authorize_field(
        &self,
        entity: EntityRef<'_>,
        field: &'static EntityFieldModel,
    ) -> Result<(), AuthorizationDenied>;
}

///
/// PermitAll
/// Authorization hook that accepts everything.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct PermitAll;

impl AuthorizeEntity for PermitAll {
    fn authorize(&self, _: EntityRef<'_>, _: OperationType) -> Result<(), AuthorizationDenied> {
        Ok(())
    }

    fn authorize_field(
        &self,
        _: EntityRef<'_>,
        _: &'static EntityFieldModel,
    ) -> Result<(), AuthorizationDenied> {
        Ok(())
    }
}

impl<A: AuthorizeEntity + ?Sized> AuthorizeEntity for &A {
    fn authorize(
        &self,
        entity: EntityRef<'_>,
        operation: OperationType,
    ) -> Result<(), AuthorizationDenied> {
        (**self).authorize(entity, operation)
    }

    fn authorize_field(
        &self,
        entity: EntityRef<'_>,
        field: &'static EntityFieldModel,
    ) -> Result<(), AuthorizationDenied> {
        (**self).authorize_field(entity, field)
    }
}
