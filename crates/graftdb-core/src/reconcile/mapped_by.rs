use crate::{
    entity::{CollectionKind, EntityHandle},
    error::{InternalError, ReconcileError},
    gateway::PersistenceGateway,
    metadata::{InverseLink, RelationMeta},
    reconcile::access_error,
};
use tracing::debug;

/// Mirror a relation change onto the inverse field of `to`.
///
/// Linking points the inverse at `from` (or adds `from` to the inverse
/// collection); clearing undoes it. A scalar inverse is only cleared while it
/// still points at `from`, so an entity that has already moved to another
/// owner keeps its new link. Pointing a scalar inverse away from a previous
/// owner also drops `to` from that owner's side of the relation, so the two
/// sides never disagree. Returns whether the target changed.
pub fn set_inverse<G: PersistenceGateway + ?Sized>(
    gateway: &mut G,
    from: EntityHandle,
    relation: &RelationMeta,
    to: EntityHandle,
    clear: bool,
) -> Result<bool, InternalError> {
    let record = gateway
        .entity_mut(to)
        .ok_or_else(|| InternalError::stale_handle(to))?;
    let entity = record.model().path;
    let mut displaced = None;

    let changed = match relation.inverse {
        InverseLink::None => return Ok(false),

        InverseLink::Scalar { field } => {
            let current = record
                .get_one(field)
                .map_err(|source| access_error(entity, field, source))?
                .copied();

            match (clear, current) {
                (false, current) if current != Some(from) => {
                    record.set_one(field, Some(from));
                    displaced = current;
                    true
                }
                (true, Some(current)) if current == from => {
                    record.set_one(field, None);
                    true
                }
                _ => false,
            }
        }

        InverseLink::Collection { field, container } => {
            let Some(kind) = CollectionKind::for_container(container) else {
                return Err(ReconcileError::UnsupportedCollectionType {
                    entity,
                    field,
                    container,
                }
                .into());
            };

            if clear {
                let members = record
                    .get_many(field)
                    .map_err(|source| access_error(entity, field, source))?;
                if members.is_some_and(|members| members.contains(&from)) {
                    record
                        .many_mut(field, kind)
                        .map_err(|source| access_error(entity, field, source))?
                        .remove(&from)
                } else {
                    false
                }
            } else {
                record
                    .many_mut(field, kind)
                    .map_err(|source| access_error(entity, field, source))?
                    .insert_unique(from)
            }
        }
    };

    if changed {
        debug!(
            entity,
            handle = %to,
            relation = relation.name(),
            owner = %from,
            clear,
            "INVERSE"
        );
    }

    if let Some(previous) = displaced {
        detach_from_owner(gateway, previous, relation, to)?;
    }

    Ok(changed)
}

// Remove `member` from the relation field of an owner it has moved away from.
fn detach_from_owner<G: PersistenceGateway + ?Sized>(
    gateway: &mut G,
    owner: EntityHandle,
    relation: &RelationMeta,
    member: EntityHandle,
) -> Result<(), InternalError> {
    let record = gateway
        .entity_mut(owner)
        .ok_or_else(|| InternalError::stale_handle(owner))?;
    let entity = record.model().path;
    let field = relation.name();

    let detached = if relation.cardinality().is_plural() {
        let listed = record
            .get_many(field)
            .map_err(|source| access_error(entity, field, source))?
            .is_some_and(|members| members.contains(&member));
        let Some(kind) = CollectionKind::for_container(relation.relation.container) else {
            return Err(ReconcileError::UnsupportedCollectionType {
                entity,
                field,
                container: relation.relation.container,
            }
            .into());
        };

        listed
            && record
                .many_mut(field, kind)
                .map_err(|source| access_error(entity, field, source))?
                .remove(&member)
    } else {
        let linked = record
            .get_one(field)
            .map_err(|source| access_error(entity, field, source))?
            .is_some_and(|&current| current == member);
        if linked {
            record.set_one(field, None);
        }
        linked
    };

    if detached {
        debug!(entity, handle = %owner, field, member = %member, "UNLINK");
    }

    Ok(())
}
