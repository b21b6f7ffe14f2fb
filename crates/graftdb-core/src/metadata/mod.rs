//! Resolved entity metadata.
//!
//! Metadata is derived once per entity model: fields are flattened across
//! the supertype chain, relations are classified by cardinality, and each
//! relation's inverse link is resolved up front so the reconciler never
//! scans fields while merging.

mod cache;


pub(crate) use cache::MetadataCache;

use crate::{
    entity::Record,
    error::{AccessFault, InternalError, ReconcileError},
    key::Key,
    model::{
        entity::EntityModel,
        field::{Container, EntityFieldKind, EntityFieldModel},
        relation::{Cardinality, RelationModel},
    },
};

///
/// InverseLink
///
/// Field on the related entity that mirrors a relation.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InverseLink {
    None,
    Scalar {
        field: &'static str,
    },
    Collection {
        field: &'static str,
        container: Container,
    },
}

///
/// RelationMeta
///

#[derive(Clone, Copy, Debug)]
pub struct RelationMeta {
    pub field: &'static EntityFieldModel,
    pub relation: &'static RelationModel,
    pub target: &'static EntityModel,
    pub inverse: InverseLink,
}

impl RelationMeta {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.field.name
    }

    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.relation.cardinality
    }
}

///
/// EntityMetadata
///
/// Flattened, classified view of one entity model.
///

#[derive(Debug)]
pub struct EntityMetadata {
    model: &'static EntityModel,
    primary_key: &'static EntityFieldModel,
    fields: Vec<&'static EntityFieldModel>,
    one_to_many: Vec<RelationMeta>,
    many_to_many: Vec<RelationMeta>,
    one_to_one: Vec<RelationMeta>,
    many_to_one: Vec<RelationMeta>,
    mergeable: Vec<&'static EntityFieldModel>,
}

impl EntityMetadata {
    /// Resolve metadata for `model`, looking related models up through `resolve`.
    pub(crate) fn build(
        model: &'static EntityModel,
        resolve: impl Fn(&str) -> Option<&'static EntityModel>,
    ) -> Result<Self, InternalError> {
        let fields = flatten_fields(model);
        let primary_key = identifier_field(model, &fields)?;

        let mut meta = Self {
            model,
            primary_key,
            fields: Vec::with_capacity(fields.len()),
            one_to_many: Vec::new(),
            many_to_many: Vec::new(),
            one_to_one: Vec::new(),
            many_to_one: Vec::new(),
            mergeable: Vec::new(),
        };

        for field in fields {
            match &field.kind {
                EntityFieldKind::Relation(relation) => {
                    check_container(model, field, relation)?;
                    let target = resolve(relation.target).ok_or_else(|| {
                        InternalError::metadata_invariant(format!(
                            "relation {}.{} targets unknown entity '{}'",
                            model.path, field.name, relation.target
                        ))
                    })?;
                    let inverse = resolve_inverse(model, field, relation, target)?;
                    let relation_meta = RelationMeta {
                        field,
                        relation,
                        target,
                        inverse,
                    };

                    match relation.cardinality {
                        Cardinality::OneToMany => meta.one_to_many.push(relation_meta),
                        Cardinality::ManyToMany => meta.many_to_many.push(relation_meta),
                        Cardinality::OneToOne => meta.one_to_one.push(relation_meta),
                        Cardinality::ManyToOne => meta.many_to_one.push(relation_meta),
                    }
                }
                EntityFieldKind::Scalar(_) if field.name != primary_key.name => {
                    meta.mergeable.push(field);
                }
                EntityFieldKind::Scalar(_) | EntityFieldKind::Transient => {}
            }
            meta.fields.push(field);
        }

        Ok(meta)
    }

    #[must_use]
    pub const fn model(&self) -> &'static EntityModel {
        self.model
    }

    #[must_use]
    pub const fn primary_key(&self) -> &'static EntityFieldModel {
        self.primary_key
    }

    /// All fields, supertype declarations first.
    #[must_use]
    pub fn fields(&self) -> &[&'static EntityFieldModel] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static EntityFieldModel> {
        self.fields.iter().copied().find(|field| field.name == name)
    }

    /// Relations of one cardinality, in declaration order.
    #[must_use]
    pub fn relations(&self, cardinality: Cardinality) -> &[RelationMeta] {
        match cardinality {
            Cardinality::OneToMany => &self.one_to_many,
            Cardinality::ManyToMany => &self.many_to_many,
            Cardinality::OneToOne => &self.one_to_one,
            Cardinality::ManyToOne => &self.many_to_one,
        }
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationMeta> {
        Cardinality::MERGE_ORDER
            .into_iter()
            .flat_map(|cardinality| self.relations(cardinality))
            .find(|relation| relation.name() == name)
    }

    /// Non-relational, non-identifier fields copied during a merge.
    #[must_use]
    pub fn mergeable_fields(&self) -> &[&'static EntityFieldModel] {
        &self.mergeable
    }

    /// Identifier of a record of this entity; `None` when unassigned.
    pub fn key_of<R>(&self, record: &Record<R>) -> Result<Option<Key>, InternalError> {
        let field = self.primary_key.name;
        record
            .get_scalar(field)
            .map_err(|source| self.access_error(field, source))
            .and_then(|value| {
                Key::try_from_value(value)
                    .map_err(|err| self.access_error(field, AccessFault::InvalidKey(err)))
            })
    }

    pub(crate) fn access_error(&self, field: &'static str, source: AccessFault) -> InternalError {
        ReconcileError::Access {
            entity: self.model.path,
            field,
            source,
        }
        .into()
    }
}

/// Fields across the supertype chain; subtype declarations replace inherited ones in place.
pub(crate) fn flatten_fields(model: &'static EntityModel) -> Vec<&'static EntityFieldModel> {
    let mut lineage: Vec<_> = model.lineage().collect();
    lineage.reverse();

    let mut fields: Vec<&'static EntityFieldModel> = Vec::new();
    for ancestor in lineage {
        for field in ancestor.fields {
            match fields.iter().position(|existing| existing.name == field.name) {
                Some(index) => fields[index] = field,
                None => fields.push(field),
            }
        }
    }

    fields
}

fn identifier_field(
    model: &'static EntityModel,
    fields: &[&'static EntityFieldModel],
) -> Result<&'static EntityFieldModel, InternalError> {
    let field = fields
        .iter()
        .copied()
        .find(|field| field.name == model.primary_key)
        .ok_or_else(|| {
            InternalError::metadata_invariant(format!(
                "entity {} has no identifier field '{}'",
                model.path, model.primary_key
            ))
        })?;

    match field.kind {
        EntityFieldKind::Scalar(kind) if kind.is_keyable() => Ok(field),
        _ => Err(InternalError::metadata_invariant(format!(
            "identifier {}.{} must be an int, uint or text scalar",
            model.path, field.name
        ))),
    }
}

fn check_container(
    model: &'static EntityModel,
    field: &EntityFieldModel,
    relation: &RelationModel,
) -> Result<(), InternalError> {
    if relation.cardinality.is_plural() == relation.container.is_collection() {
        return Ok(());
    }

    Err(InternalError::metadata_invariant(format!(
        "relation {}.{} declares {} with a {} container",
        model.path, field.name, relation.cardinality, relation.container
    )))
}

// Resolve the field on `target` that mirrors `field`.
//
// With `mapped_by`, the named target field is the owning side and must
// point back at `owner`. Without it, the target is scanned for a relation
// that names this field as its `mapped_by`.
fn resolve_inverse(
    owner: &'static EntityModel,
    field: &'static EntityFieldModel,
    relation: &RelationModel,
    target: &'static EntityModel,
) -> Result<InverseLink, InternalError> {
    let target_fields = flatten_fields(target);

    if let Some(mapped_by) = relation.mapped_by {
        let inverse = target_fields
            .iter()
            .find(|candidate| candidate.name == mapped_by)
            .and_then(|candidate| candidate.relation_model().map(|r| (candidate.name, r)))
            .filter(|(_, inverse)| owner.is_a(inverse.target));

        return match inverse {
            Some((name, inverse)) => Ok(link_for(name, inverse)),
            None => Err(InternalError::metadata_invariant(format!(
                "relation {}.{} is mapped by {}.{}, which is not a relation back to {}",
                owner.path, field.name, target.path, mapped_by, owner.entity_name
            ))),
        };
    }

    let scanned = target_fields.iter().find_map(|candidate| {
        candidate
            .relation_model()
            .filter(|inverse| {
                inverse.mapped_by == Some(field.name) && owner.is_a(inverse.target)
            })
            .map(|inverse| (candidate.name, inverse))
    });

    Ok(scanned.map_or(InverseLink::None, |(name, inverse)| link_for(name, inverse)))
}

const fn link_for(field: &'static str, relation: &RelationModel) -> InverseLink {
    if relation.container.is_collection() {
        InverseLink::Collection {
            field,
            container: relation.container,
        }
    } else {
        InverseLink::Scalar { field }
    }
}
