use crate::model::relation::RelationModel;
use std::fmt;

///
/// EntityFieldModel
/// Runtime field metadata declared on one entity model.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EntityFieldModel {
    /// Field name as used in records.
    pub name: &'static str,
    /// Declared field shape.
    pub kind: EntityFieldKind,
}

impl EntityFieldModel {
    #[must_use]
    pub const fn scalar(name: &'static str, kind: ScalarKind) -> Self {
        Self {
            name,
            kind: EntityFieldKind::Scalar(kind),
        }
    }

    /// Declared but never merged (derived or runtime-only values).
    #[must_use]
    pub const fn transient(name: &'static str) -> Self {
        Self {
            name,
            kind: EntityFieldKind::Transient,
        }
    }

    #[must_use]
    pub const fn relation(name: &'static str, relation: RelationModel) -> Self {
        Self {
            name,
            kind: EntityFieldKind::Relation(relation),
        }
    }

    #[must_use]
    pub const fn relation_model(&self) -> Option<&RelationModel> {
        match &self.kind {
            EntityFieldKind::Relation(relation) => Some(relation),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_relation(&self) -> bool {
        matches!(self.kind, EntityFieldKind::Relation(_))
    }
}

///
/// EntityFieldKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntityFieldKind {
    Scalar(ScalarKind),
    Transient,
    Relation(RelationModel),
}

///
/// ScalarKind
///
/// Value shape of a scalar field. Aligned with `Value` variants.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScalarKind {
    Blob,
    Bool,
    Float64,
    Int,
    Text,
    Timestamp,
    Uint,
}

impl ScalarKind {
    /// Whether values of this kind may serve as identifiers.
    #[must_use]
    pub const fn is_keyable(self) -> bool {
        matches!(self, Self::Int | Self::Text | Self::Uint)
    }

    /// Whether the store can generate identifiers of this kind.
    #[must_use]
    pub const fn is_generated(self) -> bool {
        matches!(self, Self::Int | Self::Uint)
    }
}

///
/// Container
///
/// Storage shape of a relation field.
/// `Map` is declarable but cannot be reconciled.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Container {
    One,
    List,
    Set,
    Map,
}

impl Container {
    #[must_use]
    pub const fn is_collection(self) -> bool {
        !matches!(self, Self::One)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::One => "one",
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
        };
        write!(f, "{label}")
    }
}
