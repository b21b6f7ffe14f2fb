use crate::model::field::Container;
use std::fmt;

///
/// RelationModel
///
/// Declared relation from an owning entity to a target entity.
/// `target` is the stable entity name of the related model.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RelationModel {
    pub target: &'static str,
    pub cardinality: Cardinality,
    pub container: Container,
    pub cascade: CascadeSet,
    /// Name of the owning field on the target when this side is the inverse.
    pub mapped_by: Option<&'static str>,
}

impl RelationModel {
    const fn new(target: &'static str, cardinality: Cardinality, container: Container) -> Self {
        Self {
            target,
            cardinality,
            container,
            cascade: CascadeSet::NONE,
            mapped_by: None,
        }
    }

    #[must_use]
    pub const fn one_to_one(target: &'static str) -> Self {
        Self::new(target, Cardinality::OneToOne, Container::One)
    }

    #[must_use]
    pub const fn many_to_one(target: &'static str) -> Self {
        Self::new(target, Cardinality::ManyToOne, Container::One)
    }

    #[must_use]
    pub const fn one_to_many(target: &'static str, container: Container) -> Self {
        Self::new(target, Cardinality::OneToMany, container)
    }

    #[must_use]
    pub const fn many_to_many(target: &'static str, container: Container) -> Self {
        Self::new(target, Cardinality::ManyToMany, container)
    }

    #[must_use]
    pub const fn cascade(mut self, cascade: CascadeSet) -> Self {
        self.cascade = cascade;
        self
    }

    #[must_use]
    pub const fn mapped_by(mut self, field: &'static str) -> Self {
        self.mapped_by = Some(field);
        self
    }
}

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Cardinality {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl Cardinality {
    /// Order in which relations of one entity are reconciled.
    pub const MERGE_ORDER: [Self; 4] = [
        Self::OneToMany,
        Self::ManyToMany,
        Self::OneToOne,
        Self::ManyToOne,
    ];

    #[must_use]
    pub const fn is_plural(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::OneToOne => "one_to_one",
            Self::ManyToOne => "many_to_one",
            Self::OneToMany => "one_to_many",
            Self::ManyToMany => "many_to_many",
        };
        write!(f, "{label}")
    }
}

///
/// CascadeType
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum CascadeType {
    Refresh = 0,
    Detach = 1,
    Persist = 2,
    Merge = 3,
    Remove = 4,
    All = 5,
}

impl CascadeType {
    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

///
/// CascadeSet
///
/// Const-constructible set of cascade types declared on a relation.
///

#[derive(Clone, Copy, Default, Eq, PartialEq)]
pub struct CascadeSet(u8);

impl CascadeSet {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self::of(&[CascadeType::All]);

    #[must_use]
    pub const fn of(types: &[CascadeType]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < types.len() {
            bits |= types[i].bit();
            i += 1;
        }

        Self(bits)
    }

    #[must_use]
    pub const fn contains(self, ty: CascadeType) -> bool {
        self.0 & ty.bit() != 0
    }

    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Declared cascade types in declaration-independent order.
    pub fn iter(self) -> impl Iterator<Item = CascadeType> {
        [
            CascadeType::Refresh,
            CascadeType::Detach,
            CascadeType::Persist,
            CascadeType::Merge,
            CascadeType::Remove,
            CascadeType::All,
        ]
        .into_iter()
        .filter(move |ty| self.contains(*ty))
    }
}

impl fmt::Debug for CascadeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

///
/// TESTS
///
