use crate::{
    entity::refs::{CollectionKind, Refs},
    error::AccessFault,
    model::entity::EntityModel,
    value::Value,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

static NULL: Value = Value::Null;

///
/// Slot
///
/// Stored value of one record field.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Slot<R> {
    Scalar(Value),
    One(Option<R>),
    Many(Option<Refs<R>>),
}

impl<R> Slot<R> {
    #[must_use]
    pub const fn shape(&self) -> SlotShape {
        match self {
            Self::Scalar(_) => SlotShape::Scalar,
            Self::One(_) => SlotShape::One,
            Self::Many(_) => SlotShape::Many,
        }
    }
}

///
/// SlotShape
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotShape {
    Scalar,
    One,
    Many,
}

impl fmt::Display for SlotShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Scalar => "scalar",
            Self::One => "reference",
            Self::Many => "collection",
        };
        write!(f, "{label}")
    }
}

///
/// Record
///
/// Field bag for one entity instance.
///
/// A field without a slot reads as null (scalars) or absent (relations).
/// Tracked records remember every field written after construction.
///

#[derive(Clone, Debug)]
pub struct Record<R> {
    model: &'static EntityModel,
    slots: BTreeMap<&'static str, Slot<R>>,
    dirty: Option<BTreeSet<&'static str>>,
}

impl<R> Record<R> {
    #[must_use]
    pub const fn new(model: &'static EntityModel) -> Self {
        Self {
            model,
            slots: BTreeMap::new(),
            dirty: None,
        }
    }

    /// Create a record that tracks which fields have been written.
    #[must_use]
    pub const fn tracked(model: &'static EntityModel) -> Self {
        Self {
            model,
            slots: BTreeMap::new(),
            dirty: Some(BTreeSet::new()),
        }
    }

    #[must_use]
    pub const fn model(&self) -> &'static EntityModel {
        self.model
    }

    #[must_use]
    pub fn slot(&self, field: &str) -> Option<&Slot<R>> {
        self.slots.get(field)
    }

    pub fn slots(&self) -> impl Iterator<Item = (&'static str, &Slot<R>)> {
        self.slots.iter().map(|(name, slot)| (*name, slot))
    }

    /// Fields written since construction, when tracking is enabled.
    #[must_use]
    pub const fn dirty_fields(&self) -> Option<&BTreeSet<&'static str>> {
        self.dirty.as_ref()
    }

    /// Forget recorded writes; tracking stays enabled if it was.
    pub fn mark_clean(&mut self) {
        if let Some(dirty) = &mut self.dirty {
            dirty.clear();
        }
    }

    pub fn set(&mut self, field: &'static str, slot: Slot<R>) {
        if let Some(dirty) = &mut self.dirty {
            dirty.insert(field);
        }
        self.slots.insert(field, slot);
    }

    pub fn set_scalar(&mut self, field: &'static str, value: impl Into<Value>) {
        self.set(field, Slot::Scalar(value.into()));
    }

    pub fn set_one(&mut self, field: &'static str, target: Option<R>) {
        self.set(field, Slot::One(target));
    }

    pub fn set_many(&mut self, field: &'static str, members: Option<Refs<R>>) {
        self.set(field, Slot::Many(members));
    }

    #[must_use]
    pub fn with_scalar(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.set_scalar(field, value);
        self
    }

    #[must_use]
    pub fn with_one(mut self, field: &'static str, target: Option<R>) -> Self {
        self.set_one(field, target);
        self
    }

    #[must_use]
    pub fn with_many(mut self, field: &'static str, members: Option<Refs<R>>) -> Self {
        self.set_many(field, members);
        self
    }

    ///
    /// SHAPE-CHECKED READS
    ///

    pub fn get_scalar(&self, field: &str) -> Result<&Value, AccessFault> {
        match self.slots.get(field) {
            None => Ok(&NULL),
            Some(Slot::Scalar(value)) => Ok(value),
            Some(other) => Err(mismatch(SlotShape::Scalar, other)),
        }
    }

    pub fn get_one(&self, field: &str) -> Result<Option<&R>, AccessFault> {
        match self.slots.get(field) {
            None | Some(Slot::One(None)) => Ok(None),
            Some(Slot::One(Some(target))) => Ok(Some(target)),
            Some(other) => Err(mismatch(SlotShape::One, other)),
        }
    }

    pub fn get_many(&self, field: &str) -> Result<Option<&Refs<R>>, AccessFault> {
        match self.slots.get(field) {
            None | Some(Slot::Many(None)) => Ok(None),
            Some(Slot::Many(Some(members))) => Ok(Some(members)),
            Some(other) => Err(mismatch(SlotShape::Many, other)),
        }
    }

    /// Borrow a collection for mutation, instantiating it when absent.
    pub fn many_mut(
        &mut self,
        field: &'static str,
        kind: CollectionKind,
    ) -> Result<&mut Refs<R>, AccessFault> {
        if let Some(other) = self.slots.get(field)
            && !matches!(other, Slot::Many(_))
        {
            return Err(mismatch(SlotShape::Many, other));
        }
        if let Some(dirty) = &mut self.dirty {
            dirty.insert(field);
        }

        let slot = self.slots.entry(field).or_insert(Slot::Many(None));
        match slot {
            Slot::Many(members) => Ok(members.get_or_insert_with(|| Refs::new(kind))),
            other => Err(mismatch(SlotShape::Many, other)),
        }
    }

    /// Value of the model's identifier field.
    pub fn key_value(&self) -> Result<&Value, AccessFault> {
        self.get_scalar(self.model.primary_key)
    }
}

fn mismatch<R>(expected: SlotShape, found: &Slot<R>) -> AccessFault {
    AccessFault::ShapeMismatch {
        expected,
        found: found.shape(),
    }
}
