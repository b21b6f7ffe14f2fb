use crate::model::field::Container;
use derive_more::Deref;

///
/// CollectionKind
///
/// Concrete container instantiated for a collection-valued relation.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CollectionKind {
    List,
    Set,
}

impl CollectionKind {
    /// Container to instantiate for a declared relation shape.
    /// `None` for singular and keyed (map) relations.
    #[must_use]
    pub const fn for_container(container: Container) -> Option<Self> {
        match container {
            Container::List => Some(Self::List),
            Container::Set => Some(Self::Set),
            Container::One | Container::Map => None,
        }
    }
}

///
/// Refs
///
/// Ordered collection of entity references.
/// Sets keep first-seen insertion order and reject duplicates.
///

#[derive(Clone, Debug, Deref, Eq, PartialEq)]
pub struct Refs<R> {
    kind: CollectionKind,
    #[deref]
    items: Vec<R>,
}

impl<R> Refs<R> {
    #[must_use]
    pub const fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> CollectionKind {
        self.kind
    }
}

impl<R: PartialEq> Refs<R> {
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = R>) -> Self {
        Self::from_items(CollectionKind::List, items)
    }

    #[must_use]
    pub fn set(items: impl IntoIterator<Item = R>) -> Self {
        Self::from_items(CollectionKind::Set, items)
    }

    #[must_use]
    pub fn from_items(kind: CollectionKind, items: impl IntoIterator<Item = R>) -> Self {
        let mut refs = Self::new(kind);
        for item in items {
            refs.push(item);
        }

        refs
    }

    /// Append a member; sets ignore members already present.
    pub fn push(&mut self, item: R) -> bool {
        match self.kind {
            CollectionKind::List => {
                self.items.push(item);
                true
            }
            CollectionKind::Set => self.insert_unique(item),
        }
    }

    /// Append a member unless it is already present, regardless of kind.
    pub fn insert_unique(&mut self, item: R) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        self.items.push(item);

        true
    }

    /// Remove the first occurrence of a member, returning `true` if it was present.
    pub fn remove(&mut self, item: &R) -> bool {
        if let Some(index) = self.items.iter().position(|existing| existing == item) {
            self.items.remove(index);
            return true;
        }

        false
    }
}

impl<R> IntoIterator for Refs<R> {
    type Item = R;
    type IntoIter = std::vec::IntoIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, R> IntoIterator for &'a Refs<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
