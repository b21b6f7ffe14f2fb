use derive_more::Display;

///
/// NodeId
///
/// Arena index of one detached record.
/// Serves as the stable surrogate identity of a detached node.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("#{_0}")]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

///
/// EntityHandle
///
/// Gateway-issued reference to an attached entity.
/// Only meaningful to the gateway that issued it.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("@{_0}")]
pub struct EntityHandle(usize);

impl EntityHandle {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}
