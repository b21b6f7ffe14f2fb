//! Entity records and the reference types that link them.
//!
//! A `Record<R>` is one entity's field bag. The reference parameter `R`
//! decides which graph the record belongs to: `NodeId` for detached input,
//! `EntityHandle` for entities attached to a unit of work.

mod graph;
mod handle;
mod record;
mod refs;

#[cfg(test)]
mod tests;

pub use graph::{DetachedGraph, DetachedRecord};
pub use handle::{EntityHandle, NodeId};
pub use record::{Record, Slot, SlotShape};
pub use refs::{CollectionKind, Refs};

/// Record attached to a persistence gateway.
pub type AttachedRecord = Record<EntityHandle>;
