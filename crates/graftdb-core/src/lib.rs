//! Core runtime for GraftDB: entity models, records, metadata, the
//! reconciler that merges detached graphs into attached state, and an
//! in-memory unit of work behind the persistence gateway seam.
#![warn(unreachable_pub)]

#[macro_use]
mod macros;

// public exports are one module level down
pub mod config;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod key;
pub mod metadata;
pub mod model;
pub mod obs;
pub mod operation;
pub mod reconcile;
pub mod registry;
pub mod traits;
pub mod uow;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, sinks, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        entity::{DetachedGraph, DetachedRecord, EntityHandle, NodeId, Refs},
        key::Key,
        model::{
            entity::EntityModel,
            field::{Container, EntityFieldModel, ScalarKind},
            relation::{CascadeSet, CascadeType, RelationModel},
        },
        operation::OperationType,
        traits::{EntityKind, Path},
        value::Value,
    };
}
