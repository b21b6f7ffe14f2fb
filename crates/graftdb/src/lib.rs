//! ## Crate layout
//! - `core`: entity models, records, metadata, the reconciler, and the
//!   in-memory unit of work.
//! - `error`: public error type with a stable kind + origin taxonomy.
//!
//! The `prelude` module carries the vocabulary needed to declare models and
//! build detached graphs; engine types are reached through `core`.

pub use graftdb_core as core;

pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin};
pub use graftdb_core::entity_model;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Engine
//

pub use graftdb_core::{
    config::ReconcileConfig,
    gateway::{AuthorizationDenied, AuthorizeEntity, EntityRef, PermitAll, PersistenceGateway},
    reconcile::{ReconcileReport, ReconcileStats, Reconciler, UnlinkedMember},
    registry::EntityRegistry,
    uow::{EntityState, FlushReport, MemoryStore, RowRef, StoredRecord, UnitOfWork},
};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{gateway::PersistenceGateway as _, prelude::*};
    pub use crate::{EntityRegistry, MemoryStore, ReconcileConfig, Reconciler, entity_model};
}
