//! Runtime data model definitions.
//!
//! Static descriptors for entities, fields and relations. They replace
//! runtime reflection: every entity type declares its shape once, and the
//! metadata layer derives everything the reconciler needs from it.
//!
//! In general:
//! - `model` defines *what is declared*
//! - `metadata` defines *what is resolved* (flattened, classified, linked)
pub mod entity;
pub mod field;
pub mod relation;
