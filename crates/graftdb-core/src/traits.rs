use crate::model::entity::EntityModel;

// ============================================================================
// ENTITY IDENTITY & SCHEMA
// ============================================================================
//
// These traits describe *what an entity is*; records carry the data.
//

///
/// Path
/// Fully-qualified schema path.
///

pub trait Path {
    const PATH: &'static str;
}

///
/// EntityKind
///
/// Marker type bound to a static entity model.
/// Generated by `entity_model!`.
///

pub trait EntityKind: Path + 'static {
    const ENTITY_NAME: &'static str;
    const PRIMARY_KEY: &'static str;
    const MODEL: &'static EntityModel;
}
