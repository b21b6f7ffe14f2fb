use crate::{
    model::relation::{CascadeSet, CascadeType},
    operation::OperationType,
};

/// Cascade types that propagate a SAVE-family operation.
pub const SAVE_CASCADES: CascadeSet = CascadeSet::of(&[CascadeType::Persist, CascadeType::All]);

/// Whether a relation's cascade propagates for this call.
///
/// SAVE-family operations require PERSIST or ALL on the relation; DELETE
/// propagates through any relation. Nothing propagates outside a merge.
#[must_use]
pub fn cascades(operation: OperationType, cascade: CascadeSet, merge: bool) -> bool {
    merge && ((operation.is_save() && cascade.intersects(SAVE_CASCADES)) || operation.is_delete())
}

///
/// TESTS
///
