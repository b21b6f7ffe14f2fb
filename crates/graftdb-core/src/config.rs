use serde::{Deserialize, Serialize};

///
/// ReconcileConfig
///
/// Per-reconciler behaviour switches.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Merge the root and cascade-eligible children.
    /// `false` runs a lookup-only pass: existing rows are linked, nothing is
    /// merged, created or removed.
    pub merge: bool,

    /// Copy only tracked-dirty fields from records created with `Record::tracked`.
    pub respect_dirty_tracking: bool,
}

impl ReconcileConfig {
    #[must_use]
    pub const fn lookup_only() -> Self {
        Self {
            merge: false,
            respect_dirty_tracking: true,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            merge: true,
            respect_dirty_tracking: true,
        }
    }
}

///
/// TESTS
///
