use crate::model::field::EntityFieldModel;

///
/// EntityModel
/// Static runtime model for one entity type.
///

#[derive(Debug)]
pub struct EntityModel {
    /// Fully-qualified type path (for diagnostics and metrics).
    pub path: &'static str,
    /// Stable external name; relation targets refer to it.
    pub entity_name: &'static str,
    /// Name of the identifier field (declared here or on a supertype).
    pub primary_key: &'static str,
    /// Fields declared directly on this type.
    pub fields: &'static [EntityFieldModel],
    /// Supertype whose fields this type inherits.
    pub parent: Option<&'static Self>,
}

impl EntityModel {
    /// Walk this model and its supertypes, most-derived first.
    pub fn lineage(&'static self) -> impl Iterator<Item = &'static Self> {
        std::iter::successors(Some(self), |model| model.parent)
    }

    /// Whether this model is `entity_name` or inherits from it.
    #[must_use]
    pub fn is_a(&'static self, entity_name: &str) -> bool {
        self.lineage().any(|model| model.entity_name == entity_name)
    }
}
