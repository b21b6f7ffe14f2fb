use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

///
/// OperationType
///
/// Closed operation hierarchy: `CREATE` and `UPDATE` specialize `SAVE`;
/// `RETRIEVE` and `DELETE` are roots.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Save,
    Create,
    Update,
    Retrieve,
    Delete,
}

impl OperationType {
    pub const ALL: [Self; 5] = [
        Self::Save,
        Self::Create,
        Self::Update,
        Self::Retrieve,
        Self::Delete,
    ];

    /// Static parent table.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Create | Self::Update => Some(Self::Save),
            Self::Save | Self::Retrieve | Self::Delete => None,
        }
    }

    /// Stable wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Save => "SAVE",
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Retrieve => "RETRIEVE",
            Self::Delete => "DELETE",
        }
    }

    /// True if `candidate` is `reference` or descends from it.
    #[must_use]
    pub fn deep_compare(reference: Self, candidate: Self) -> bool {
        candidate == reference
            || candidate
                .parent()
                .is_some_and(|parent| Self::deep_compare(reference, parent))
    }

    /// Whether this operation falls within `reference`'s subtree.
    #[must_use]
    pub fn is_within(self, reference: Self) -> bool {
        Self::deep_compare(reference, self)
    }

    #[must_use]
    pub fn is_save(self) -> bool {
        self.is_within(Self::Save)
    }

    #[must_use]
    pub fn is_delete(self) -> bool {
        self.is_within(Self::Delete)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationType {
    type Err = OperationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| OperationParseError(s.to_string()))
    }
}

///
/// OperationParseError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("unknown operation type '{0}'")]
pub struct OperationParseError(pub String);

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_operation() -> impl Strategy<Value = OperationType> {
        prop::sample::select(OperationType::ALL.to_vec())
    }

    #[test]
    fn save_family_contains_create_and_update() {
        assert!(OperationType::deep_compare(
            OperationType::Save,
            OperationType::Create
        ));
        assert!(OperationType::Update.is_save());
        assert!(!OperationType::deep_compare(
            OperationType::Create,
            OperationType::Save
        ));
        assert!(!OperationType::Delete.is_save());
        assert!(!OperationType::Retrieve.is_delete());
    }

    #[test]
    fn wire_values_parse_and_serialize() {
        assert_eq!(
            "UPDATE".parse::<OperationType>(),
            Ok(OperationType::Update)
        );
        assert_eq!(
            "update".parse::<OperationType>(),
            Err(OperationParseError("update".to_string()))
        );

        let json = serde_json::to_string(&OperationType::Retrieve).unwrap();
        assert_eq!(json, "\"RETRIEVE\"");
        let back: OperationType = serde_json::from_str("\"DELETE\"").unwrap();
        assert_eq!(back, OperationType::Delete);
    }

    proptest! {
        #[test]
        fn deep_compare_is_reflexive(op in any_operation()) {
            prop_assert!(OperationType::deep_compare(op, op));
        }

        #[test]
        fn deep_compare_follows_parent(reference in any_operation(), candidate in any_operation()) {
            let expected = candidate == reference || candidate.parent() == Some(reference);
            prop_assert_eq!(OperationType::deep_compare(reference, candidate), expected);
        }

        #[test]
        fn display_round_trips(op in any_operation()) {
            prop_assert_eq!(op.to_string().parse::<OperationType>(), Ok(op));
        }
    }
}
