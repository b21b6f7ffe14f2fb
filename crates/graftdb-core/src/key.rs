use crate::value::Value;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Key
///
/// Normalized identifier value of one entity.
/// Identity comparisons during pairing and lookups operate on keys only.
///

#[derive(
    Clone, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Key {
    Int(i64),
    Text(String),
    Uint(u64),
}

impl Key {
    /// Project an identifier value into a key.
    /// `Null` maps to `None`: the entity has not been assigned an identifier yet.
    pub fn try_from_value(value: &Value) -> Result<Option<Self>, KeyError> {
        match value {
            Value::Null => Ok(None),
            Value::Int(v) => Ok(Some(Self::Int(*v))),
            Value::Uint(v) => Ok(Some(Self::Uint(*v))),
            Value::Text(v) => Ok(Some(Self::Text(v.clone()))),
            other => Err(KeyError::NotKeyable {
                kind: other.kind_label(),
            }),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(v) => Value::Int(*v),
            Self::Text(v) => Value::Text(v.clone()),
            Self::Uint(v) => Value::Uint(*v),
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Key {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

///
/// KeyError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum KeyError {
    #[error("{kind} values cannot be used as identifiers")]
    NotKeyable { kind: &'static str },
}

///
/// TESTS
///
