use derive_more::Display;
use graftdb_core::error::{
    ErrorClass as CoreErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        Self::new(err.class.into(), err.origin.into(), err.message)
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// A record field has the wrong shape or an unusable identifier.
    Access,

    /// Duplicate registration or identifier clash.
    Conflict,

    /// A referenced entity does not exist.
    NotFound,

    /// The authorization hook rejected an entity or field.
    Unauthorized,

    /// The model declares something the engine cannot reconcile.
    Unsupported,

    /// The caller cannot remediate this.
    Internal,
}

impl From<CoreErrorClass> for ErrorKind {
    fn from(class: CoreErrorClass) -> Self {
        match class {
            CoreErrorClass::Access => Self::Access,
            CoreErrorClass::Conflict => Self::Conflict,
            CoreErrorClass::NotFound => Self::NotFound,
            CoreErrorClass::Unauthorized => Self::Unauthorized,
            CoreErrorClass::Unsupported => Self::Unsupported,
            CoreErrorClass::Internal | CoreErrorClass::InvariantViolation => Self::Internal,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Authorize,
    Gateway,
    Metadata,
    Reconcile,
    Store,
    Value,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Authorize => Self::Authorize,
            CoreErrorOrigin::Gateway => Self::Gateway,
            CoreErrorOrigin::Metadata => Self::Metadata,
            CoreErrorOrigin::Reconcile => Self::Reconcile,
            CoreErrorOrigin::Store => Self::Store,
            CoreErrorOrigin::Value => Self::Value,
        }
    }
}

///
/// TESTS
///
