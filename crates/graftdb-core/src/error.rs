use crate::{
    entity::{EntityHandle, SlotShape},
    key::{Key, KeyError},
    model::field::Container,
    operation::OperationType,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Every fallible engine, registry and gateway path returns this type.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError without structured detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a metadata-origin invariant violation (invalid model declarations).
    pub(crate) fn metadata_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Metadata,
            message,
        )
    }

    /// Construct a gateway-origin invariant violation (stale or foreign handles).
    pub(crate) fn gateway_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Gateway,
            message,
        )
    }

    /// Construct a store-origin invariant violation.
    pub(crate) fn store_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Store, message)
    }

    /// Construct a registry conflict (duplicate registrations).
    pub(crate) fn metadata_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Conflict, ErrorOrigin::Metadata, message)
    }

    /// Construct a standardized unknown-entity error.
    pub fn unknown_entity(entity_name: &str) -> Self {
        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Metadata,
            format!("entity '{entity_name}' is not registered"),
        )
    }

    /// Construct the error raised when a handle no longer resolves to a managed entity.
    pub(crate) fn stale_handle(handle: EntityHandle) -> Self {
        Self::gateway_invariant(format!("entity handle {handle} is not tracked"))
    }

    #[must_use]
    pub const fn reconcile_error(&self) -> Option<&ReconcileError> {
        match &self.detail {
            Some(ErrorDetail::Reconcile(err)) => Some(err),
            None => None,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.reconcile_error(), Some(ReconcileError::NotFound { .. }))
    }

    #[must_use]
    pub const fn is_access(&self) -> bool {
        matches!(self.reconcile_error(), Some(ReconcileError::Access { .. }))
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self.reconcile_error(),
            Some(ReconcileError::Unauthorized { .. })
        )
    }

    #[must_use]
    pub const fn is_unsupported_collection(&self) -> bool {
        matches!(
            self.reconcile_error(),
            Some(ReconcileError::UnsupportedCollectionType { .. })
        )
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Reconcile(ReconcileError),
}

///
/// ReconcileError
///
/// Failure taxonomy of a reconcile call.
/// Never returned directly; always wrapped in [`ErrorDetail::Reconcile`].
///

#[derive(Debug, ThisError)]
pub enum ReconcileError {
    #[error("entity not found: {entity}[{key}]")]
    NotFound { entity: &'static str, key: KeyLabel },

    #[error("unable to access {entity}.{field}: {source}")]
    Access {
        entity: &'static str,
        field: &'static str,
        #[source]
        source: AccessFault,
    },

    #[error("access denied on {entity}[{key}] ({scope}): {reason}")]
    Unauthorized {
        entity: &'static str,
        key: KeyLabel,
        scope: AuthorizationScope,
        reason: String,
    },

    #[error("unsupported collection type for {entity}.{field}: {container}")]
    UnsupportedCollectionType {
        entity: &'static str,
        field: &'static str,
        container: Container,
    },
}

impl ReconcileError {
    const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Access { .. } => ErrorClass::Access,
            Self::Unauthorized { .. } => ErrorClass::Unauthorized,
            Self::UnsupportedCollectionType { .. } => ErrorClass::Unsupported,
        }
    }

    const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::Unauthorized { .. } => ErrorOrigin::Authorize,
            _ => ErrorOrigin::Reconcile,
        }
    }
}

impl From<ReconcileError> for InternalError {
    fn from(err: ReconcileError) -> Self {
        Self {
            class: err.class(),
            origin: err.origin(),
            message: err.to_string(),
            detail: Some(ErrorDetail::Reconcile(err)),
        }
    }
}

///
/// AccessFault
///
/// Underlying cause of a field access failure.
///

#[derive(Debug, ThisError)]
pub enum AccessFault {
    #[error("expected {expected} slot, found {found}")]
    ShapeMismatch { expected: SlotShape, found: SlotShape },

    #[error(transparent)]
    InvalidKey(#[from] KeyError),
}

///
/// AuthorizationScope
/// What an authorization decision was requested for.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuthorizationScope {
    Entity(OperationType),
    Field(&'static str),
}

impl fmt::Display for AuthorizationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(operation) => write!(f, "operation {operation}"),
            Self::Field(field) => write!(f, "field {field}"),
        }
    }
}

///
/// KeyLabel
/// Diagnostic rendering of an optional identifier (`NEW` when unassigned).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyLabel(pub Option<Key>);

impl fmt::Display for KeyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(key) => write!(f, "{key}"),
            None => f.write_str("NEW"),
        }
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Access,
    Conflict,
    Internal,
    InvariantViolation,
    NotFound,
    Unauthorized,
    Unsupported,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Access => "access",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
            Self::InvariantViolation => "invariant_violation",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Authorize,
    Gateway,
    Metadata,
    Reconcile,
    Store,
    Value,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Authorize => "authorize",
            Self::Gateway => "gateway",
            Self::Metadata => "metadata",
            Self::Reconcile => "reconcile",
            Self::Store => "store",
            Self::Value => "value",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
