use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Corrupted bytes or inconsistent persisted state.
    pub fn corruption(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, origin, message)
    }

    /// A named ref, table, or row that does not exist.
    pub fn not_found(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, origin, message)
    }

    /// Schema deltas that cannot be merged without user intervention.
    pub fn schema_incompatible(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::SchemaIncompatible, ErrorOrigin::Schema, message)
    }

    /// A write or commit blocked by reified constraint violations.
    pub fn constraint_violation(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::ConstraintViolation, origin, message)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub const fn is_constraint_violation(&self) -> bool {
        matches!(self.class, ErrorClass::ConstraintViolation)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Internal,
    Conflict,
    Unsupported,
    InvariantViolation,
    SchemaIncompatible,
    ConstraintViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
            Self::SchemaIncompatible => "schema_incompatible",
            Self::ConstraintViolation => "constraint_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Serialize,
    Store,
    Index,
    Schema,
    Merge,
    Violation,
    Commit,
    Verify,
    Repo,
    Interface,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Serialize => "serialize",
            Self::Store => "store",
            Self::Index => "index",
            Self::Schema => "schema",
            Self::Merge => "merge",
            Self::Violation => "violation",
            Self::Commit => "commit",
            Self::Verify => "verify",
            Self::Repo => "repo",
            Self::Interface => "interface",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
