//! Error types: routine field errors, fatal schema errors, and the
//! boundary errors for async checks and submit actions
//!
//! Field errors are plain values attached to field state, never raised as
//! faults. Schema errors are configuration bugs surfaced at build time.
//! Check and action errors are caught at the nearest boundary and converted
//! into field errors or submit outcomes.

use std::fmt::{self, Display};

use serde::{Serialize, Serializer};
use thiserror::Error;

use super::path::{FieldPath, PathParseError};

// ============================================================================
// ERROR KIND
// ============================================================================

/// Category tag carried by every [`FieldError`].
///
/// Built-in rules use the fixed variants; `validate`, async `on_success`,
/// and async `on_error` handlers use [`ErrorKind::Custom`] with their own
/// tag (for example `"username_taken"` or `"server_error"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Required,
    MinLength,
    MaxLength,
    Min,
    Max,
    Pattern,
    Email,
    Custom(String),
}

impl ErrorKind {
    /// Creates a custom kind tag.
    pub fn custom(kind: impl Into<String>) -> Self {
        ErrorKind::Custom(kind.into())
    }

    /// Snake-case tag for this kind, matching what rule callers branch on.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::Required => "required",
            ErrorKind::MinLength => "min_length",
            ErrorKind::MaxLength => "max_length",
            ErrorKind::Min => "min",
            ErrorKind::Max => "max",
            ErrorKind::Pattern => "pattern",
            ErrorKind::Email => "email",
            ErrorKind::Custom(kind) => kind,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// FIELD ERROR
// ============================================================================

/// One active validation error on a field: a kind tag plus a human-readable
/// message. Routine data, not a fault.
///
/// # Examples
///
/// ```rust
/// use formic::FieldError;
///
/// let err = FieldError::custom("username_taken", "This username is already taken");
/// assert_eq!(err.kind().as_str(), "username_taken");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    kind: ErrorKind,
    message: String,
}

impl FieldError {
    /// Creates an error with an explicit kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an error with a custom kind tag.
    pub fn custom(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::custom(kind), message)
    }

    /// The kind tag.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

// ============================================================================
// SCHEMA ERROR
// ============================================================================

/// Fatal configuration errors reported while building a schema.
///
/// These indicate a programming mistake in the schema closure and are never
/// recoverable at runtime.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The path string could not be parsed.
    #[error(transparent)]
    InvalidPath(#[from] PathParseError),

    /// A rule was registered on a path absent from the model shape.
    #[error("unknown field path `{0}` (not present in the initial model)")]
    UnknownPath(FieldPath),

    /// `apply_each` targeted a path whose value is not an array.
    #[error("path `{0}` is not an array field")]
    NotAnArray(FieldPath),

    /// A `pattern` rule carried an invalid regular expression.
    #[error("invalid pattern on `{path}`: {source}")]
    InvalidPattern {
        path: FieldPath,
        #[source]
        source: regex::Error,
    },

    /// Two async rules were registered on the same path.
    #[error("async rule already registered on `{0}`")]
    DuplicateAsyncRule(FieldPath),

    /// A debounce interval was registered on a path with no async rule.
    #[error("debounce registered on `{0}` but no async rule targets it")]
    DebounceWithoutAsync(FieldPath),
}

// ============================================================================
// BOUNDARY ERRORS
// ============================================================================

/// Failure returned by a caller-supplied async check function.
///
/// The coordinator catches it and maps it through the rule's `on_error`
/// handler into a [`FieldError`]; it never propagates further.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CheckError {
    message: String,
}

impl CheckError {
    /// Creates a check failure with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure returned by a caller-supplied submit action.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    /// Creates an action failure with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ============================================================================
// STANDARD TESTS
// ============================================================================
