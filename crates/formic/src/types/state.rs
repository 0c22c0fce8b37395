//! Derived per-field state: active errors plus interaction flags
//!
//! Field state is recomputed by the evaluator on every model revision and
//! never independently mutated. Touched and dirty are interaction flags fed
//! in from outside; pending reflects async checks in flight for the field or
//! one of its ancestors.

use serde::Serialize;

use super::error::FieldError;

/// Validation state of one field at the current model revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldState {
    /// Active errors, in rule-registration order.
    pub errors: Vec<FieldError>,
    /// The user has interacted with (blurred) the field.
    pub touched: bool,
    /// The user has edited the field's value.
    pub dirty: bool,
    /// An async check for this field (or an ancestor) is debouncing or in
    /// flight.
    pub pending: bool,
}

impl FieldState {
    /// Whether the field carries no active errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether an active error with the given kind tag is present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use formic::{FieldError, FieldState};
    ///
    /// let state = FieldState {
    ///     errors: vec![FieldError::custom("username_taken", "taken")],
    ///     ..FieldState::default()
    /// };
    /// assert!(state.has_kind("username_taken"));
    /// assert!(!state.has_kind("required"));
    /// ```
    #[must_use]
    pub fn has_kind(&self, kind: &str) -> bool {
        self.errors.iter().any(|e| e.kind().as_str() == kind)
    }

    /// First active error message, if any. Display gating by `touched` is
    /// the caller's presentation policy.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.errors.first().map(FieldError::message)
    }
}
