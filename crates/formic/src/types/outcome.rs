//! Submission outcomes
//!
//! `submit` converts every expected failure mode into a variant of
//! [`SubmitOutcome`] so callers can branch messaging without catching
//! faults: still-validating, invalid form, failed action, success.

use serde::Serialize;
use serde_json::Value;

use super::error::{ActionError, FieldError};
use super::path::FieldPath;

/// Tagged outcome of a submit attempt.
#[derive(Debug, Clone, Serialize)]
pub enum SubmitOutcome {
    /// The action ran and succeeded; carries the submitted model snapshot.
    Success(Value),
    /// An async check was still debouncing or in flight; the action was not
    /// invoked. This engine rejects immediately rather than waiting — call
    /// `Form::settle` first for wait-then-submit behavior.
    Pending,
    /// The model was invalid; the action was not invoked. All registered
    /// fields were marked touched so error display activates.
    ValidationFailed {
        /// Every active error, keyed by field path.
        errors: Vec<(FieldPath, FieldError)>,
    },
    /// The model was valid but the caller-supplied action failed; the model
    /// is unchanged.
    ActionFailed(ActionError),
}

impl SubmitOutcome {
    /// Whether the submission succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Success(_))
    }
}
