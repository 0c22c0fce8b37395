//! Submission controller
//!
//! Gates a caller-supplied action on aggregate validity. The policy for
//! outstanding async checks is to reject immediately with
//! [`SubmitOutcome::Pending`] rather than wait — callers wanting
//! wait-then-submit call [`Form::settle`] first.

use std::future::Future;

use serde_json::Value;
use tracing::debug;

use crate::form::Form;
use crate::types::{ActionError, SubmitOutcome};

/// Attempts to submit the form through `action`.
///
/// - An outstanding async check yields [`SubmitOutcome::Pending`]; the
///   action is not invoked.
/// - An invalid model yields [`SubmitOutcome::ValidationFailed`] without
///   invoking the action; as a side effect every field is marked touched so
///   error display activates.
/// - Otherwise the action is invoked exactly once with a model snapshot.
///   Failure yields [`SubmitOutcome::ActionFailed`] and leaves the model
///   unchanged; success yields [`SubmitOutcome::Success`] with the
///   snapshot. The controller never resets state — what to do after
///   success (e.g. `Form::reset`) is the caller's business.
///
/// # Examples
///
/// ```rust
/// use formic::{Form, ModelStore, SubmitOutcome, submit};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let store = ModelStore::new(json!({"name": "Ada"}));
/// let form = Form::new(store, |schema| {
///     schema.required("name", "Name is required")?;
///     Ok(())
/// })
/// .unwrap();
///
/// let outcome = submit(&form, |model| async move {
///     assert_eq!(model["name"], json!("Ada"));
///     Ok(())
/// })
/// .await;
/// assert!(outcome.is_success());
/// # });
/// ```
pub async fn submit<A, Fut>(form: &Form, action: A) -> SubmitOutcome
where
    A: FnOnce(Value) -> Fut,
    Fut: Future<Output = Result<(), ActionError>>,
{
    let snapshot = {
        let mut state = form.inner.state.lock();
        if state.is_pending() {
            debug!("submit rejected: async validation still pending");
            return SubmitOutcome::Pending;
        }
        if !state.is_valid() {
            state.mark_all_touched();
            let errors = state.collect_errors();
            debug!(errors = errors.len(), "submit rejected: validation failed");
            return SubmitOutcome::ValidationFailed { errors };
        }
        state.store.snapshot()
    };

    match action(snapshot.clone()).await {
        Ok(()) => {
            debug!("submit action succeeded");
            SubmitOutcome::Success(snapshot)
        }
        Err(error) => {
            debug!(%error, "submit action failed");
            SubmitOutcome::ActionFailed(error)
        }
    }
}
