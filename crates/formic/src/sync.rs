//! Store binding: one model, two writers, no loops
//!
//! Keeps a form model in step with an external store value when both sides
//! can write. Flow is one-directional per tick and gated by structural
//! equality against the last synchronized value: an external change seeds
//! the model only when it differs from what was last applied, and local
//! edits propagate outward only when they differ from what the store last
//! saw. Explicit change detection, no implicit reactive cycles.

use serde_json::Value;
use tracing::trace;

use crate::form::Form;

/// Change-detecting bridge between a [`Form`] and an external store value.
///
/// # Examples
///
/// ```rust
/// use formic::{Form, ModelStore, StoreBinding};
/// use serde_json::json;
///
/// let store = ModelStore::new(json!({"name": ""}));
/// let form = Form::new(store, |_| Ok(())).unwrap();
/// let mut binding = StoreBinding::new();
///
/// // External store change seeds the model once...
/// assert!(binding.pull(&form, &json!({"name": "Ada"})));
/// // ...and pushing straight back is a no-op (no loop).
/// assert_eq!(binding.push(&form), None);
/// ```
#[derive(Debug, Default)]
pub struct StoreBinding {
    /// The last value that crossed the boundary, in either direction.
    synced: Option<Value>,
}

impl StoreBinding {
    /// Creates a binding with no synchronization history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an external store value to the form model, unless it is
    /// structurally equal to the last synchronized value. Returns whether
    /// the model was seeded.
    pub fn pull(&mut self, form: &Form, external: &Value) -> bool {
        if self.synced.as_ref() == Some(external) {
            trace!("pull skipped: external value already synchronized");
            return false;
        }
        form.set(external.clone());
        self.synced = Some(external.clone());
        true
    }

    /// Reads the form model for propagation to the external store, unless
    /// it is structurally equal to the last synchronized value. Returns the
    /// model to write, or `None` when the store is already current.
    pub fn push(&mut self, form: &Form) -> Option<Value> {
        let model = form.value();
        if self.synced.as_ref() == Some(&model) {
            trace!("push skipped: model already synchronized");
            return None;
        }
        self.synced = Some(model.clone());
        Some(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Form, ModelStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn form() -> Form {
        Form::new(ModelStore::new(json!({"name": "", "rating": null})), |_| {
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn pull_seeds_only_on_structural_change() {
        let form = form();
        let mut binding = StoreBinding::new();
        let external = json!({"name": "Ada", "rating": 5});

        assert!(binding.pull(&form, &external));
        assert_eq!(form.value(), external);
        let revision = form.revision();

        // Same value again: no mutation, no loop.
        assert!(!binding.pull(&form, &external));
        assert_eq!(form.revision(), revision);
    }

    #[test]
    fn push_propagates_only_local_edits() {
        let form = form();
        let mut binding = StoreBinding::new();
        binding.pull(&form, &json!({"name": "Ada", "rating": 5}));

        // Nothing changed locally since the pull.
        assert_eq!(binding.push(&form), None);

        form.set_field("rating", json!(4));
        let pushed = binding.push(&form).expect("local edit must propagate");
        assert_eq!(pushed, json!({"name": "Ada", "rating": 4}));

        // Pushed value is now the synchronized one; pulling it back is a
        // no-op.
        assert!(!binding.pull(&form, &pushed));
        assert_eq!(binding.push(&form), None);
    }
}
