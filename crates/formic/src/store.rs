//! Model store: pure data custody for the form model
//!
//! Holds the current model value and a monotonically increasing revision
//! counter. Every mutation replaces the whole value (no in-place mutation is
//! visible to consumers), so structural comparison between revisions is
//! cheap and reliable. No validation happens here.

use serde_json::Value;
use tracing::debug;

/// Custodian of the structured model value.
///
/// # Examples
///
/// ```rust
/// use formic::ModelStore;
/// use serde_json::json;
///
/// let mut store = ModelStore::new(json!({"name": ""}));
/// store.update(|mut model| {
///     model["name"] = json!("Ada");
///     model
/// });
/// assert_eq!(store.get()["name"], json!("Ada"));
/// assert_eq!(store.revision(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ModelStore {
    value: Value,
    revision: u64,
}

impl ModelStore {
    /// Creates a store holding `initial`.
    #[must_use]
    pub fn new(initial: Value) -> Self {
        Self {
            value: initial,
            revision: 0,
        }
    }

    /// The current model value.
    #[must_use]
    pub fn get(&self) -> &Value {
        &self.value
    }

    /// An owned copy of the current model value.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.value.clone()
    }

    /// Revision counter; bumped once per mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the whole model atomically.
    pub fn set(&mut self, new_model: Value) {
        self.value = new_model;
        self.revision += 1;
        debug!(revision = self.revision, "model replaced");
    }

    /// Functional update: derives the next model from the current one.
    pub fn update(&mut self, f: impl FnOnce(Value) -> Value) {
        let next = f(self.value.clone());
        self.set(next);
    }

    /// Resets to a fresh initial value. A mutation like any other as far as
    /// revision tracking is concerned.
    pub fn reset(&mut self, initial: Value) {
        self.set(initial);
    }
}
