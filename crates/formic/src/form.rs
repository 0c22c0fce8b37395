//! Form handle: the engine's public entry point
//!
//! A [`Form`] owns a [`ModelStore`] plus the sealed rule set and exposes
//! the mutation and inspection surface. Every mutation runs under one lock:
//! the store is updated, the coordinator re-derives async params, and the
//! evaluator rebuilds the field-state tree — synchronously, so the new
//! states are observable before any subsequent mutation is processed.
//!
//! Touched and dirty are interaction signals fed in from outside via the
//! `mark_*` methods; the engine never infers them from value changes.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;
use tracing::warn;

use crate::coordinator::{self, AsyncField};
use crate::schema::builder::{Schema, SchemaRules};
use crate::store::ModelStore;
use crate::types::{FieldError, FieldPath, FieldState, SchemaError};
use crate::eval;

// ============================================================================
// ENGINE STATE
// ============================================================================

/// Everything behind the form's lock. The model is the only shared mutable
/// resource; it is owned by the store and all mutation is serialized here.
pub(crate) struct EngineState {
    pub(crate) store: ModelStore,
    pub(crate) rules: Arc<SchemaRules>,
    pub(crate) states: IndexMap<FieldPath, FieldState>,
    pub(crate) touched: HashSet<FieldPath>,
    pub(crate) dirty: HashSet<FieldPath>,
    pub(crate) async_fields: IndexMap<FieldPath, AsyncField>,
}

impl EngineState {
    pub(crate) fn is_pending(&self) -> bool {
        self.async_fields.values().any(AsyncField::is_pending)
    }

    pub(crate) fn is_valid(&self) -> bool {
        !self.is_pending() && self.states.values().all(FieldState::is_valid)
    }

    pub(crate) fn collect_errors(&self) -> Vec<(FieldPath, FieldError)> {
        self.states
            .iter()
            .flat_map(|(path, state)| {
                state.errors.iter().map(|e| (path.clone(), e.clone()))
            })
            .collect()
    }

    pub(crate) fn mark_all_touched(&mut self) {
        for (path, state) in &mut self.states {
            self.touched.insert(path.clone());
            state.touched = true;
        }
    }
}

pub(crate) struct FormInner {
    pub(crate) state: Mutex<EngineState>,
    pub(crate) notify: Notify,
}

// ============================================================================
// FORM
// ============================================================================

/// Handle to a built form: model custody, derived field states, and async
/// check coordination. Cheap to clone; clones share the same form.
///
/// # Examples
///
/// ```rust
/// use formic::{Form, ModelStore};
/// use serde_json::json;
///
/// let store = ModelStore::new(json!({"name": ""}));
/// let form = Form::new(store, |schema| {
///     schema.required("name", "Name is required")?;
///     Ok(())
/// })
/// .unwrap();
///
/// assert!(!form.valid());
/// form.set_field("name", json!("Ada"));
/// assert!(form.valid());
/// ```
#[derive(Clone)]
pub struct Form {
    pub(crate) inner: Arc<FormInner>,
}

impl Form {
    /// Builds a form over `store` by running the schema closure and sealing
    /// the result. Configuration mistakes (unknown paths, bad patterns,
    /// dangling debounces) surface here as [`SchemaError`]s.
    ///
    /// Forms with async rules must be created inside a tokio runtime, since
    /// scheduling spawns debounce tasks.
    pub fn new(
        store: ModelStore,
        build: impl FnOnce(&mut Schema<'_>) -> Result<(), SchemaError>,
    ) -> Result<Self, SchemaError> {
        let shape = store.snapshot();
        let mut schema = Schema::new(&shape);
        build(&mut schema)?;
        let rules = schema.finish()?;

        let async_fields = rules
            .async_specs
            .iter()
            .map(|(path, spec)| (path.clone(), AsyncField::new(spec.clone())))
            .collect();

        let form = Self {
            inner: Arc::new(FormInner {
                state: Mutex::new(EngineState {
                    store,
                    rules: Arc::new(rules),
                    states: IndexMap::new(),
                    touched: HashSet::new(),
                    dirty: HashSet::new(),
                    async_fields,
                }),
                notify: Notify::new(),
            }),
        };
        form.mutate(|_| {});
        Ok(form)
    }

    /// Applies a state mutation, then reschedules async checks and rebuilds
    /// field states — all under one lock acquisition.
    fn mutate(&self, f: impl FnOnce(&mut EngineState)) {
        let mut state = self.inner.state.lock();
        f(&mut state);
        coordinator::schedule(&self.inner, &mut state);
        eval::recompute(&mut state);
        drop(state);
        self.inner.notify.notify_waiters();
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Replaces the whole model.
    pub fn set(&self, model: Value) {
        self.mutate(|state| state.store.set(model));
    }

    /// Functional update of the model.
    pub fn update(&self, f: impl FnOnce(Value) -> Value) {
        self.mutate(|state| state.store.update(f));
    }

    /// Replaces the value at one field path. Returns `false` (leaving the
    /// model untouched) when the path is malformed or absent.
    pub fn set_field(&self, path: &str, value: Value) -> bool {
        let parsed = match FieldPath::parse(path) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%err, "set_field ignored");
                return false;
            }
        };
        let mut replaced = false;
        self.mutate(|state| {
            let mut model = state.store.snapshot();
            replaced = parsed.set_in(&mut model, value);
            if replaced {
                state.store.set(model);
            } else {
                warn!(path = %parsed, "set_field ignored: path not in model");
            }
        });
        replaced
    }

    /// Resets to a fresh initial value: clears interaction flags and
    /// invalidates all outstanding async work.
    pub fn reset(&self, initial: Value) {
        self.mutate(|state| {
            state.store.reset(initial);
            state.touched.clear();
            state.dirty.clear();
            for field in state.async_fields.values_mut() {
                field.reset();
            }
        });
    }

    // ------------------------------------------------------------------
    // Interaction signals
    // ------------------------------------------------------------------

    /// Records that the user interacted with (blurred) the field.
    pub fn mark_touched(&self, path: &str) {
        self.mark(path, |state, parsed| {
            state.touched.insert(parsed.clone());
            if let Some(entry) = state.states.get_mut(parsed) {
                entry.touched = true;
            }
        });
    }

    /// Records that the user edited the field's value.
    pub fn mark_dirty(&self, path: &str) {
        self.mark(path, |state, parsed| {
            state.dirty.insert(parsed.clone());
            if let Some(entry) = state.states.get_mut(parsed) {
                entry.dirty = true;
            }
        });
    }

    /// Marks every known field touched, activating error display across the
    /// form. Invoked by `submit` when validation fails.
    pub fn mark_all_touched(&self) {
        self.inner.state.lock().mark_all_touched();
    }

    fn mark(&self, path: &str, apply: impl FnOnce(&mut EngineState, &FieldPath)) {
        match FieldPath::parse(path) {
            Ok(parsed) => apply(&mut self.inner.state.lock(), &parsed),
            Err(err) => warn!(%err, "interaction signal ignored"),
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Snapshot of the current model.
    #[must_use]
    pub fn value(&self) -> Value {
        self.inner.state.lock().store.snapshot()
    }

    /// Current store revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.state.lock().store.revision()
    }

    /// State of one field at the current revision. Unknown or unregistered
    /// paths report a default (valid, untouched) state.
    #[must_use]
    pub fn field_state(&self, path: &str) -> FieldState {
        let Ok(parsed) = FieldPath::parse(path) else {
            return FieldState::default();
        };
        self.inner
            .state
            .lock()
            .states
            .get(&parsed)
            .cloned()
            .unwrap_or_default()
    }

    /// Aggregate validity: no field carries an active error and no async
    /// check is outstanding.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.inner.state.lock().is_valid()
    }

    /// Whether any async check is debouncing or in flight.
    #[must_use]
    pub fn pending(&self) -> bool {
        self.inner.state.lock().is_pending()
    }

    /// Whether any field has been marked dirty.
    #[must_use]
    pub fn dirty(&self) -> bool {
        !self.inner.state.lock().dirty.is_empty()
    }

    /// Whether any field has been marked touched.
    #[must_use]
    pub fn touched(&self) -> bool {
        !self.inner.state.lock().touched.is_empty()
    }

    /// Every active error, flattened in field order.
    #[must_use]
    pub fn errors(&self) -> Vec<(FieldPath, FieldError)> {
        self.inner.state.lock().collect_errors()
    }

    /// Waits until no async check is debouncing or in flight. Callers who
    /// want wait-then-submit semantics call this before `submit`.
    pub async fn settle(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.pending() {
                return;
            }
            notified.await;
        }
    }
}
