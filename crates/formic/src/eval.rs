//! Validation evaluator
//!
//! Recomputes the full field-state tree from scratch for the current model
//! revision: whole-rule-set re-evaluation rather than incremental
//! recomputation, accepted because rule sets are small and it keeps
//! conditional activation trivially correct — a gated group whose condition
//! turned false simply contributes nothing, so its stale errors cannot
//! survive. Evaluation is idempotent and side-effect-free; async scheduling
//! happens separately in the coordinator.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::form::EngineState;
use crate::types::{FieldPath, FieldState, ModelRef};

/// Rebuilds `state.states` from the rule set, the current model, the async
/// field results, and the interaction flag sets. Runs under the engine lock.
pub(crate) fn recompute(state: &mut EngineState) {
    let rules = std::sync::Arc::clone(&state.rules);
    let model = state.store.snapshot();
    let model_ref = ModelRef::new(&model);
    let mut states: IndexMap<FieldPath, FieldState> = IndexMap::new();

    // Every registered path gets an entry, error-bearing or not, so state
    // lookups and touch-all have a stable set of fields to work with.
    for rule in &rules.sync_rules {
        states.entry(rule.path.clone()).or_default();
    }
    for path in state.async_fields.keys() {
        states.entry(path.clone()).or_default();
    }

    for rule in &rules.sync_rules {
        if let Some(condition) = &rule.condition
            && !condition(&model_ref)
        {
            continue;
        }
        let value = rule.path.lookup(&model).unwrap_or(&Value::Null);
        if let Some(error) = (rule.predicate)(value, &model_ref) {
            states
                .entry(rule.path.clone())
                .or_default()
                .errors
                .push(error);
        }
    }

    // Element groups: instantiate templates against the array as it exists
    // right now, keyed by index.
    for group in &rules.element_groups {
        let Some(elements) = group.array_path.lookup(&model).and_then(Value::as_array) else {
            continue;
        };
        for (index, element) in elements.iter().enumerate() {
            let element_ref = ModelRef::new(element);
            let base = group.array_path.element(index);
            for rule in &group.rules {
                let full_path = base.join(&rule.rel_path);
                states.entry(full_path.clone()).or_default();
                if let Some(condition) = &rule.condition
                    && !condition(&element_ref, &model_ref)
                {
                    continue;
                }
                let value = rule.rel_path.lookup(element).unwrap_or(&Value::Null);
                if let Some(error) = (rule.predicate)(value, &element_ref, &model_ref) {
                    states.entry(full_path).or_default().errors.push(error);
                }
            }
        }
    }

    // Merge committed async results and collect the pending set.
    let mut pending: Vec<FieldPath> = Vec::new();
    for (path, field) in &state.async_fields {
        let entry = states.entry(path.clone()).or_default();
        if let Some(error) = &field.error {
            entry.errors.push(error.clone());
        }
        if field.is_pending() {
            pending.push(path.clone());
        }
    }

    // Interaction flags and pending propagation (a field is pending while a
    // check for it or any ancestor is outstanding).
    for (path, field_state) in &mut states {
        field_state.touched = state.touched.contains(path);
        field_state.dirty = state.dirty.contains(path);
        field_state.pending = pending.iter().any(|p| path.starts_with(p));
    }

    let error_count: usize = states.values().map(|s| s.errors.len()).sum();
    debug!(
        revision = state.store.revision(),
        fields = states.len(),
        errors = error_count,
        pending = pending.len(),
        "field states recomputed"
    );
    state.states = states;
}
