//! Declarative schema builder
//!
//! A [`Schema`] is handed to the closure passed to [`Form::new`]
//! (`crate::Form`), mirroring the model's shape: rules are registered
//! against dotted field paths and checked against the initial model at
//! build time, so a typo'd path is a fatal configuration error rather than
//! a rule that silently never fires.
//!
//! # Examples
//!
//! ```rust
//! use formic::{Form, ModelStore};
//! use serde_json::json;
//!
//! let store = ModelStore::new(json!({"username": "", "email": ""}));
//! let form = Form::new(store, |schema| {
//!     schema.required("username", "Username is required")?;
//!     schema.min_length("username", 3, "Minimum 3 characters")?;
//!     schema.required("email", "Email is required")?;
//!     schema.email("email", "Please enter a valid email")?;
//!     Ok(())
//! })
//! .unwrap();
//! assert!(!form.valid());
//! ```

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::rules::{self, ValueCheck};
use crate::coordinator::{AsyncRule, AsyncSpec};
use crate::types::{FieldError, FieldPath, ModelRef, SchemaError, Segment};

// ============================================================================
// CLOSURE ALIASES
// ============================================================================

/// Predicate over a field value with read access to the whole model.
pub(crate) type Predicate =
    Arc<dyn Fn(&Value, &ModelRef<'_>) -> Option<FieldError> + Send + Sync>;

/// Activation condition over the whole model.
pub(crate) type Condition = Arc<dyn Fn(&ModelRef<'_>) -> bool + Send + Sync>;

/// Per-element predicate: field value, element subtree, whole model.
pub(crate) type ElementPredicate =
    Arc<dyn Fn(&Value, &ModelRef<'_>, &ModelRef<'_>) -> Option<FieldError> + Send + Sync>;

/// Per-element activation condition: element subtree, whole model.
pub(crate) type ElementCondition =
    Arc<dyn Fn(&ModelRef<'_>, &ModelRef<'_>) -> bool + Send + Sync>;

fn lift(check: ValueCheck) -> Predicate {
    Arc::new(move |value, _model| check(value))
}

fn lift_element(check: ValueCheck) -> ElementPredicate {
    Arc::new(move |value, _element, _model| check(value))
}

// ============================================================================
// COMPILED RULES
// ============================================================================

/// One synchronous rule bound to an absolute path.
pub(crate) struct SyncRule {
    pub(crate) path: FieldPath,
    pub(crate) predicate: Predicate,
    pub(crate) condition: Option<Condition>,
}

/// A rule template applied to one element-relative path.
pub(crate) struct ElementRule {
    pub(crate) rel_path: FieldPath,
    pub(crate) predicate: ElementPredicate,
    pub(crate) condition: Option<ElementCondition>,
}

/// Per-element rule templates registered under an array path. Instantiated
/// once per current element at every evaluation, so indices realign as the
/// array grows and shrinks.
pub(crate) struct ElementGroup {
    pub(crate) array_path: FieldPath,
    pub(crate) rules: Vec<ElementRule>,
}

/// The immutable output of a schema build, shared read-only across
/// evaluations.
pub(crate) struct SchemaRules {
    pub(crate) sync_rules: Vec<SyncRule>,
    pub(crate) element_groups: Vec<ElementGroup>,
    pub(crate) async_specs: IndexMap<FieldPath, AsyncSpec>,
}

impl std::fmt::Debug for SchemaRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRules").finish_non_exhaustive()
    }
}

// ============================================================================
// SHAPE CHECKING
// ============================================================================

/// Walks the initial model to decide whether a registration path exists.
/// Array indices are accepted whenever the value is an array (lengths vary
/// at runtime); descent continues through the first element when one is
/// present and is accepted unchecked otherwise.
fn path_in_shape(shape: &Value, path: &FieldPath) -> bool {
    let mut current = shape;
    for segment in path.segments() {
        match segment {
            Segment::Key(key) => match current.as_object().and_then(|obj| obj.get(key)) {
                Some(next) => current = next,
                None => return false,
            },
            Segment::Index(_) => match current.as_array() {
                Some(elements) => match elements.first() {
                    Some(next) => current = next,
                    None => return true,
                },
                None => return false,
            },
        }
    }
    true
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Registration surface for validation rules, mirroring the model's shape.
pub struct Schema<'shape> {
    shape: &'shape Value,
    pub(crate) sync_rules: Vec<SyncRule>,
    pub(crate) element_groups: Vec<ElementGroup>,
    pub(crate) async_rules: IndexMap<FieldPath, AsyncRule>,
    pub(crate) debounces: IndexMap<FieldPath, Duration>,
}

impl<'shape> Schema<'shape> {
    pub(crate) fn new(shape: &'shape Value) -> Self {
        Self {
            shape,
            sync_rules: Vec::new(),
            element_groups: Vec::new(),
            async_rules: IndexMap::new(),
            debounces: IndexMap::new(),
        }
    }

    /// Parses and shape-checks a registration path.
    fn resolve(&self, path: &str) -> Result<FieldPath, SchemaError> {
        let parsed = FieldPath::parse(path)?;
        if path_in_shape(self.shape, &parsed) {
            Ok(parsed)
        } else {
            Err(SchemaError::UnknownPath(parsed))
        }
    }

    fn push(&mut self, path: FieldPath, check: ValueCheck) {
        self.sync_rules.push(SyncRule {
            path,
            predicate: lift(check),
            condition: None,
        });
    }

    /// The field must be present (not null, not an empty string).
    pub fn required(&mut self, path: &str, message: &str) -> Result<(), SchemaError> {
        let path = self.resolve(path)?;
        self.push(path, rules::required(message.into()));
        Ok(())
    }

    /// The string field must have at least `min` characters.
    pub fn min_length(&mut self, path: &str, min: usize, message: &str) -> Result<(), SchemaError> {
        let path = self.resolve(path)?;
        self.push(path, rules::min_length(min, message.into()));
        Ok(())
    }

    /// The string field must have at most `max` characters.
    pub fn max_length(&mut self, path: &str, max: usize, message: &str) -> Result<(), SchemaError> {
        let path = self.resolve(path)?;
        self.push(path, rules::max_length(max, message.into()));
        Ok(())
    }

    /// The numeric field must be at least `min`.
    pub fn min(&mut self, path: &str, min: f64, message: &str) -> Result<(), SchemaError> {
        let path = self.resolve(path)?;
        self.push(path, rules::min(min, message.into()));
        Ok(())
    }

    /// The numeric field must be at most `max`.
    pub fn max(&mut self, path: &str, max: f64, message: &str) -> Result<(), SchemaError> {
        let path = self.resolve(path)?;
        self.push(path, rules::max(max, message.into()));
        Ok(())
    }

    /// The string field must match `pattern` (a regular expression).
    pub fn pattern(&mut self, path: &str, pattern: &str, message: &str) -> Result<(), SchemaError> {
        let path = self.resolve(path)?;
        let regex = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
            path: path.clone(),
            source,
        })?;
        self.push(path, rules::pattern(regex, message.into()));
        Ok(())
    }

    /// The string field must look like an email address.
    pub fn email(&mut self, path: &str, message: &str) -> Result<(), SchemaError> {
        let path = self.resolve(path)?;
        self.push(path, rules::email(message.into()));
        Ok(())
    }

    /// Arbitrary synchronous predicate with read access to the whole model,
    /// for cross-field checks.
    ///
    /// The accessor is read-only; predicates must not attempt to register
    /// rules or mutate anything.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use formic::{Form, FieldError, ModelStore};
    /// # use serde_json::json;
    /// # let store = ModelStore::new(json!({"password": "", "confirmPassword": ""}));
    /// let form = Form::new(store, |schema| {
    ///     schema.validate("confirmPassword", |value, model| {
    ///         if value.as_str() != model.str_at("password") {
    ///             Some(FieldError::custom("password_mismatch", "Passwords do not match"))
    ///         } else {
    ///             None
    ///         }
    ///     })?;
    ///     Ok(())
    /// }).unwrap();
    /// ```
    pub fn validate<F>(&mut self, path: &str, predicate: F) -> Result<(), SchemaError>
    where
        F: Fn(&Value, &ModelRef<'_>) -> Option<FieldError> + Send + Sync + 'static,
    {
        let path = self.resolve(path)?;
        self.sync_rules.push(SyncRule {
            path,
            predicate: Arc::new(predicate),
            condition: None,
        });
        Ok(())
    }

    /// Registers a group of rules on `path` that only apply while
    /// `condition(model)` is true. While false, the path carries zero
    /// errors regardless of its raw value — errors are cleared, not hidden.
    ///
    /// The condition is re-evaluated fresh on every model revision; there is
    /// no cached condition state.
    pub fn apply_when<C, G>(
        &mut self,
        path: &str,
        condition: C,
        group: G,
    ) -> Result<(), SchemaError>
    where
        C: Fn(&ModelRef<'_>) -> bool + Send + Sync + 'static,
        G: FnOnce(&mut RuleGroup) -> Result<(), SchemaError>,
    {
        let path = self.resolve(path)?;
        let mut collected = RuleGroup {
            path: path.clone(),
            rules: Vec::new(),
        };
        group(&mut collected)?;

        let condition: Condition = Arc::new(condition);
        for predicate in collected.rules {
            self.sync_rules.push(SyncRule {
                path: path.clone(),
                predicate,
                condition: Some(Arc::clone(&condition)),
            });
        }
        Ok(())
    }

    /// Registers rule templates applied to every element of the array at
    /// `array_path`, keyed by index. Templates are re-instantiated at each
    /// evaluation, so they follow additions and removals.
    ///
    /// Element rules may reference the element's own subtree (via relative
    /// paths) or the whole model (via the accessor), never sibling elements
    /// by position. Async rules cannot be registered per element.
    pub fn apply_each<G>(&mut self, array_path: &str, element: G) -> Result<(), SchemaError>
    where
        G: FnOnce(&mut ElementSchema) -> Result<(), SchemaError>,
    {
        let path = FieldPath::parse(array_path)?;
        let value = path
            .lookup(self.shape)
            .ok_or_else(|| SchemaError::UnknownPath(path.clone()))?;
        let elements = value
            .as_array()
            .ok_or_else(|| SchemaError::NotAnArray(path.clone()))?;

        let mut element_schema = ElementSchema {
            shape: elements.first().cloned(),
            array_path: path.clone(),
            rules: Vec::new(),
        };
        element(&mut element_schema)?;

        self.element_groups.push(ElementGroup {
            array_path: path,
            rules: element_schema.rules,
        });
        Ok(())
    }

    /// Registers a debounced asynchronous rule on `path`. At most one async
    /// rule per path; a second registration is a configuration error.
    pub fn validate_async(&mut self, path: &str, rule: AsyncRule) -> Result<(), SchemaError> {
        let path = self.resolve(path)?;
        if self.async_rules.contains_key(&path) {
            return Err(SchemaError::DuplicateAsyncRule(path));
        }
        self.async_rules.insert(path, rule);
        Ok(())
    }

    /// Sets the debounce interval for the async rule on `path`. May be
    /// registered before or after `validate_async`; a debounce with no
    /// matching async rule is a configuration error reported at build time.
    pub fn debounce(&mut self, path: &str, interval: Duration) -> Result<(), SchemaError> {
        let path = self.resolve(path)?;
        self.debounces.insert(path, interval);
        Ok(())
    }

    /// Seals the schema into the immutable rule set.
    pub(crate) fn finish(self) -> Result<SchemaRules, SchemaError> {
        for path in self.debounces.keys() {
            if !self.async_rules.contains_key(path) {
                return Err(SchemaError::DebounceWithoutAsync(path.clone()));
            }
        }
        let debounces = self.debounces;
        let async_specs = self
            .async_rules
            .into_iter()
            .map(|(path, rule)| {
                let debounce = debounces.get(&path).copied().unwrap_or(Duration::ZERO);
                (path, AsyncSpec { rule, debounce })
            })
            .collect::<IndexMap<_, _>>();

        debug!(
            sync_rules = self.sync_rules.len(),
            element_groups = self.element_groups.len(),
            async_rules = async_specs.len(),
            "schema sealed"
        );
        Ok(SchemaRules {
            sync_rules: self.sync_rules,
            element_groups: self.element_groups,
            async_specs,
        })
    }
}

// ============================================================================
// RULE GROUP (apply_when)
// ============================================================================

/// Collector for the rules inside an `apply_when` group. The target path is
/// fixed by the enclosing call.
pub struct RuleGroup {
    path: FieldPath,
    rules: Vec<Predicate>,
}

impl RuleGroup {
    /// See [`Schema::required`].
    pub fn required(&mut self, message: &str) -> Result<(), SchemaError> {
        self.rules.push(lift(rules::required(message.into())));
        Ok(())
    }

    /// See [`Schema::min_length`].
    pub fn min_length(&mut self, min: usize, message: &str) -> Result<(), SchemaError> {
        self.rules.push(lift(rules::min_length(min, message.into())));
        Ok(())
    }

    /// See [`Schema::max_length`].
    pub fn max_length(&mut self, max: usize, message: &str) -> Result<(), SchemaError> {
        self.rules.push(lift(rules::max_length(max, message.into())));
        Ok(())
    }

    /// See [`Schema::min`].
    pub fn min(&mut self, min: f64, message: &str) -> Result<(), SchemaError> {
        self.rules.push(lift(rules::min(min, message.into())));
        Ok(())
    }

    /// See [`Schema::max`].
    pub fn max(&mut self, max: f64, message: &str) -> Result<(), SchemaError> {
        self.rules.push(lift(rules::max(max, message.into())));
        Ok(())
    }

    /// See [`Schema::pattern`].
    pub fn pattern(&mut self, pattern: &str, message: &str) -> Result<(), SchemaError> {
        let regex = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
            path: self.path.clone(),
            source,
        })?;
        self.rules.push(lift(rules::pattern(regex, message.into())));
        Ok(())
    }

    /// See [`Schema::email`].
    pub fn email(&mut self, message: &str) -> Result<(), SchemaError> {
        self.rules.push(lift(rules::email(message.into())));
        Ok(())
    }

    /// See [`Schema::validate`].
    pub fn validate<F>(&mut self, predicate: F) -> Result<(), SchemaError>
    where
        F: Fn(&Value, &ModelRef<'_>) -> Option<FieldError> + Send + Sync + 'static,
    {
        self.rules.push(Arc::new(predicate));
        Ok(())
    }
}

// ============================================================================
// ELEMENT SCHEMA (apply_each)
// ============================================================================

/// Registration surface inside an `apply_each` call. Paths are relative to
/// one array element; conditions and `validate` predicates receive the
/// element subtree first and the whole model second.
pub struct ElementSchema {
    /// First element of the initial array, used as the shape to check
    /// relative paths against. `None` when the initial array is empty, in
    /// which case paths are accepted unchecked.
    shape: Option<Value>,
    array_path: FieldPath,
    rules: Vec<ElementRule>,
}

impl ElementSchema {
    fn resolve(&self, rel_path: &str) -> Result<FieldPath, SchemaError> {
        let parsed = FieldPath::parse(rel_path)?;
        match &self.shape {
            Some(shape) if !path_in_shape(shape, &parsed) => Err(SchemaError::UnknownPath(
                self.array_path.element(0).join(&parsed),
            )),
            _ => Ok(parsed),
        }
    }

    fn push(&mut self, rel_path: FieldPath, check: ValueCheck) {
        self.rules.push(ElementRule {
            rel_path,
            predicate: lift_element(check),
            condition: None,
        });
    }

    /// See [`Schema::required`].
    pub fn required(&mut self, rel_path: &str, message: &str) -> Result<(), SchemaError> {
        let rel_path = self.resolve(rel_path)?;
        self.push(rel_path, rules::required(message.into()));
        Ok(())
    }

    /// See [`Schema::min_length`].
    pub fn min_length(
        &mut self,
        rel_path: &str,
        min: usize,
        message: &str,
    ) -> Result<(), SchemaError> {
        let rel_path = self.resolve(rel_path)?;
        self.push(rel_path, rules::min_length(min, message.into()));
        Ok(())
    }

    /// See [`Schema::max_length`].
    pub fn max_length(
        &mut self,
        rel_path: &str,
        max: usize,
        message: &str,
    ) -> Result<(), SchemaError> {
        let rel_path = self.resolve(rel_path)?;
        self.push(rel_path, rules::max_length(max, message.into()));
        Ok(())
    }

    /// See [`Schema::min`].
    pub fn min(&mut self, rel_path: &str, min: f64, message: &str) -> Result<(), SchemaError> {
        let rel_path = self.resolve(rel_path)?;
        self.push(rel_path, rules::min(min, message.into()));
        Ok(())
    }

    /// See [`Schema::max`].
    pub fn max(&mut self, rel_path: &str, max: f64, message: &str) -> Result<(), SchemaError> {
        let rel_path = self.resolve(rel_path)?;
        self.push(rel_path, rules::max(max, message.into()));
        Ok(())
    }

    /// See [`Schema::pattern`].
    pub fn pattern(
        &mut self,
        rel_path: &str,
        pattern: &str,
        message: &str,
    ) -> Result<(), SchemaError> {
        let rel_path = self.resolve(rel_path)?;
        let regex = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
            path: self.array_path.element(0).join(&rel_path),
            source,
        })?;
        self.push(rel_path, rules::pattern(regex, message.into()));
        Ok(())
    }

    /// Cross-field predicate scoped to one element: receives the field
    /// value, the element subtree, and the whole model.
    pub fn validate<F>(&mut self, rel_path: &str, predicate: F) -> Result<(), SchemaError>
    where
        F: Fn(&Value, &ModelRef<'_>, &ModelRef<'_>) -> Option<FieldError> + Send + Sync + 'static,
    {
        let rel_path = self.resolve(rel_path)?;
        self.rules.push(ElementRule {
            rel_path,
            predicate: Arc::new(predicate),
            condition: None,
        });
        Ok(())
    }

    /// Conditional group scoped to one element. The condition receives the
    /// element subtree and the whole model.
    pub fn apply_when<C, G>(
        &mut self,
        rel_path: &str,
        condition: C,
        group: G,
    ) -> Result<(), SchemaError>
    where
        C: Fn(&ModelRef<'_>, &ModelRef<'_>) -> bool + Send + Sync + 'static,
        G: FnOnce(&mut RuleGroup) -> Result<(), SchemaError>,
    {
        let rel_path = self.resolve(rel_path)?;
        let mut collected = RuleGroup {
            path: self.array_path.element(0).join(&rel_path),
            rules: Vec::new(),
        };
        group(&mut collected)?;

        let condition: ElementCondition = Arc::new(condition);
        for predicate in collected.rules {
            let predicate: ElementPredicate =
                Arc::new(move |value, _element, model| predicate(value, model));
            self.rules.push(ElementRule {
                rel_path: rel_path.clone(),
                predicate,
                condition: Some(Arc::clone(&condition)),
            });
        }
        Ok(())
    }
}

// ============================================================================
// STANDARD TESTS
// ============================================================================
