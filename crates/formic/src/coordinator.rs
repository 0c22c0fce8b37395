//! Async validation coordinator
//!
//! Runs the per-field state machine for debounced asynchronous checks:
//!
//! ```text
//! Idle ──params──▶ Debouncing ──interval elapses──▶ InFlight ──▶ Resolved
//!   ▲                  │ params change: timer restarts
//!   └──params skip─────┘ (a pending check never reaches the check fn)
//! ```
//!
//! Supersession is last-request-wins: every (re)schedule bumps a generation
//! counter, and a task only commits its result while its generation is still
//! current. A superseded check's eventual result is dropped silently — stale
//! results are unobservable. In-flight checks are not forcibly aborted;
//! timeouts are the check function's own concern.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, trace};

use crate::eval;
use crate::form::FormInner;
use crate::types::{CheckError, FieldError, FieldPath, ModelRef};

// ============================================================================
// ASYNC RULE
// ============================================================================

type ParamsFn = Arc<dyn Fn(&ModelRef<'_>) -> Option<Value> + Send + Sync>;
type CheckFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, CheckError>> + Send + Sync>;
type OnSuccess = Arc<dyn Fn(&Value) -> Option<FieldError> + Send + Sync>;
type OnError = Arc<dyn Fn(&CheckError) -> FieldError + Send + Sync>;

/// A debounced asynchronous rule.
///
/// `params` derives the check's input from the model; returning `None`
/// skips the check entirely (the field then carries no async error). The
/// check function is opaque to the engine — only its success value or
/// failure is inspected, via `on_success` / `on_error`.
///
/// # Examples
///
/// ```rust
/// use formic::{AsyncRule, CheckError, FieldError, ModelRef};
/// use serde_json::{Value, json};
///
/// let rule = AsyncRule::new(
///     |model: &ModelRef<'_>| {
///         // Skip until the value would pass the sync rules anyway.
///         let username = model.str_at("username")?;
///         (username.chars().count() >= 3).then(|| json!(username))
///     },
///     |params: Value| async move {
///         // A real caller would do a network lookup here.
///         Ok::<_, CheckError>(json!(params.as_str() != Some("admin")))
///     },
/// )
/// .on_success(|available| {
///     (available.as_bool() == Some(false))
///         .then(|| FieldError::custom("username_taken", "This username is already taken"))
/// })
/// .on_error(|_| FieldError::custom("server_error", "Could not check username availability"));
/// ```
#[derive(Clone)]
pub struct AsyncRule {
    pub(crate) params: ParamsFn,
    pub(crate) check: CheckFn,
    pub(crate) on_success: OnSuccess,
    pub(crate) on_error: OnError,
}

impl AsyncRule {
    /// Creates an async rule from a params derivation and a check function.
    ///
    /// Defaults: `on_success` maps every success to "no error"; `on_error`
    /// maps failures to a `server_error` field error carrying the failure
    /// message.
    pub fn new<P, C, F>(params: P, check: C) -> Self
    where
        P: Fn(&ModelRef<'_>) -> Option<Value> + Send + Sync + 'static,
        C: Fn(Value) -> F + Send + Sync + 'static,
        F: Future<Output = Result<Value, CheckError>> + Send + 'static,
    {
        Self {
            params: Arc::new(params),
            check: Arc::new(move |p| check(p).boxed()),
            on_success: Arc::new(|_| None),
            on_error: Arc::new(|err| FieldError::custom("server_error", err.to_string())),
        }
    }

    /// Maps the check's success value to an error-or-none.
    #[must_use]
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Option<FieldError> + Send + Sync + 'static,
    {
        self.on_success = Arc::new(f);
        self
    }

    /// Maps a check failure to a field error.
    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&CheckError) -> FieldError + Send + Sync + 'static,
    {
        self.on_error = Arc::new(f);
        self
    }
}

impl fmt::Debug for AsyncRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRule").finish_non_exhaustive()
    }
}

/// An async rule together with its debounce interval.
#[derive(Debug, Clone)]
pub(crate) struct AsyncSpec {
    pub(crate) rule: AsyncRule,
    pub(crate) debounce: Duration,
}

// ============================================================================
// PER-FIELD STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AsyncStatus {
    Idle,
    Debouncing,
    InFlight,
    Resolved,
}

/// Runtime state of one async-validated field.
#[derive(Debug)]
pub(crate) struct AsyncField {
    pub(crate) spec: AsyncSpec,
    pub(crate) status: AsyncStatus,
    /// Bumped on every (re)schedule and skip; a spawned task only acts
    /// while its generation is current.
    pub(crate) generation: u64,
    /// Params of the most recently scheduled check; `None` after a skip.
    pub(crate) last_params: Option<Value>,
    /// Error from the last committed result.
    pub(crate) error: Option<FieldError>,
}

impl AsyncField {
    pub(crate) fn new(spec: AsyncSpec) -> Self {
        Self {
            spec,
            status: AsyncStatus::Idle,
            generation: 0,
            last_params: None,
            error: None,
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(self.status, AsyncStatus::Debouncing | AsyncStatus::InFlight)
    }

    /// Invalidates any outstanding work and clears resolved state.
    pub(crate) fn reset(&mut self) {
        self.generation += 1;
        self.status = AsyncStatus::Idle;
        self.last_params = None;
        self.error = None;
    }
}

// ============================================================================
// SCHEDULING
// ============================================================================

/// Re-derives params for every async field against the current model and
/// starts, restarts, or cancels debounce cycles accordingly. Called under
/// the engine lock on every model revision, before the synchronous
/// recompute.
pub(crate) fn schedule(inner: &Arc<FormInner>, state: &mut crate::form::EngineState) {
    let model = state.store.snapshot();
    let model_ref = ModelRef::new(&model);

    for (path, field) in &mut state.async_fields {
        let params = (field.spec.rule.params)(&model_ref);
        match params {
            None => {
                if field.last_params.is_some()
                    || field.error.is_some()
                    || field.status != AsyncStatus::Idle
                {
                    trace!(path = %path, "async check skipped; outstanding work invalidated");
                    field.reset();
                }
            }
            Some(params) => {
                if field.last_params.as_ref() == Some(&params) {
                    // Unrelated model change; the current cycle stands.
                    continue;
                }
                field.generation += 1;
                field.last_params = Some(params.clone());
                field.error = None;
                field.status = AsyncStatus::Debouncing;
                debug!(
                    path = %path,
                    generation = field.generation,
                    debounce_ms = field.spec.debounce.as_millis() as u64,
                    "async check debouncing"
                );
                spawn_check(
                    inner,
                    path.clone(),
                    field.spec.rule.clone(),
                    field.spec.debounce,
                    field.generation,
                    params,
                );
            }
        }
    }
}

/// One debounce-then-check cycle. The task re-checks its generation after
/// the debounce sleep and again when the check resolves; a stale generation
/// means it was superseded and it exits without touching field state.
fn spawn_check(
    inner: &Arc<FormInner>,
    path: FieldPath,
    rule: AsyncRule,
    debounce: Duration,
    generation: u64,
    params: Value,
) {
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::time::sleep(debounce).await;

        let check_future = {
            let mut state = inner.state.lock();
            let Some(field) = state.async_fields.get_mut(&path) else {
                return;
            };
            if field.generation != generation {
                trace!(path = %path, generation, "debounce cycle superseded before dispatch");
                drop(state);
                inner.notify.notify_waiters();
                return;
            }
            field.status = AsyncStatus::InFlight;
            debug!(path = %path, generation, "async check dispatched");
            (rule.check)(params)
        };

        let result = check_future.await;

        {
            let mut state = inner.state.lock();
            if let Some(field) = state.async_fields.get_mut(&path) {
                if field.generation == generation {
                    field.error = match &result {
                        Ok(value) => (rule.on_success)(value),
                        Err(err) => Some((rule.on_error)(err)),
                    };
                    field.status = AsyncStatus::Resolved;
                    debug!(
                        path = %path,
                        generation,
                        error = field.error.is_some(),
                        "async check resolved"
                    );
                    eval::recompute(&mut state);
                } else {
                    trace!(path = %path, generation, "stale async result discarded");
                }
            }
        }
        inner.notify.notify_waiters();
    });
}
