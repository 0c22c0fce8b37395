//! Debounced async validation: dispatch counting, supersession, skip
//! semantics, pending propagation, and submit gating.
//!
//! All timing runs on tokio's paused clock, so debounce windows are
//! advanced explicitly and the tests are fully deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use formic::prelude::*;
use parking_lot::Mutex;
use serde_json::{Value, json};

/// Yields a few times so freshly spawned coordinator tasks reach their next
/// await point.
async fn drain() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

/// A username form whose async check counts dispatches and records the
/// params it was called with.
fn username_form(
    debounce: Duration,
) -> (Form, Arc<AtomicUsize>, Arc<Mutex<Vec<String>>>) {
    let dispatches = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (count, record) = (Arc::clone(&dispatches), Arc::clone(&seen));

    let store = ModelStore::new(json!({"username": ""}));
    let form = Form::new(store, |schema| {
        schema.debounce("username", debounce)?;
        schema.validate_async(
            "username",
            AsyncRule::new(
                |model: &ModelRef<'_>| {
                    let username = model.str_at("username")?;
                    (!username.is_empty()).then(|| json!(username))
                },
                move |params: Value| {
                    count.fetch_add(1, Ordering::SeqCst);
                    record.lock().push(params.as_str().unwrap_or("").to_owned());
                    async move { Ok::<_, CheckError>(json!(params.as_str() != Some("taken"))) }
                },
            )
            .on_success(|available| {
                (available.as_bool() == Some(false))
                    .then(|| FieldError::custom("username_taken", "This username is already taken"))
            }),
        )?;
        Ok(())
    })
    .unwrap();
    (form, dispatches, seen)
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn rapid_changes_within_the_debounce_window_dispatch_once() {
    let (form, dispatches, seen) = username_form(Duration::from_millis(300));

    form.set_field("username", json!("a"));
    drain().await;
    tokio::time::advance(Duration::from_millis(100)).await;

    form.set_field("username", json!("ad"));
    drain().await;
    tokio::time::advance(Duration::from_millis(100)).await;

    form.set_field("username", json!("ada"));
    drain().await;

    assert!(form.pending(), "debouncing counts as pending");
    form.settle().await;

    assert_eq!(dispatches.load(Ordering::SeqCst), 1);
    assert_eq!(seen.lock().as_slice(), ["ada"]);
    assert!(!form.pending());
    assert!(form.valid());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn resolved_error_applies_and_clears_on_next_value() {
    let (form, _, _) = username_form(Duration::from_millis(300));

    form.set_field("username", json!("taken"));
    form.settle().await;
    assert!(form.field_state("username").has_kind("username_taken"));
    assert!(!form.valid());

    form.set_field("username", json!("free"));
    // A fresh cycle clears the stale error immediately.
    assert!(!form.field_state("username").has_kind("username_taken"));
    form.settle().await;
    assert!(form.valid());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn unrelated_model_changes_do_not_restart_the_cycle() {
    let store = ModelStore::new(json!({"username": "", "bio": ""}));
    let dispatches = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&dispatches);

    let form = Form::new(store, |schema| {
        schema.validate_async(
            "username",
            AsyncRule::new(
                |model: &ModelRef<'_>| {
                    let username = model.str_at("username")?;
                    (!username.is_empty()).then(|| json!(username))
                },
                move |_params| {
                    count.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, CheckError>(json!(true)) }
                },
            ),
        )?;
        Ok(())
    })
    .unwrap();

    form.set_field("username", json!("ada"));
    form.settle().await;
    assert_eq!(dispatches.load(Ordering::SeqCst), 1);

    // Params derived from the model are unchanged; the cycle stands.
    form.set_field("bio", json!("mathematician"));
    form.settle().await;
    assert_eq!(dispatches.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn a_superseding_check_wins_even_if_the_first_resolves_later() {
    let store = ModelStore::new(json!({"code": ""}));
    let form = Form::new(store, |schema| {
        schema.validate_async(
            "code",
            AsyncRule::new(
                |model: &ModelRef<'_>| {
                    let code = model.str_at("code")?;
                    (!code.is_empty()).then(|| json!(code))
                },
                |params: Value| async move {
                    let code = params.as_str().unwrap_or("").to_owned();
                    // The first request takes much longer than its
                    // successor, resolving after it.
                    let delay = if code == "first" { 500 } else { 100 };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok::<_, CheckError>(json!(code))
                },
            )
            .on_success(|checked| {
                Some(FieldError::custom(
                    "checked",
                    format!("checked:{}", checked.as_str().unwrap_or("")),
                ))
            }),
        )?;
        Ok(())
    })
    .unwrap();

    form.set_field("code", json!("first"));
    drain().await; // first check is now in flight

    form.set_field("code", json!("second"));
    form.settle().await;

    // Only the most recent request's result was committed; the first
    // check's eventual result was discarded unobserved.
    let state = form.field_state("code");
    assert_eq!(state.message(), Some("checked:second"));
    assert_eq!(state.errors.len(), 1);
    assert!(!form.pending());

    // Let the first check's timer fire as well; nothing may change.
    tokio::time::advance(Duration::from_millis(500)).await;
    drain().await;
    assert_eq!(form.field_state("code").message(), Some("checked:second"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn skip_params_suppress_the_check_and_clear_async_errors() {
    let (form, dispatches, _) = username_form(Duration::from_millis(300));

    form.set_field("username", json!("taken"));
    form.settle().await;
    assert!(form.field_state("username").has_kind("username_taken"));

    // Back to empty: params derive to skip. No dispatch, no pending, and
    // the async error is gone without waiting for anything.
    form.set_field("username", json!(""));
    assert!(!form.pending());
    assert!(form.field_state("username").is_valid());
    assert!(form.valid());

    form.settle().await;
    assert_eq!(dispatches.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn check_failures_map_through_on_error() {
    let store = ModelStore::new(json!({"email": ""}));
    let form = Form::new(store, |schema| {
        schema.validate_async(
            "email",
            AsyncRule::new(
                |model: &ModelRef<'_>| {
                    let email = model.str_at("email")?;
                    email.contains('@').then(|| json!(email))
                },
                |_params| async { Err(CheckError::new("connection refused")) },
            )
            .on_error(|_| {
                FieldError::custom("server_error", "Could not check email availability")
            }),
        )?;
        Ok(())
    })
    .unwrap();

    form.set_field("email", json!("ada@lovelace.dev"));
    form.settle().await;

    let state = form.field_state("email");
    assert!(state.has_kind("server_error"));
    assert_eq!(state.message(), Some("Could not check email availability"));
    assert!(!form.valid());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn pending_propagates_to_descendant_fields() {
    let store = ModelStore::new(json!({"profile": {"username": "", "bio": ""}}));
    let form = Form::new(store, |schema| {
        schema.required("profile.username", "Username is required")?;
        schema.debounce("profile", Duration::from_millis(200))?;
        schema.validate_async(
            "profile",
            AsyncRule::new(
                |model: &ModelRef<'_>| {
                    let username = model.str_at("profile.username")?;
                    if username.is_empty() {
                        return None;
                    }
                    model.get("profile").cloned()
                },
                |_params| async { Ok::<_, CheckError>(json!(true)) },
            ),
        )?;
        Ok(())
    })
    .unwrap();

    form.set_field("profile.username", json!("ada"));
    drain().await;

    assert!(form.pending());
    assert!(form.field_state("profile").pending);
    assert!(
        form.field_state("profile.username").pending,
        "a field is pending while an ancestor's check is outstanding"
    );

    form.settle().await;
    assert!(!form.field_state("profile.username").pending);
    assert!(form.valid());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn submit_rejects_while_validation_is_pending() {
    let (form, _, _) = username_form(Duration::from_millis(300));
    let invoked = Arc::new(AtomicUsize::new(0));

    form.set_field("username", json!("ada"));
    let actions = Arc::clone(&invoked);
    let outcome = submit(&form, move |_model| {
        actions.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    })
    .await;

    assert!(matches!(outcome, SubmitOutcome::Pending));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);

    // Settling first is the documented wait-then-submit recipe.
    form.settle().await;
    let actions = Arc::clone(&invoked);
    let outcome = submit(&form, move |model| {
        actions.fetch_add(1, Ordering::SeqCst);
        async move {
            assert_eq!(model["username"], json!("ada"));
            Ok(())
        }
    })
    .await;

    assert!(outcome.is_success());
    assert_eq!(invoked.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_actions_surface_distinctly_and_leave_the_model_alone() {
    let store = ModelStore::new(json!({"name": "Ada"}));
    let form = Form::new(store, |schema| {
        schema.required("name", "Name is required")?;
        Ok(())
    })
    .unwrap();

    let before = form.value();
    let outcome = submit(&form, |_model| async {
        Err(ActionError::new("backend unavailable"))
    })
    .await;

    match outcome {
        SubmitOutcome::ActionFailed(error) => {
            assert_eq!(error.message(), "backend unavailable");
        }
        other => panic!("expected ActionFailed, got {other:?}"),
    }
    assert_eq!(form.value(), before);
}
