//! A hotel-booking form exercising the declarative surface end to end:
//! conditional groups, per-element array rules that realign on insertion
//! and removal, cross-field checks, and submission gating.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use formic::prelude::*;
use serde_json::{Value, json};

fn empty_guest() -> Value {
    json!({"firstName": "", "isChild": false, "age": null})
}

fn booking_model() -> Value {
    json!({
        "checkIn": "",
        "checkOut": "",
        "includeParking": false,
        "licensePlate": "",
        "guests": [empty_guest()]
    })
}

fn booking_form() -> Form {
    Form::new(ModelStore::new(booking_model()), |schema| {
        schema.required("checkIn", "Check-in date is required")?;
        schema.required("checkOut", "Check-out date is required")?;
        // ISO dates compare lexicographically.
        schema.validate("checkOut", |value, model| {
            let check_out = value.as_str().filter(|s| !s.is_empty())?;
            let check_in = model.str_at("checkIn").filter(|s| !s.is_empty())?;
            (check_out <= check_in).then(|| {
                FieldError::custom("date_order", "Check-out must be after check-in")
            })
        })?;

        schema.apply_when(
            "licensePlate",
            |model| model.bool_at("includeParking") == Some(true),
            |plate| {
                plate.required("License plate is required for parking")?;
                plate.pattern("^[A-Z0-9-]+$", "Uppercase letters, digits and dashes only")
            },
        )?;

        schema.apply_each("guests", |guest| {
            guest.required("firstName", "First name is required")?;
            guest.min_length("firstName", 2, "Minimum 2 characters")?;
            guest.apply_when(
                "age",
                |element, _model| element.bool_at("isChild") == Some(true),
                |age| {
                    age.required("Age is required for children")?;
                    age.max(17.0, "Children must be 17 or younger")
                },
            )
        })?;
        Ok(())
    })
    .unwrap()
}

fn fill_valid(form: &Form) {
    form.set_field("checkIn", json!("2026-09-01"));
    form.set_field("checkOut", json!("2026-09-05"));
    form.set_field("guests[0].firstName", json!("Ada"));
}

#[test]
fn parking_rules_apply_only_while_parking_is_selected() {
    let form = booking_form();
    fill_valid(&form);
    assert!(form.valid(), "plate rules are inert without parking");

    form.set_field("includeParking", json!(true));
    assert!(form.field_state("licensePlate").has_kind("required"));

    form.set_field("licensePlate", json!("ab 123"));
    assert!(form.field_state("licensePlate").has_kind("pattern"));

    form.set_field("licensePlate", json!("AB-123"));
    assert!(form.valid());

    // Deselecting parking clears plate errors even with a bad value left
    // behind in the model.
    form.set_field("licensePlate", json!("ab 123"));
    form.set_field("includeParking", json!(false));
    assert!(form.field_state("licensePlate").is_valid());
    assert!(form.valid());
}

#[test]
fn check_out_must_follow_check_in() {
    let form = booking_form();
    fill_valid(&form);

    form.set_field("checkOut", json!("2026-08-30"));
    assert!(form.field_state("checkOut").has_kind("date_order"));

    // The check only fires once both dates are present.
    form.set_field("checkOut", json!(""));
    assert!(!form.field_state("checkOut").has_kind("date_order"));
    assert!(form.field_state("checkOut").has_kind("required"));
}

#[test]
fn added_guests_pick_up_element_rules_without_disturbing_others() {
    let form = booking_form();
    form.set_field("guests[0].firstName", json!("Ada"));
    assert!(form.field_state("guests[0].firstName").is_valid());

    form.update(|mut model| {
        model["guests"].as_array_mut().unwrap().push(empty_guest());
        model
    });

    assert!(form.field_state("guests[1].firstName").has_kind("required"));
    assert!(
        form.field_state("guests[0].firstName").is_valid(),
        "existing element states are unaffected by the addition"
    );

    form.set_field("guests[1].firstName", json!("G"));
    assert!(form.field_state("guests[1].firstName").has_kind("min_length"));

    form.set_field("guests[1].firstName", json!("Grace"));
    assert!(form.field_state("guests[1].firstName").is_valid());
}

#[test]
fn removing_a_guest_realigns_states_to_the_shifted_elements() {
    let form = booking_form();
    form.update(|mut model| {
        model["guests"] = json!([
            {"firstName": "Ada", "isChild": false, "age": null},
            {"firstName": "", "isChild": false, "age": null}
        ]);
        model
    });
    assert!(form.field_state("guests[0].firstName").is_valid());
    assert!(form.field_state("guests[1].firstName").has_kind("required"));

    // Dropping the first element shifts the invalid guest into index 0.
    form.update(|mut model| {
        model["guests"].as_array_mut().unwrap().remove(0);
        model
    });
    assert!(form.field_state("guests[0].firstName").has_kind("required"));
    // Index 1 no longer exists; its state entry is gone.
    assert_eq!(form.field_state("guests[1].firstName"), FieldState::default());
}

#[test]
fn child_age_rules_activate_per_element() {
    let form = booking_form();
    form.update(|mut model| {
        model["guests"] = json!([
            {"firstName": "Ada", "isChild": false, "age": null},
            {"firstName": "Tom", "isChild": true, "age": null}
        ]);
        model
    });

    assert!(form.field_state("guests[0].age").is_valid());
    assert!(form.field_state("guests[1].age").has_kind("required"));

    form.set_field("guests[1].age", json!(25));
    assert!(form.field_state("guests[1].age").has_kind("max"));
    assert_eq!(
        form.field_state("guests[1].age").message(),
        Some("Children must be 17 or younger")
    );

    form.set_field("guests[1].age", json!(8));
    assert!(form.field_state("guests[1].age").is_valid());

    form.set_field("guests[1].isChild", json!(false));
    form.set_field("guests[1].age", json!(null));
    assert!(form.field_state("guests[1].age").is_valid());
}

#[tokio::test]
async fn invalid_submission_is_blocked_and_touches_every_field() {
    let form = booking_form();
    let invoked = Arc::new(AtomicUsize::new(0));
    assert!(!form.field_state("checkIn").touched);

    let actions = Arc::clone(&invoked);
    let outcome = submit(&form, move |_model| {
        actions.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    })
    .await;

    let SubmitOutcome::ValidationFailed { errors } = outcome else {
        panic!("expected ValidationFailed");
    };
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
    assert!(errors.iter().any(|(path, error)| {
        path.to_string() == "checkIn" && error.kind().as_str() == "required"
    }));
    assert!(errors.iter().any(|(path, error)| {
        path.to_string() == "guests[0].firstName" && error.kind().as_str() == "required"
    }));

    // A failed submission activates error display everywhere.
    assert!(form.field_state("checkIn").touched);
    assert!(form.field_state("guests[0].firstName").touched);
}

#[tokio::test]
async fn valid_submission_hands_the_action_a_model_snapshot() {
    let form = booking_form();
    fill_valid(&form);
    let invoked = Arc::new(AtomicUsize::new(0));

    let actions = Arc::clone(&invoked);
    let outcome = submit(&form, move |model| {
        actions.fetch_add(1, Ordering::SeqCst);
        async move {
            assert_eq!(model["checkIn"], json!("2026-09-01"));
            assert_eq!(model["guests"][0]["firstName"], json!("Ada"));
            Ok(())
        }
    })
    .await;

    match outcome {
        SubmitOutcome::Success(model) => {
            assert_eq!(model, form.value());
        }
        other => panic!("expected Success, got {other:?}"),
    }
    assert_eq!(invoked.load(Ordering::SeqCst), 1);
}
