//! Formic — a reactive, declarative form-validation engine
//!
//! Derives dynamic validity and error state from a structured model plus a
//! declaratively registered rule set: conditional rule activation,
//! array-element rules, cross-field checks, and debounced asynchronous
//! checks with last-request-wins supersession. No UI, no transport — the
//! engine is driven by external events and calls out only to opaque,
//! caller-supplied async check functions.
//!
//! # Architecture
//!
//! - [`ModelStore`] — pure custody of the model value (`serde_json::Value`),
//!   one revision per mutation.
//! - [`Schema`] — build-time rule registration against field paths, checked
//!   against the initial model shape.
//! - The evaluator — rebuilds every field's state synchronously on each
//!   revision; conditions are re-evaluated fresh, so deactivated rule
//!   groups shed their errors instead of hiding them.
//! - The async coordinator — per-field debounce/in-flight state machine;
//!   superseded results are discarded unobserved.
//! - [`submit`] — gates a caller action on aggregate validity.
//!
//! # Example
//!
//! ```rust
//! use formic::{FieldError, Form, ModelStore};
//! use serde_json::json;
//!
//! let store = ModelStore::new(json!({
//!     "password": "",
//!     "confirmPassword": "",
//!     "includeBreakfast": false,
//!     "breakfastCount": null
//! }));
//!
//! let form = Form::new(store, |schema| {
//!     schema.required("password", "Password is required")?;
//!     schema.min_length("password", 8, "Minimum 8 characters")?;
//!     schema.validate("confirmPassword", |value, model| {
//!         if value.as_str() != model.str_at("password") {
//!             Some(FieldError::custom("password_mismatch", "Passwords do not match"))
//!         } else {
//!             None
//!         }
//!     })?;
//!     schema.apply_when(
//!         "breakfastCount",
//!         |model| model.bool_at("includeBreakfast") == Some(true),
//!         |count| {
//!             count.required("Breakfast count is required")?;
//!             count.min(1.0, "At least 1 breakfast")
//!         },
//!     )?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! form.set_field("password", json!("hunter2hunter2"));
//! form.set_field("confirmPassword", json!("hunter2hunter2"));
//! assert!(form.valid());
//!
//! form.set_field("includeBreakfast", json!(true));
//! assert!(form.field_state("breakfastCount").has_kind("required"));
//! ```

pub mod coordinator;
pub mod schema;
pub mod store;
pub mod sync;
pub mod types;

mod eval;
mod form;
mod submit;

pub use coordinator::AsyncRule;
pub use form::Form;
pub use schema::dynamic;
pub use schema::{ElementSchema, RuleGroup, Schema};
pub use store::ModelStore;
pub use submit::submit;
pub use sync::StoreBinding;
pub use types::{
    ActionError, CheckError, ErrorKind, FieldError, FieldPath, FieldState, ModelRef,
    PathParseError, SchemaError, Segment, SubmitOutcome,
};

/// Convenience re-exports for the common surface.
pub mod prelude {
    pub use crate::{
        ActionError, AsyncRule, CheckError, ErrorKind, FieldError, FieldPath, FieldState, Form,
        ModelRef, ModelStore, SchemaError, StoreBinding, SubmitOutcome, submit,
    };
}

// ============================================================================
// END-TO-END SCENARIOS
// ============================================================================
