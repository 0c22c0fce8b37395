//! Built-in single-field checks
//!
//! Each factory returns a pure predicate over one field's value. Following
//! the usual form-validation convention, every check except `required`
//! passes on absent/empty values so that optionality stays the business of
//! `required` alone. String lengths count Unicode scalar values.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::types::{ErrorKind, FieldError};

/// Predicate over a single field value.
pub(crate) type ValueCheck = Arc<dyn Fn(&Value) -> Option<FieldError> + Send + Sync>;

/// Loose email shape check: something, an `@`, a domain with a dot.
static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Value must be present: not null and not an empty string.
pub(crate) fn required(message: String) -> ValueCheck {
    Arc::new(move |value| {
        is_blank(value).then(|| FieldError::new(ErrorKind::Required, &message))
    })
}

/// String must have at least `min` characters. Empty values pass.
pub(crate) fn min_length(min: usize, message: String) -> ValueCheck {
    Arc::new(move |value| match value.as_str() {
        Some(s) if !s.is_empty() && s.chars().count() < min => {
            Some(FieldError::new(ErrorKind::MinLength, &message))
        }
        _ => None,
    })
}

/// String must have at most `max` characters.
pub(crate) fn max_length(max: usize, message: String) -> ValueCheck {
    Arc::new(move |value| match value.as_str() {
        Some(s) if s.chars().count() > max => {
            Some(FieldError::new(ErrorKind::MaxLength, &message))
        }
        _ => None,
    })
}

/// Number must be at least `min`. Non-numbers pass.
pub(crate) fn min(min: f64, message: String) -> ValueCheck {
    Arc::new(move |value| match value.as_f64() {
        Some(n) if n < min => Some(FieldError::new(ErrorKind::Min, &message)),
        _ => None,
    })
}

/// Number must be at most `max`. Non-numbers pass.
pub(crate) fn max(max: f64, message: String) -> ValueCheck {
    Arc::new(move |value| match value.as_f64() {
        Some(n) if n > max => Some(FieldError::new(ErrorKind::Max, &message)),
        _ => None,
    })
}

/// String must match the compiled pattern. Empty values pass.
pub(crate) fn pattern(regex: Regex, message: String) -> ValueCheck {
    Arc::new(move |value| match value.as_str() {
        Some(s) if !s.is_empty() && !regex.is_match(s) => {
            Some(FieldError::new(ErrorKind::Pattern, &message))
        }
        _ => None,
    })
}

/// String must look like an email address. Empty values pass.
pub(crate) fn email(message: String) -> ValueCheck {
    Arc::new(move |value| match value.as_str() {
        Some(s) if !s.is_empty() && !EMAIL_SHAPE.is_match(s) => {
            Some(FieldError::new(ErrorKind::Email, &message))
        }
        _ => None,
    })
}
