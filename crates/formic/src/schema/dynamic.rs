//! Data-driven forms: building a schema from a runtime-loaded definition
//!
//! A [`FormDefinition`] is a plain data structure (typically deserialized
//! from JSON) describing the fields of a form. Applying it iterates the
//! field table and registers the corresponding rules — a rule table built
//! from configuration, not reflective property access.
//!
//! # Examples
//!
//! ```rust
//! use formic::{Form, ModelStore, dynamic::{FormDefinition, initial_model}};
//! use serde_json::json;
//!
//! let definition: FormDefinition = serde_json::from_value(json!({
//!     "title": "Contact Form",
//!     "fields": [
//!         {"name": "firstName", "label": "First Name", "type": "text",
//!          "required": true, "minLength": 2},
//!         {"name": "email", "label": "Email Address", "type": "email",
//!          "required": true},
//!         {"name": "age", "label": "Age", "type": "number", "min": 18, "max": 120},
//!         {"name": "newsletter", "label": "Subscribe", "type": "checkbox"}
//!     ]
//! }))
//! .unwrap();
//!
//! let store = ModelStore::new(initial_model(&definition));
//! let form = Form::new(store, |schema| schema.apply_definition(&definition)).unwrap();
//! assert!(!form.valid()); // firstName and email are required
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::builder::Schema;
use crate::types::SchemaError;

/// Widget category of a dynamic field; decides the field's initial value
/// and which constraint rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Email,
    Textarea,
    Checkbox,
    Select,
}

/// One option of a select field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
}

/// Declarative description of one form field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub placeholder: Option<String>,
}

/// Declarative description of a whole form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefinition {
    pub title: String,
    pub fields: Vec<FieldDefinition>,
}

/// Builds the starting model for a definition: checkboxes start `false`,
/// numbers start `null`, everything else starts as the empty string.
#[must_use]
pub fn initial_model(definition: &FormDefinition) -> Value {
    let mut model = Map::new();
    for field in &definition.fields {
        let initial = match field.field_type {
            FieldType::Checkbox => Value::Bool(false),
            FieldType::Number => Value::Null,
            _ => Value::String(String::new()),
        };
        model.insert(field.name.clone(), initial);
    }
    Value::Object(model)
}

impl Schema<'_> {
    /// Registers the rules described by a [`FormDefinition`], one field at
    /// a time. The model must already contain the definition's fields —
    /// pair this with [`initial_model`].
    pub fn apply_definition(&mut self, definition: &FormDefinition) -> Result<(), SchemaError> {
        for field in &definition.fields {
            let path = field.name.as_str();
            if field.required {
                self.required(path, &format!("{} is required", field.label))?;
            }
            if let Some(min) = field.min_length {
                self.min_length(path, min, &format!("Minimum {min} characters"))?;
            }
            if let Some(max) = field.max_length {
                self.max_length(path, max, &format!("Maximum {max} characters"))?;
            }
            if let Some(min) = field.min {
                self.min(path, min, &format!("Minimum value is {min}"))?;
            }
            if let Some(max) = field.max {
                self.max(path, max, &format!("Maximum value is {max}"))?;
            }
            if field.field_type == FieldType::Email {
                self.email(path, "Please enter a valid email")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Form, ModelStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn contact_definition() -> FormDefinition {
        serde_json::from_value(json!({
            "title": "Contact Form",
            "fields": [
                {"name": "firstName", "label": "First Name", "type": "text",
                 "required": true, "minLength": 2, "placeholder": "Enter your first name"},
                {"name": "email", "label": "Email Address", "type": "email", "required": true},
                {"name": "age", "label": "Age", "type": "number", "min": 18.0, "max": 120.0},
                {"name": "department", "label": "Department", "type": "select", "required": true,
                 "options": [
                     {"value": "engineering", "label": "Engineering"},
                     {"value": "design", "label": "Design"}
                 ]},
                {"name": "bio", "label": "Bio", "type": "textarea", "maxLength": 500},
                {"name": "newsletter", "label": "Subscribe to newsletter", "type": "checkbox"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn initial_model_follows_field_types() {
        let model = initial_model(&contact_definition());
        assert_eq!(
            model,
            json!({
                "firstName": "",
                "email": "",
                "age": null,
                "department": "",
                "bio": "",
                "newsletter": false
            })
        );
    }

    #[test]
    fn definition_builds_a_working_rule_table() {
        let definition = contact_definition();
        let store = ModelStore::new(initial_model(&definition));
        let form = Form::new(store, |schema| schema.apply_definition(&definition)).unwrap();

        assert!(form.field_state("firstName").has_kind("required"));
        assert!(form.field_state("email").has_kind("required"));
        assert!(form.field_state("department").has_kind("required"));
        // Optional fields start clean.
        assert!(form.field_state("age").is_valid());
        assert!(form.field_state("bio").is_valid());

        form.set_field("firstName", json!("A"));
        assert!(form.field_state("firstName").has_kind("min_length"));
        assert_eq!(
            form.field_state("firstName").message(),
            Some("Minimum 2 characters")
        );

        form.set_field("firstName", json!("Ada"));
        form.set_field("email", json!("ada@lovelace.dev"));
        form.set_field("department", json!("engineering"));
        form.set_field("age", json!(17));
        assert!(form.field_state("age").has_kind("min"));

        form.set_field("age", json!(36));
        assert!(form.valid());
    }

    #[test]
    fn definition_round_trips_through_json() {
        let definition = contact_definition();
        let json = serde_json::to_value(&definition).unwrap();
        let back: FormDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back.fields.len(), definition.fields.len());
        assert_eq!(back.fields[0].min_length, Some(2));
        assert_eq!(back.fields[3].options.len(), 2);
    }
}
