//! The field-cleaning half of form validation.
//!
//! Errors accumulate across fields rather than stopping at the first one,
//! so a re-rendered form reports every problem at once. The form-level
//! `clean` hook runs afterwards (see [`Form::is_valid`](crate::Form::is_valid)).

use std::collections::HashMap;

use django_async_db::Value;

use crate::fields::{clean_field_value, FormFieldDef};

/// The key under which form-level errors are stored.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Cleans every field in `field_defs` from `raw_data`.
///
/// Disabled fields skip validation and take the form's initial value, or
/// the field's own when the form has none.
pub fn clean_fields(
    field_defs: &[FormFieldDef],
    raw_data: &HashMap<String, Option<String>>,
    initial: &HashMap<String, Value>,
    cleaned_data: &mut HashMap<String, Value>,
    errors: &mut HashMap<String, Vec<String>>,
) {
    for field in field_defs {
        if field.disabled {
            let value = initial
                .get(&field.name)
                .or(field.initial.as_ref())
                .cloned()
                .unwrap_or(Value::Null);
            cleaned_data.insert(field.name.clone(), value);
            continue;
        }

        let raw = raw_data.get(&field.name).and_then(|v| v.as_deref());
        match clean_field_value(field, raw) {
            Ok(value) => {
                cleaned_data.insert(field.name.clone(), value);
            }
            Err(field_errors) => {
                errors.insert(field.name.clone(), field_errors);
            }
        }
    }
}

/// Merges form-level errors into `errors`, dropping the failing fields from
/// `cleaned_data` the way `add_error` does.
pub fn merge_errors(
    form_errors: HashMap<String, Vec<String>>,
    cleaned_data: &mut HashMap<String, Value>,
    errors: &mut HashMap<String, Vec<String>>,
) {
    for (key, msgs) in form_errors {
        cleaned_data.remove(&key);
        errors.entry(key).or_default().extend(msgs);
    }
}
