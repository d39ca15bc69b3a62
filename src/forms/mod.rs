//! Form definitions and field-level validation.
//!
//! Shape rules (lengths, email, equality) are declared with `validator`
//! derives. Rules that need the credential store or an uploaded file are
//! checked by each form. Failures never abort a request: they come back as
//! [`FieldErrors`] and the handler re-renders the form.

pub mod log_in;
pub mod post;
pub mod sign_up;

use std::collections::BTreeMap;

use validator::ValidationErrors;

pub use log_in::LogInForm;
pub use post::{PostForm, Upload};
pub use sign_up::SignUpForm;

pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Blank required fields report only the "required" message, like a
    /// validator chain that stops at its first failure.
    pub fn require(&mut self, fields: &[(&str, &str)]) {
        for (name, value) in fields {
            if value.trim().is_empty() {
                self.0
                    .insert(name.to_string(), vec![REQUIRED_MESSAGE.to_string()]);
            }
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, failures) in errors.field_errors() {
            for failure in failures {
                let message = failure
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| failure.code.to_string());
                out.add(field, message);
            }
        }
        out
    }
}

/// Run the derived rules, collecting failures instead of returning early.
pub(crate) fn shape_errors<T: validator::Validate>(form: &T) -> FieldErrors {
    match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(errors) => errors.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_lookup_is_empty_slice() {
        let errors = FieldErrors::new();
        assert!(errors.get("title").is_empty());
        assert!(!errors.has("title"));
    }

    #[test]
    fn required_replaces_other_messages() {
        let mut errors = FieldErrors::new();
        errors.add("username", "Field must be between 2 and 20 characters long.");
        errors.require(&[("username", "   "), ("email", "a@x.com")]);

        assert_eq!(errors.get("username"), [REQUIRED_MESSAGE.to_string()]);
        assert!(!errors.has("email"));
    }
}
