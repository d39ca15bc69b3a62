use serde::Deserialize;
use validator::Validate;

use crate::auth::csrf::Csrf;
use crate::forms::{shape_errors, FieldErrors};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LogInForm {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,

    pub password: String,

    /// Checkbox: present (usually "on") when ticked, absent otherwise.
    pub remember: Option<String>,

    pub csrf_token: String,
}

impl LogInForm {
    /// Trim the email before it is validated or looked up.
    pub fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_string();
        self
    }

    pub fn remember_me(&self) -> bool {
        self.remember.is_some()
    }

    pub fn check_fields(&self, csrf: &Csrf) -> FieldErrors {
        let mut errors = shape_errors(self);
        errors.require(&[
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
        ]);
        csrf.check(&self.csrf_token, &mut errors);
        errors
    }
}
