use serde::Deserialize;
use validator::Validate;

use crate::auth::csrf::Csrf;
use crate::db::{CredentialStore, RepositoryError};
use crate::forms::{shape_errors, FieldErrors};

pub const USERNAME_TAKEN: &str = "That username is taken. Please choose a different one.";
pub const EMAIL_TAKEN: &str = "That email address is taken. Please choose a different one.";

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct SignUpForm {
    #[validate(length(
        min = 2,
        max = 30,
        message = "Field must be between 2 and 30 characters long."
    ))]
    pub first_name: String,

    #[validate(length(
        min = 2,
        max = 30,
        message = "Field must be between 2 and 30 characters long."
    ))]
    pub last_name: String,

    #[validate(length(
        min = 2,
        max = 20,
        message = "Field must be between 2 and 20 characters long."
    ))]
    pub username: String,

    #[validate(email(message = "Invalid email address."))]
    pub email: String,

    #[validate(length(max = 20, message = "Field cannot be longer than 20 characters."))]
    pub phone: String,

    pub password: String,

    #[validate(must_match(other = "password", message = "Field must be equal to password."))]
    pub confirm_password: String,

    pub csrf_token: String,
}

impl SignUpForm {
    /// Trim identity fields; passwords are taken verbatim.
    pub fn normalized(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self.phone = self.phone.trim().to_string();
        self
    }

    /// Shape rules and the CSRF token, no store access.
    pub fn check_fields(&self, csrf: &Csrf) -> FieldErrors {
        let mut errors = shape_errors(self);
        errors.require(&[
            ("first_name", self.first_name.as_str()),
            ("last_name", self.last_name.as_str()),
            ("username", self.username.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
            ("password", self.password.as_str()),
            ("confirm_password", self.confirm_password.as_str()),
        ]);
        csrf.check(&self.csrf_token, &mut errors);
        errors
    }

    /// Full validation including username and email uniqueness.
    pub async fn validate_with(
        &self,
        users: &dyn CredentialStore,
        csrf: &Csrf,
    ) -> Result<FieldErrors, RepositoryError> {
        let mut errors = self.check_fields(csrf);

        if !errors.has("username") && users.find_by_username(&self.username).await?.is_some() {
            errors.add("username", USERNAME_TAKEN);
        }
        if !errors.has("email") && users.find_by_email(&self.email).await?.is_some() {
            errors.add("email", EMAIL_TAKEN);
        }

        Ok(errors)
    }
}
