//! Form checks run before any auth request leaves the client.

use std::{collections::BTreeMap, fmt, sync::LazyLock};

use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PHONE_LEN: usize = 10;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"));

/// Field name to message. Empty means the form is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default)]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.is_empty() {
        errors.insert("email", "email is required");
    } else if !is_valid_email(email) {
        errors.insert("email", "email is malformed");
    }
}

fn check_password(errors: &mut FieldErrors, field: &'static str, password: &str) {
    if password.is_empty() {
        errors.insert(field, "password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(
            field,
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
}

fn check_name(errors: &mut FieldErrors, field: &'static str, value: &str) {
    if value.is_empty() {
        errors.insert(field, "required");
    } else if value.chars().count() < MIN_NAME_LEN {
        errors.insert(field, format!("must be at least {MIN_NAME_LEN} characters"));
    }
}

fn check_phone(errors: &mut FieldErrors, phone: &str) {
    if !phone.is_empty() && phone.chars().count() < MIN_PHONE_LEN {
        errors.insert(
            "phone",
            format!("phone must be at least {MIN_PHONE_LEN} characters"),
        );
    }
}

pub fn validate_login(email: &str, password: &str) -> FieldErrors {
    let mut errors = FieldErrors::default();
    check_email(&mut errors, email);
    check_password(&mut errors, "password", password);
    errors
}

pub fn validate_registration(form: &RegisterForm) -> FieldErrors {
    let mut errors = FieldErrors::default();
    check_email(&mut errors, &form.email);
    check_password(&mut errors, "password", &form.password);
    if form.confirm_password.is_empty() {
        errors.insert("confirm_password", "confirmation is required");
    } else if form.password != form.confirm_password {
        errors.insert("confirm_password", "passwords do not match");
    }
    check_name(&mut errors, "first_name", &form.first_name);
    check_name(&mut errors, "last_name", &form.last_name);
    check_phone(&mut errors, &form.phone);
    errors
}

pub fn validate_profile(form: &ProfileForm) -> FieldErrors {
    let mut errors = FieldErrors::default();
    if form.first_name.trim().is_empty() {
        errors.insert("first_name", "required");
    }
    if form.last_name.trim().is_empty() {
        errors.insert("last_name", "required");
    }
    errors
}

pub fn validate_password_change(form: &PasswordChangeForm) -> FieldErrors {
    let mut errors = FieldErrors::default();
    if form.current_password.is_empty() {
        errors.insert("current_password", "current password is required");
    }
    check_password(&mut errors, "new_password", &form.new_password);
    if form.new_password != form.confirm_password {
        errors.insert("confirm_password", "passwords do not match");
    }
    errors
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
