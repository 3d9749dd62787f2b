use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use shared::{
    domain::Role,
    protocol::{AuthSession, Credentials, RegistrationRequest},
};
use tracing::{info, warn};

use crate::{ApiClient, RequestError};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

// local@domain.tld, no whitespace anywhere.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

fn email_shape() -> &'static Regex {
    static EMAIL_SHAPE: OnceLock<Regex> = OnceLock::new();
    EMAIL_SHAPE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

/// Form fields addressable by the shell rendering the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Username,
    Email,
    Password,
    ConfirmPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    SignIn,
    Register,
}

/// Result of [`AuthFormController::submit`]. Request failures are folded
/// into the controller's submission error rather than propagated, so every
/// variant leaves the controller in a presentable state.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// A submission is already in flight; nothing was sent.
    Busy,
    /// Validation failed; field errors were recorded and nothing was sent.
    Invalid,
    /// Signed in. The caller persists the session and switches views.
    SignedIn(AuthSession),
    /// Account created; the form reset to sign-in for the new credentials.
    Registered,
    /// The service rejected the request; its message became the
    /// submission error and the entered values were kept.
    Failed,
}

/// State machine behind the sign-in / registration form. Owns the field
/// values, per-field errors and the busy flag; rendering is someone
/// else's problem.
#[derive(Debug, Default)]
pub struct AuthFormController {
    mode: FormMode,
    username: String,
    email: String,
    password: String,
    confirm_password: String,
    role: Role,
    field_errors: HashMap<Field, String>,
    submit_error: Option<String>,
    busy: bool,
}

impl AuthFormController {
    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn busy(&self) -> bool {
        self.busy
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Username => &self.username,
            Field::Email => &self.email,
            Field::Password => &self.password,
            Field::ConfirmPassword => &self.confirm_password,
        }
    }

    pub fn field_error(&self, field: Field) -> Option<&str> {
        self.field_errors.get(&field).map(String::as_str)
    }

    pub fn field_errors(&self) -> &HashMap<Field, String> {
        &self.field_errors
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    /// Updates a field value. Clears that field's error and the top-level
    /// submission error; validation itself runs only on submit.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Username => self.username = value,
            Field::Email => self.email = value,
            Field::Password => self.password = value,
            Field::ConfirmPassword => self.confirm_password = value,
        }
        self.field_errors.remove(&field);
        self.submit_error = None;
    }

    /// Register-mode account type selection.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(match self.mode {
            FormMode::SignIn => FormMode::Register,
            FormMode::Register => FormMode::SignIn,
        });
    }

    /// Switches mode, keeping entered values but dropping all error state.
    pub fn set_mode(&mut self, mode: FormMode) {
        self.mode = mode;
        self.field_errors.clear();
        self.submit_error = None;
    }

    /// Validates the current values against the current mode. Pure: the
    /// stored error state is untouched; an empty map means submittable.
    pub fn validate(&self) -> HashMap<Field, String> {
        let mut errors = HashMap::new();

        if self.username.is_empty() {
            errors.insert(Field::Username, "Username is required".to_string());
        } else if self.username.chars().count() < MIN_USERNAME_LEN {
            errors.insert(
                Field::Username,
                format!("Min {MIN_USERNAME_LEN} chars required"),
            );
        }

        if self.mode == FormMode::Register {
            if self.email.is_empty() {
                errors.insert(Field::Email, "Email is required".to_string());
            } else if !email_shape().is_match(&self.email) {
                errors.insert(Field::Email, "Invalid email address".to_string());
            }
        }

        if self.password.is_empty() {
            errors.insert(Field::Password, "Password is required".to_string());
        } else if self.mode == FormMode::Register
            && self.password.chars().count() < MIN_PASSWORD_LEN
        {
            errors.insert(
                Field::Password,
                format!("Min {MIN_PASSWORD_LEN} chars required"),
            );
        }

        if self.mode == FormMode::Register {
            if self.confirm_password.is_empty() {
                errors.insert(Field::ConfirmPassword, "Confirmation required".to_string());
            } else if self.confirm_password != self.password {
                errors.insert(Field::ConfirmPassword, "Passwords do not match".to_string());
            }
        }

        errors
    }

    /// Validates and, if clean, sends the sign-in or registration request.
    /// The busy flag holds for the full duration of the outstanding call
    /// and refuses a second concurrent submission.
    pub async fn submit(&mut self, api: &dyn ApiClient) -> SubmitOutcome {
        if self.busy {
            return SubmitOutcome::Busy;
        }
        self.submit_error = None;

        let errors = self.validate();
        if !errors.is_empty() {
            self.field_errors = errors;
            return SubmitOutcome::Invalid;
        }

        self.busy = true;
        let outcome = match self.mode {
            FormMode::SignIn => {
                let credentials = Credentials {
                    username: self.username.clone(),
                    password: self.password.clone(),
                };
                match api.login(&credentials).await {
                    Ok(session) => SubmitOutcome::SignedIn(session),
                    Err(err) => self.record_failure(err),
                }
            }
            FormMode::Register => {
                let registration = RegistrationRequest {
                    username: self.username.clone(),
                    email: self.email.clone(),
                    password: self.password.clone(),
                    confirm_password: self.confirm_password.clone(),
                    role: self.role,
                };
                match api.register(&registration).await {
                    Ok(()) => {
                        info!(username = %self.username, "auth: account registered");
                        self.reset_after_registration();
                        SubmitOutcome::Registered
                    }
                    Err(err) => self.record_failure(err),
                }
            }
        };
        self.busy = false;
        outcome
    }

    fn record_failure(&mut self, err: RequestError) -> SubmitOutcome {
        warn!(error = %err, "auth: submission rejected");
        self.submit_error = Some(err.to_string());
        SubmitOutcome::Failed
    }

    fn reset_after_registration(&mut self) {
        self.mode = FormMode::SignIn;
        self.username.clear();
        self.email.clear();
        self.password.clear();
        self.confirm_password.clear();
        self.role = Role::User;
        self.field_errors.clear();
    }
}

#[cfg(test)]
#[path = "tests/auth_form_tests.rs"]
mod tests;
