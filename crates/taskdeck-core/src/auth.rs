use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use taskdeck_shared::{AuthSession, SignInArgs, SignUpArgs};
use tracing::{debug, error, info, instrument};

use crate::error::{AuthError, GatewayError, ValidationError};
use crate::gateway::AuthGateway;
use crate::session::{AUTH_TOKEN_KEY, SessionStore, USER_EMAIL_KEY, USER_NAME_KEY, set_or_warn};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const SIGN_IN_FALLBACK: &str = "Sign in failed. Please try again.";
pub const SIGN_UP_FALLBACK: &str = "Sign up failed. Please try again.";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn validate(&self) -> Result<SignInArgs, ValidationError> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        if !validate_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        Ok(SignInArgs {
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<SignUpArgs, ValidationError> {
        if self.email.is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
            || self.name.is_empty()
        {
            return Err(ValidationError::MissingFields);
        }
        if !validate_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        // Measured in UTF-16 code units.
        if self.password.encode_utf16().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(SignUpArgs {
            email: self.email.clone(),
            password: self.password.clone(),
            name: self.name.clone(),
        })
    }
}

impl fmt::Debug for SignInForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInForm")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for SignUpForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Sign-in / sign-up submission with a single replaceable error message.
///
/// Forms are borrowed, never cleared, so a failed attempt leaves every field
/// populated for correction.
pub struct AuthFlow {
    gateway: Arc<dyn AuthGateway>,
    session: Arc<dyn SessionStore>,
    error: Option<String>,
    loading: bool,
}

impl AuthFlow {
    pub fn new(gateway: Arc<dyn AuthGateway>, session: Arc<dyn SessionStore>) -> Self {
        Self {
            gateway,
            session,
            error: None,
            loading: false,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn sign_in(&mut self, form: &SignInForm) -> Result<AuthSession, AuthError> {
        self.error = None;
        let args = self.check(form.validate())?;

        self.loading = true;
        let result = self.gateway.sign_in(args).await;
        self.loading = false;
        self.finish(result, &form.email, None, SIGN_IN_FALLBACK)
    }

    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn sign_up(&mut self, form: &SignUpForm) -> Result<AuthSession, AuthError> {
        self.error = None;
        let args = self.check(form.validate())?;

        self.loading = true;
        let result = self.gateway.sign_up(args).await;
        self.loading = false;
        self.finish(result, &form.email, Some(&form.name), SIGN_UP_FALLBACK)
    }

    /// Clears the stored credentials.
    pub fn sign_out(&self) {
        for key in [AUTH_TOKEN_KEY, USER_NAME_KEY, USER_EMAIL_KEY] {
            if let Err(err) = self.session.remove(key) {
                error!(key, error = %err, "failed to clear session value");
            }
        }
        info!("signed out");
    }

    fn check<T>(&mut self, validated: Result<T, ValidationError>) -> Result<T, AuthError> {
        validated.map_err(|err| {
            debug!(error = %err, "auth form rejected");
            self.error = Some(err.to_string());
            AuthError::from(err)
        })
    }

    fn finish(
        &mut self,
        result: Result<AuthSession, GatewayError>,
        email: &str,
        name: Option<&str>,
        fallback: &str,
    ) -> Result<AuthSession, AuthError> {
        match result {
            Ok(session) => {
                info!(email, "authenticated");
                self.remember(&session, email, name);
                Ok(session)
            }
            Err(err) => {
                error!(email, error = %err, "authentication failed");
                self.error = Some(err.message_or(fallback).to_string());
                Err(err.into())
            }
        }
    }

    fn remember(&self, session: &AuthSession, email: &str, name: Option<&str>) {
        let store = self.session.as_ref();
        set_or_warn(store, AUTH_TOKEN_KEY, &session.token);
        set_or_warn(
            store,
            USER_EMAIL_KEY,
            session.user_email.as_deref().unwrap_or(email),
        );
        if let Some(user_name) = session.user_name.as_deref().or(name) {
            set_or_warn(store, USER_NAME_KEY, user_name);
        }
    }
}
