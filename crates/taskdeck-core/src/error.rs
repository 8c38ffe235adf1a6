use thiserror::Error;

/// Local, pre-flight rejection. The `Display` text is the message shown inline
/// to the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Title is required.")]
    EmptyTitle,
}

/// A remote call failed. Never leaves local state partially applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("request failed with status {status}: {}", message.as_deref().unwrap_or("no message"))]
    Http {
        status: u16,
        message: Option<String>,
    },
    #[error("not authorized")]
    Unauthorized { message: Option<String> },
    #[error("not found")]
    NotFound,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0}")]
    Rejected(String),
}

impl GatewayError {
    /// The service-provided, human-readable message, if any.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Http { message, .. } | Self::Unauthorized { message } => message.as_deref(),
            Self::Rejected(message) => Some(message.as_str()),
            Self::NotFound | Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.user_message()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("form is closed")]
    Closed,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_match_inline_copy() {
        assert_eq!(
            ValidationError::PasswordTooShort { min: 8 }.to_string(),
            "Password must be at least 8 characters"
        );
        assert_eq!(ValidationError::EmptyTitle.to_string(), "Title is required.");
    }

    #[test]
    fn message_or_falls_back_when_service_is_silent() {
        let silent = GatewayError::Transport("connection refused".to_string());
        assert_eq!(silent.message_or("Sign in failed."), "Sign in failed.");

        let blank = GatewayError::Rejected("   ".to_string());
        assert_eq!(blank.message_or("fallback"), "fallback");

        let told = GatewayError::Unauthorized {
            message: Some("Invalid credentials".to_string()),
        };
        assert_eq!(told.message_or("fallback"), "Invalid credentials");
    }
}
