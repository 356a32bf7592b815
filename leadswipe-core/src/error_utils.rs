use crate::error::*;
use std::fmt;
use tracing::{error, info, warn};

/// Logging and presentation helpers shared by every error type.
pub trait ErrorExt: fmt::Display + Sized {
    /// Stable, machine-readable identifier.
    fn error_code(&self) -> &'static str;

    /// Text suitable for showing in the review window.
    fn user_friendly_message(&self) -> String;

    fn log_error(&self) -> &Self {
        error!(code = self.error_code(), "{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = self.error_code(), "{}", self);
        self
    }
}

impl ErrorExt for CoreError {
    /// Wrapped backend and configuration errors report their own code.
    fn error_code(&self) -> &'static str {
        match self {
            CoreError::Backend(e) => e.error_code(),
            CoreError::Config(e) => e.error_code(),
            CoreError::Io(_) => "IO",
            CoreError::Serialization(_) => "SERIALIZATION",
            CoreError::Network(_) => "NETWORK",
            CoreError::InvalidInput { .. } => "INVALID_INPUT",
            CoreError::Internal { .. } => "INTERNAL",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Backend(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => "Could not reach the backend. Check your connection.".into(),
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::Io(_) | CoreError::Serialization(_) | CoreError::Internal { .. } => {
                "Something went wrong. See the log for details.".into()
            }
        }
    }
}

impl ErrorExt for BackendError {
    fn error_code(&self) -> &'static str {
        match self {
            BackendError::AuthenticationFailed { .. } => "BACKEND_AUTH_FAILED",
            BackendError::Forbidden { .. } => "BACKEND_FORBIDDEN",
            BackendError::TableNotFound { .. } => "BACKEND_TABLE_NOT_FOUND",
            BackendError::RateLimitExceeded { .. } => "BACKEND_RATE_LIMIT",
            BackendError::QueryRejected { .. } => "BACKEND_QUERY_REJECTED",
            BackendError::ServerError { .. } => "BACKEND_SERVER_ERROR",
            BackendError::RequestTimeout => "BACKEND_TIMEOUT",
            BackendError::InvalidResponse { .. } => "BACKEND_INVALID_RESPONSE",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            BackendError::AuthenticationFailed { .. } => {
                "The backend rejected the API key. Check backend.anon_key.".into()
            }
            BackendError::Forbidden { table } => {
                format!("The API key is not allowed to access '{}'.", table)
            }
            BackendError::TableNotFound { table } => {
                format!("The backend has no '{}' table.", table)
            }
            BackendError::RateLimitExceeded { retry_after } => {
                format!("The backend is throttling requests. Wait {}s.", retry_after)
            }
            BackendError::QueryRejected { message, .. } => {
                format!("The backend rejected the query: {}", message)
            }
            BackendError::ServerError { .. } | BackendError::InvalidResponse { .. } => {
                "The backend is having trouble. Refresh to try again.".into()
            }
            BackendError::RequestTimeout => "The backend did not answer in time.".into(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::MissingField { field } => {
                format!("Set '{}' in leadswipe.toml or the environment.", field)
            }
            ConfigError::InvalidValue { field, .. } => format!("'{}' has an invalid value.", field),
            ConfigError::ValidationFailed { reason } => reason.clone(),
            ConfigError::Parse(_) => "leadswipe.toml is not valid TOML.".into(),
        }
    }
}

/// Logs a failure that ends an operation, tagged with where it happened.
#[derive(Debug, Clone, Copy)]
pub struct ErrorReporter {
    context: &'static str,
}

impl ErrorReporter {
    pub fn new(context: &'static str) -> Self {
        Self { context }
    }

    pub fn report(&self, error: &CoreError) {
        error!(context = self.context, code = error.error_code(), "{}", error);
        info!(context = self.context, "{}", error.user_friendly_message());
    }
}
