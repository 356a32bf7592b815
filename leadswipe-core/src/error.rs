use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failures reported by the hosted table API.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Forbidden access to table: {table}")]
    Forbidden { table: String },

    #[error("Table not found: {table}")]
    TableNotFound { table: String },

    #[error("Rate limited, retry after {retry_after}s")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Query rejected ({status_code}): {message}")]
    QueryRejected { status_code: u16, message: String },

    #[error("Backend returned {status_code}")]
    ServerError { status_code: u16 },

    #[error("Backend request timed out")]
    RequestTimeout,

    #[error("Unexpected backend response: {details}")]
    InvalidResponse { details: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration rejected: {reason}")]
    ValidationFailed { reason: String },

    #[error("Malformed TOML: {0}")]
    Parse(#[from] toml::de::Error),
}
