use leadswipe_core::{BackendError, ConfigError, CoreError, ErrorExt, ErrorReporter};

#[test]
fn test_wrapped_errors_report_inner_code() {
    let backend_error = CoreError::Backend(BackendError::ServerError { status_code: 503 });
    assert_eq!(backend_error.error_code(), "BACKEND_SERVER_ERROR");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "backend.anon_key".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG_MISSING_FIELD");

    let invalid = CoreError::InvalidInput {
        message: "empty keyword".to_string(),
    };
    assert_eq!(invalid.error_code(), "INVALID_INPUT");
}

#[test]
fn test_user_friendly_messages() {
    let auth_error = CoreError::Backend(BackendError::AuthenticationFailed {
        reason: "JWT expired".to_string(),
    });
    assert!(auth_error.user_friendly_message().contains("API key"));

    let rejected = CoreError::Backend(BackendError::QueryRejected {
        status_code: 400,
        message: "column reddit_leads.karmaa does not exist".to_string(),
    });
    assert!(rejected.user_friendly_message().contains("karmaa"));

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "backend.url".to_string(),
    });
    assert!(config_error.user_friendly_message().contains("backend.url"));
}

#[test]
fn test_display_includes_context() {
    let error = CoreError::Backend(BackendError::Forbidden {
        table: "lead_decisions".to_string(),
    });
    assert_eq!(
        error.to_string(),
        "Backend error: Forbidden access to table: lead_decisions"
    );
}

#[test]
fn test_logging_helpers_return_the_error() {
    let error = CoreError::Backend(BackendError::RequestTimeout);
    assert_eq!(error.log_error().error_code(), "BACKEND_TIMEOUT");
    assert_eq!(error.log_warn().error_code(), "BACKEND_TIMEOUT");

    ErrorReporter::new("test").report(&error);
}
