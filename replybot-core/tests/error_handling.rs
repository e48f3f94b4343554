use replybot_core::{ConfigError, CoreError, ErrorExt, LlmError, SocialApiError};
use std::time::Duration;

#[test]
fn test_rate_limited_errors() {
    let social = CoreError::SocialApi(SocialApiError::RateLimitExceeded { retry_after: 60 });
    assert!(social.is_rate_limited());

    let llm = CoreError::Llm(LlmError::RateLimitExceeded {
        provider: "openai".to_string(),
        retry_after: 20,
    });
    assert!(llm.is_rate_limited());

    let server_error = CoreError::SocialApi(SocialApiError::ServerError { status_code: 503 });
    assert!(!server_error.is_rate_limited());
}

#[test]
fn test_fatal_errors() {
    let auth_error = CoreError::SocialApi(SocialApiError::AuthenticationFailed {
        reason: "Unauthorized".to_string(),
    });
    assert!(auth_error.is_fatal());

    let transient = CoreError::SocialApi(SocialApiError::ServerError { status_code: 502 });
    assert!(!transient.is_fatal());
}

#[test]
fn test_retry_after() {
    let rate_limit_error =
        CoreError::SocialApi(SocialApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(
        rate_limit_error.retry_after(),
        Some(Duration::from_secs(60))
    );

    let timeout = CoreError::SocialApi(SocialApiError::RequestTimeout);
    assert_eq!(timeout.retry_after(), None);
}

#[test]
fn test_user_friendly_messages() {
    let social_error = CoreError::SocialApi(SocialApiError::UserNotFound {
        handle: "ghost".to_string(),
    });
    let message = social_error.user_friendly_message();
    assert!(message.contains("@ghost"));

    let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "OPENAI_API_KEY".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("OPENAI_API_KEY"));
}
