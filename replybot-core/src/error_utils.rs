use crate::error::*;
use std::time::Duration;
use tracing::{error, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
}

impl CoreError {
    /// Errors that must stop the bot rather than be logged and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CoreError::SocialApi(SocialApiError::AuthenticationFailed { .. })
                | CoreError::Llm(LlmError::InvalidApiKey { .. })
                | CoreError::Config(_)
        )
    }

    /// True when the platform answered with HTTP 429.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            CoreError::SocialApi(SocialApiError::RateLimitExceeded { .. })
                | CoreError::Llm(LlmError::RateLimitExceeded { .. })
        )
    }
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::SocialApi(e) => {
                error!("Social API error details: {:?}", e);
            }
            CoreError::Llm(e) => {
                error!("LLM error details: {:?}", e);
            }
            CoreError::Storage(e) => {
                error!("Storage error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    /// Only throttling carries a server-provided wait.
    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::SocialApi(SocialApiError::RateLimitExceeded { retry_after })
            | CoreError::Llm(LlmError::RateLimitExceeded { retry_after, .. }) => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::SocialApi(e) => social_message(e),
            CoreError::Llm(e) => llm_message(e),
            CoreError::Storage(e) => storage_message(e),
            CoreError::Config(e) => config_message(e),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }
}

fn social_message(error: &SocialApiError) -> String {
    match error {
        SocialApiError::AuthenticationFailed { .. } => {
            "Platform authentication failed. Please check your API keys and tokens.".to_string()
        }
        SocialApiError::RateLimitExceeded { retry_after } => format!(
            "Too many requests. Please wait {} seconds before trying again.",
            retry_after
        ),
        SocialApiError::Forbidden { resource } => format!(
            "Access denied to {}. The app may lack write permission.",
            resource
        ),
        SocialApiError::UserNotFound { handle } => {
            format!("Account '@{}' not found or is suspended.", handle)
        }
        SocialApiError::PostNotFound { .. } => "The requested post could not be found.".to_string(),
        SocialApiError::RequestTimeout => {
            "Request to the platform timed out. Please try again.".to_string()
        }
        _ => "Platform API error occurred. Please try again later.".to_string(),
    }
}

fn llm_message(error: &LlmError) -> String {
    match error {
        LlmError::InvalidApiKey { provider } => format!(
            "Invalid API key for {}. Please update OPENAI_API_KEY.",
            provider
        ),
        LlmError::RateLimitExceeded {
            provider,
            retry_after,
        } => format!(
            "Rate limit exceeded for {}. Please wait {} seconds.",
            provider, retry_after
        ),
        LlmError::ModelNotAvailable { model } => format!(
            "Model '{}' is not available. Please try a different model.",
            model
        ),
        LlmError::ContentFiltered { .. } => {
            "Content was filtered by the AI provider's safety systems.".to_string()
        }
        LlmError::ServiceUnavailable { provider } => format!(
            "{} service is temporarily unavailable. Please try again later.",
            provider
        ),
        _ => "AI service error occurred. Please try again later.".to_string(),
    }
}

fn storage_message(error: &StorageError) -> String {
    match error {
        StorageError::ReadFailed { path, .. } => {
            format!("Could not read stats from {}. Using fresh counters.", path)
        }
        StorageError::WriteFailed { path, .. } => format!(
            "Could not save stats to {}. Counters are kept in memory.",
            path
        ),
        StorageError::Corrupt { path, .. } => {
            format!("Stats file {} is unreadable and will be replaced.", path)
        }
    }
}

fn config_message(error: &ConfigError) -> String {
    match error {
        ConfigError::FileNotFound { path } => format!("Configuration file '{}' not found.", path),
        ConfigError::InvalidValue { field, .. } => {
            format!("Invalid value for configuration field '{}'.", field)
        }
        ConfigError::MissingEnvironmentVariable { var_name } => format!(
            "Environment variable '{}' is required but not set.",
            var_name
        ),
        ConfigError::ValidationFailed { reason } => format!("Configuration is invalid: {}", reason),
        ConfigError::Parse(_) => {
            "Configuration file format is invalid. Please check the settings.".to_string()
        }
    }
}
