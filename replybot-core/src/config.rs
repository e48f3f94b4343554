//! Bot configuration.
//!
//! Everything tunable lives in [`BotConfig`], loaded once at startup from an
//! optional TOML file. Secrets never live in the file: [`Credentials`] are read
//! from the environment only.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONSUMER_KEY: &str = "CONSUMER_KEY";
pub const CONSUMER_SECRET: &str = "CONSUMER_SECRET";
pub const ACCESS_TOKEN: &str = "ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET: &str = "ACCESS_TOKEN_SECRET";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

pub const CREDENTIAL_VARS: [&str; 5] = [
    CONSUMER_KEY,
    CONSUMER_SECRET,
    ACCESS_TOKEN,
    ACCESS_TOKEN_SECRET,
    OPENAI_API_KEY,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Accounts whose recent posts are considered for replies.
    pub target_accounts: Vec<String>,
    /// System prompt describing the bot's voice.
    pub persona: String,
    /// Angles used when composing an original post.
    pub viral_strategies: Vec<String>,
    pub trending_topics: Vec<String>,
    pub news_headlines: Vec<String>,
    pub hashtag_pool: Vec<String>,
    pub scoring: ScoringPolicy,
    pub limits: LimitsConfig,
    pub timing: TimingConfig,
    pub llm: LlmConfig,
    pub api: ApiConfig,
    pub stats_path: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            target_accounts: to_strings(&["elonmusk", "sama", "OpenAI", "AndrewYNg", "ylecun"]),
            persona: DEFAULT_PERSONA.to_string(),
            viral_strategies: to_strings(&[
                "Share controversial (but safe) AI predictions",
                "Post mind-blowing tech statistics",
                "Create AI vs Human debates",
                "Share 'insider' tech industry insights",
                "Make bold cryptocurrency predictions",
            ]),
            trending_topics: Vec::new(),
            news_headlines: Vec::new(),
            hashtag_pool: to_strings(&[
                "#AI",
                "#AIEthics",
                "#MachineLearning",
                "#LLM",
                "#Crypto",
                "#FutureOfWork",
                "#Tech",
            ]),
            scoring: ScoringPolicy::default(),
            limits: LimitsConfig::default(),
            timing: TimingConfig::default(),
            llm: LlmConfig::default(),
            api: ApiConfig::default(),
            stats_path: PathBuf::from("bot_stats.json"),
        }
    }
}

const DEFAULT_PERSONA: &str = "You are an AI expert sharing insider knowledge about AI and tech. \
Your replies should be controversial but safe, highly engaging, create curiosity, \
share insider perspectives and focus on AI, tech and future trends. \
Never use quotation marks and keep it under 240 characters.";

/// Weights and cut-offs for the engagement heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Length of the trailing window used for the reply rate limit.
    pub window_secs: u64,
    /// Replies allowed inside one window.
    pub max_actions_per_window: usize,
    /// Posts older than this are never answered (priority authors excepted).
    pub max_age_minutes: i64,
    /// How long answered post ids are remembered. Also the age limit for
    /// priority authors, so a forgotten post can never come back.
    pub answered_retention_days: u32,
    pub priority_authors: Vec<String>,
    pub topic_keywords: Vec<String>,
    pub topic_points: u32,
    pub min_likes: u64,
    pub min_shares: u64,
    pub engagement_points: u32,
    pub short_text_chars: usize,
    pub short_text_points: u32,
    pub question_points: u32,
    pub hook_phrases: Vec<String>,
    pub hook_points: u32,
    pub threshold: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            window_secs: 2 * 60 * 60,
            max_actions_per_window: 5,
            max_age_minutes: 120,
            answered_retention_days: 7,
            priority_authors: to_strings(&["elonmusk"]),
            topic_keywords: to_strings(&[
                "ai ethics",
                "artificial intelligence",
                "machine learning",
                "deep learning",
                "llm",
                "gpt",
                "neural",
                "crypto",
                "automation",
                "future of work",
            ]),
            topic_points: 3,
            min_likes: 3,
            min_shares: 0,
            engagement_points: 2,
            short_text_chars: 100,
            short_text_points: 1,
            question_points: 1,
            hook_phrases: to_strings(&[
                "breaking",
                "just announced",
                "hot take",
                "unpopular opinion",
                "thoughts?",
                "what do you think",
            ]),
            hook_points: 1,
            threshold: 4,
        }
    }
}

pub const MAX_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;
pub const MAX_AGE_MINUTES: i64 = 30 * 24 * 60;
pub const MAX_RETENTION_DAYS: u32 = 365;

// The getters clamp to the same bounds `validate` enforces, so a policy built
// in code without validation still cannot overflow chrono.
impl ScoringPolicy {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_secs.min(MAX_WINDOW_SECS) as i64)
    }

    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.max_age_minutes.clamp(0, MAX_AGE_MINUTES))
    }

    pub fn answered_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.answered_retention_days.clamp(1, MAX_RETENTION_DAYS) as i64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_WINDOW_SECS).contains(&self.window_secs) {
            return Err(ConfigError::InvalidValue {
                field: "scoring.window_secs".to_string(),
                value: self.window_secs.to_string(),
            });
        }
        if !(1..=MAX_AGE_MINUTES).contains(&self.max_age_minutes) {
            return Err(ConfigError::InvalidValue {
                field: "scoring.max_age_minutes".to_string(),
                value: self.max_age_minutes.to_string(),
            });
        }
        if !(1..=MAX_RETENTION_DAYS).contains(&self.answered_retention_days) {
            return Err(ConfigError::InvalidValue {
                field: "scoring.answered_retention_days".to_string(),
                value: self.answered_retention_days.to_string(),
            });
        }
        if self.answered_retention() < self.window() {
            return Err(ConfigError::ValidationFailed {
                reason: "scoring.answered_retention_days must cover scoring.window_secs"
                    .to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_replies_per_day: u32,
    pub max_tweets_per_day: u32,
    /// How many recent posts to request per target account.
    pub posts_per_account: u32,
    /// Re-share a post after replying to it.
    pub share_after_reply: bool,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_replies_per_day: 50,
            max_tweets_per_day: 10,
            posts_per_account: 5,
            share_after_reply: false,
        }
    }
}

/// Sleep intervals, all in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval_secs: u64,
    pub poll_jitter_secs: u64,
    pub action_delay_secs: u64,
    pub account_delay_secs: u64,
    pub recovery_delay_secs: u64,
    pub throttle_backoff_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15 * 60,
            poll_jitter_secs: 5 * 60,
            action_delay_secs: 60,
            account_delay_secs: 5,
            recovery_delay_secs: 5 * 60,
            throttle_backoff_secs: 15 * 60,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_secs(self.action_delay_secs)
    }

    pub fn account_delay(&self) -> Duration {
        Duration::from_secs(self.account_delay_secs)
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_secs(self.recovery_delay_secs)
    }

    pub fn throttle_backoff(&self) -> Duration {
        Duration::from_secs(self.throttle_backoff_secs)
    }

    /// Zero delays everywhere; used by tests and dry runs.
    pub fn immediate() -> Self {
        Self {
            poll_interval_secs: 0,
            poll_jitter_secs: 0,
            action_delay_secs: 0,
            account_delay_secs: 0,
            recovery_delay_secs: 0,
            throttle_backoff_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 100,
            temperature: 0.9,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Outbound request budget per window, enforced client-side.
    pub requests_per_window: u32,
    pub window_secs: u64,
    pub burst: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitter.com".to_string(),
            timeout_secs: 30,
            requests_per_window: 50,
            window_secs: 15 * 60,
            burst: 5,
        }
    }
}

impl BotConfig {
    /// Load from `path`, or fall back to the built-in defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw =
                    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_accounts.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "target_accounts must list at least one account".to_string(),
            });
        }
        self.scoring.validate()?;
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                value: self.llm.temperature.to_string(),
            });
        }
        if self.api.requests_per_window == 0 || self.api.window_secs == 0 || self.api.burst == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "api request budget must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// The four-part OAuth 1.0a user credential plus the completion API key.
#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub openai_api_key: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                    var_name: name.to_string(),
                })
        };

        Ok(Self {
            consumer_key: require(CONSUMER_KEY)?,
            consumer_secret: require(CONSUMER_SECRET)?,
            access_token: require(ACCESS_TOKEN)?,
            access_token_secret: require(ACCESS_TOKEN_SECRET)?,
            openai_api_key: require(OPENAI_API_KEY)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &"[REDACTED]")
            .field("consumer_secret", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .field("access_token_secret", &"[REDACTED]")
            .field("openai_api_key", &"[REDACTED]")
            .finish()
    }
}

/// Presence of each credential variable, in a stable order.
pub fn credential_presence() -> Vec<(&'static str, bool)> {
    CREDENTIAL_VARS
        .iter()
        .map(|name| {
            let present = std::env::var(name)
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false);
            (*name, present)
        })
        .collect()
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
