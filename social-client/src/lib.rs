pub mod api;
pub mod oauth;
pub mod rate_limiter;
pub mod retry;

pub use api::SocialApiClient;
pub use oauth::OAuth1Signer;
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use retry::{RetryConfig, RetryExecutor};

use replybot_core::{AccountProfile, CandidatePost, CoreError};

/// Read and write operations the bot needs from the microblogging platform.
#[allow(async_fn_in_trait)]
pub trait SocialPlatform {
    /// Check the credentials and return the authenticated account.
    async fn verify_credentials(&self) -> Result<AccountProfile, CoreError>;

    async fn resolve_user_id(&self, handle: &str) -> Result<String, CoreError>;

    async fn recent_posts(
        &self,
        handle: &str,
        user_id: &str,
        max_results: u32,
    ) -> Result<Vec<CandidatePost>, CoreError>;

    /// Publish a post, optionally as a reply. Returns the new post's id.
    async fn create_post(&self, text: &str, in_reply_to: Option<&str>) -> Result<String, CoreError>;

    async fn share(&self, post_id: &str) -> Result<(), CoreError>;
}

#[cfg(test)]
mod tests;
