use crate::oauth::OAuth1Signer;
use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::SocialPlatform;
use chrono::{DateTime, Utc};
use replybot_core::{
    AccountProfile, ApiConfig, CandidatePost, CoreError, Credentials, SocialApiError,
};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};
use url::Url;

/// Response wrapper used by every v2 endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiProblem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ApiProblem {
    fn describe(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| "unknown problem".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<UserPublicMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublicMetrics {
    pub followers_count: u64,
    pub following_count: u64,
    #[serde(default)]
    pub tweet_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetData {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub public_metrics: Option<TweetPublicMetrics>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TweetPublicMetrics {
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub quote_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RetweetResult {
    retweeted: bool,
}

impl TweetData {
    /// Candidate for scoring. Tweets without a creation time cannot be aged and are dropped.
    pub fn into_candidate(self, author: &str) -> Option<CandidatePost> {
        let created_at = self.created_at?;
        let metrics = self.public_metrics.unwrap_or_default();
        Some(CandidatePost {
            id: self.id,
            text: self.text,
            author: author.trim_start_matches('@').to_string(),
            author_id: self.author_id,
            created_at,
            likes: metrics.like_count,
            shares: metrics.retweet_count + metrics.quote_count,
            replies: metrics.reply_count,
        })
    }
}

impl From<UserData> for AccountProfile {
    fn from(user: UserData) -> Self {
        let metrics = user.public_metrics;
        Self {
            id: user.id,
            username: user.username,
            followers: metrics.as_ref().map(|m| m.followers_count),
            following: metrics.as_ref().map(|m| m.following_count),
            post_count: metrics.and_then(|m| m.tweet_count),
        }
    }
}

/// OAuth 1.0a signed client for the platform's v2 REST API.
#[derive(Debug)]
pub struct SocialApiClient {
    http_client: Client,
    signer: OAuth1Signer,
    base_url: Url,
    rate_limiter: RateLimiter,
    own_user_id: OnceCell<String>,
}

impl SocialApiClient {
    pub fn new(credentials: &Credentials, config: &ApiConfig) -> Result<Self, CoreError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            CoreError::Config(replybot_core::ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                value: format!("{} ({})", config.base_url, e),
            })
        })?;

        let http_client = Client::builder()
            .user_agent(concat!("replybot/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            signer: OAuth1Signer::from_credentials(credentials),
            base_url,
            rate_limiter: RateLimiter::new(RateLimitConfig::from_api_config(config)),
            own_user_id: OnceCell::new(),
        })
    }

    fn endpoint_url(&self, endpoint: &str, query_params: &[(&str, &str)]) -> Result<Url, CoreError> {
        let mut url = self.base_url.join(endpoint).map_err(|e| {
            CoreError::InvalidInput {
                message: format!("bad endpoint {}: {}", endpoint, e),
            }
        })?;
        if !query_params.is_empty() {
            url.query_pairs_mut().extend_pairs(query_params);
        }
        Ok(url)
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response, CoreError> {
        let url = self.endpoint_url(endpoint, query_params)?;

        let waited = self.rate_limiter.acquire_permit().await;
        if waited > Duration::from_millis(500) {
            debug!("Waited {:?} for request budget on {}", waited, endpoint);
        }

        let authorization = self.signer.authorization_header(method.as_str(), &url);
        let mut request_builder = self
            .http_client
            .request(method.clone(), url)
            .header(reqwest::header::AUTHORIZATION, authorization);

        if let Some(json) = body {
            request_builder = request_builder.json(json);
        }

        info!("Making platform API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::SocialApi(SocialApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let code = status.as_u16();
        match code {
            429 => {
                let retry_after = retry_after_secs(&response).unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                Err(CoreError::SocialApi(SocialApiError::RateLimitExceeded {
                    retry_after,
                }))
            }
            401 => {
                let details = response.text().await.unwrap_or_default();
                Err(CoreError::SocialApi(SocialApiError::AuthenticationFailed {
                    reason: if details.is_empty() {
                        "Unauthorized".to_string()
                    } else {
                        details
                    },
                }))
            }
            403 => Err(CoreError::SocialApi(SocialApiError::Forbidden {
                resource: endpoint.to_string(),
            })),
            404 => Err(CoreError::SocialApi(SocialApiError::InvalidResponse {
                details: format!("{} not found", endpoint),
            })),
            _ if status.is_server_error() => {
                Err(CoreError::SocialApi(SocialApiError::ServerError { status_code: code }))
            }
            _ => {
                let details = response.text().await.unwrap_or_default();
                Err(CoreError::SocialApi(SocialApiError::Rejected {
                    status_code: code,
                    details,
                }))
            }
        }
    }

    async fn fetch<T>(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<ApiEnvelope<T>, CoreError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .make_request(method, endpoint, query_params, body)
            .await?;

        response.json::<ApiEnvelope<T>>().await.map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            CoreError::SocialApi(SocialApiError::InvalidResponse {
                details: format!("Failed to parse response from {}", endpoint),
            })
        })
    }

    pub async fn get_me(&self) -> Result<UserData, CoreError> {
        let envelope: ApiEnvelope<UserData> = self
            .fetch(
                Method::GET,
                "/2/users/me",
                &[("user.fields", "public_metrics")],
                None,
            )
            .await?;

        let user = envelope.data.ok_or_else(|| {
            CoreError::SocialApi(SocialApiError::InvalidResponse {
                details: "users/me returned no data".to_string(),
            })
        })?;

        let _ = self.own_user_id.set(user.id.clone());
        Ok(user)
    }

    async fn own_user_id(&self) -> Result<&String, CoreError> {
        self.own_user_id
            .get_or_try_init(|| async { self.get_me().await.map(|user| user.id) })
            .await
    }

    pub async fn get_user_by_username(&self, handle: &str) -> Result<UserData, CoreError> {
        let handle = handle.trim_start_matches('@');
        let endpoint = format!("/2/users/by/username/{}", handle);
        let envelope: ApiEnvelope<UserData> =
            self.fetch(Method::GET, &endpoint, &[], None).await?;

        envelope.data.ok_or_else(|| {
            if let Some(problem) = envelope.errors.first() {
                debug!("Lookup of @{} failed: {}", handle, problem.describe());
            }
            CoreError::SocialApi(SocialApiError::UserNotFound {
                handle: handle.to_string(),
            })
        })
    }

    pub async fn get_user_tweets(
        &self,
        user_id: &str,
        max_results: u32,
    ) -> Result<Vec<TweetData>, CoreError> {
        let endpoint = format!("/2/users/{}/tweets", user_id);
        // The endpoint accepts 5..=100.
        let max_results = max_results.clamp(5, 100).to_string();
        let envelope: ApiEnvelope<Vec<TweetData>> = self
            .fetch(
                Method::GET,
                &endpoint,
                &[
                    ("max_results", max_results.as_str()),
                    ("tweet.fields", "created_at,public_metrics,author_id"),
                    ("exclude", "retweets,replies"),
                ],
                None,
            )
            .await?;

        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn post_tweet(&self, text: &str, in_reply_to: Option<&str>) -> Result<String, CoreError> {
        let body = match in_reply_to {
            Some(post_id) => serde_json::json!({
                "text": text,
                "reply": { "in_reply_to_tweet_id": post_id }
            }),
            None => serde_json::json!({ "text": text }),
        };

        let envelope: ApiEnvelope<CreatedTweet> = self
            .fetch(Method::POST, "/2/tweets", &[], Some(&body))
            .await?;

        match envelope.data {
            Some(created) => {
                info!("Created post {}", created.id);
                Ok(created.id)
            }
            None => Err(CoreError::SocialApi(SocialApiError::InvalidResponse {
                details: envelope
                    .errors
                    .first()
                    .map(ApiProblem::describe)
                    .unwrap_or_else(|| "create returned no id".to_string()),
            })),
        }
    }

    pub async fn retweet(&self, post_id: &str) -> Result<(), CoreError> {
        let user_id = self.own_user_id().await?;
        let endpoint = format!("/2/users/{}/retweets", user_id);
        let body = serde_json::json!({ "tweet_id": post_id });

        let envelope: ApiEnvelope<RetweetResult> = self
            .fetch(Method::POST, &endpoint, &[], Some(&body))
            .await?;

        match envelope.data {
            Some(result) if result.retweeted => Ok(()),
            _ => Err(CoreError::SocialApi(SocialApiError::PostNotFound {
                post_id: post_id.to_string(),
            })),
        }
    }
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    let headers = response.headers();
    if let Some(value) = headers.get("retry-after").and_then(|v| v.to_str().ok()) {
        return value.trim().parse().ok();
    }

    // x-rate-limit-reset is an epoch timestamp
    headers
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|reset| (reset - Utc::now().timestamp()).max(1) as u64)
}

impl SocialPlatform for SocialApiClient {
    async fn verify_credentials(&self) -> Result<AccountProfile, CoreError> {
        let user = self.get_me().await?;
        info!("Authenticated as @{}", user.username);
        Ok(user.into())
    }

    async fn resolve_user_id(&self, handle: &str) -> Result<String, CoreError> {
        self.get_user_by_username(handle).await.map(|user| user.id)
    }

    async fn recent_posts(
        &self,
        handle: &str,
        user_id: &str,
        max_results: u32,
    ) -> Result<Vec<CandidatePost>, CoreError> {
        let tweets = self.get_user_tweets(user_id, max_results).await?;
        let fetched = tweets.len();
        let posts: Vec<CandidatePost> = tweets
            .into_iter()
            .filter_map(|tweet| tweet.into_candidate(handle))
            .take(max_results as usize)
            .collect();

        info!("Retrieved {} of {} posts from @{}", posts.len(), fetched, handle);
        Ok(posts)
    }

    async fn create_post(&self, text: &str, in_reply_to: Option<&str>) -> Result<String, CoreError> {
        self.post_tweet(text, in_reply_to).await
    }

    async fn share(&self, post_id: &str) -> Result<(), CoreError> {
        self.retweet(post_id).await
    }
}
