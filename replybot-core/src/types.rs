use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A post fetched from a target account's timeline, eligible for a reply decision.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePost {
    pub id: String,
    pub text: String,
    /// Handle of the author, without the leading `@`.
    pub author: String,
    pub author_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub shares: u64,
    pub replies: u64,
}

impl CandidatePost {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.created_at)
    }
}

/// Per-calendar-day action tally, persisted as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    #[serde(default)]
    pub replies: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_rate: Option<f64>,
}

impl DailyStats {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            replies: 0,
            tweets: None,
            followers: None,
            following: None,
            engagement_rate: None,
        }
    }

    pub fn tweets_posted(&self) -> u32 {
        self.tweets.unwrap_or(0)
    }

    pub fn is_for(&self, date: NaiveDate) -> bool {
        self.date == date
    }
}

/// The authenticated account as reported by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountProfile {
    pub id: String,
    pub username: String,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    pub post_count: Option<u64>,
}
