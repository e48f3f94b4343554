use chrono::{DateTime, NaiveDate, Utc};
use engagement_engine::RateTracker;
use replybot_core::{AccountProfile, DailyStats, ErrorExt, LimitsConfig};
use social_client::{RetryExecutor, SocialPlatform};
use stats_store::StatsStore;
use tracing::{debug, info, warn};

/// Sole owner of the daily counters and the reply history. Every write to
/// the platform goes through here so the ceilings hold.
pub struct ActionDispatcher<S> {
    platform: S,
    store: StatsStore,
    stats: DailyStats,
    tracker: RateTracker,
    limits: LimitsConfig,
    retry: RetryExecutor,
}

impl<S: SocialPlatform> ActionDispatcher<S> {
    pub async fn new(
        platform: S,
        store: StatsStore,
        limits: LimitsConfig,
        retry: RetryExecutor,
    ) -> Self {
        let stats = store.load_or_fresh(Utc::now().date_naive()).await;
        info!(
            "Loaded counters for {}: {} replies, {} posts",
            stats.date,
            stats.replies,
            stats.tweets_posted()
        );

        Self {
            platform,
            store,
            stats,
            tracker: RateTracker::new(),
            limits,
            retry,
        }
    }

    pub fn platform(&self) -> &S {
        &self.platform
    }

    pub fn stats(&self) -> &DailyStats {
        &self.stats
    }

    pub fn tracker(&self) -> &RateTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut RateTracker {
        &mut self.tracker
    }

    pub fn replies_exhausted(&self, today: NaiveDate) -> bool {
        self.stats.is_for(today) && self.stats.replies >= self.limits.max_replies_per_day
    }

    pub async fn reply(&mut self, post_id: &str, text: &str) -> Option<String> {
        self.reply_at(post_id, text, Utc::now()).await
    }

    /// Reply to `post_id`. `None` covers both a local refusal at the daily
    /// ceiling and a failed write.
    pub async fn reply_at(&mut self, post_id: &str, text: &str, now: DateTime<Utc>) -> Option<String> {
        self.roll_over(now.date_naive());

        if self.stats.replies >= self.limits.max_replies_per_day {
            info!(
                "Daily reply limit reached ({}/{}), not replying to {}",
                self.stats.replies, self.limits.max_replies_per_day, post_id
            );
            return None;
        }

        let platform = &self.platform;
        let result = self
            .retry
            .execute("reply", move || platform.create_post(text, Some(post_id)))
            .await;

        match result {
            Ok(reply_id) => {
                self.stats.replies += 1;
                self.tracker.record(post_id, now);
                self.persist().await;
                info!(
                    "Replied to {} with {} ({}/{} today)",
                    post_id, reply_id, self.stats.replies, self.limits.max_replies_per_day
                );
                Some(reply_id)
            }
            Err(e) => {
                warn!("Reply to {} failed", post_id);
                e.log_warn();
                None
            }
        }
    }

    pub async fn share(&mut self, post_id: &str) -> bool {
        let platform = &self.platform;
        match self
            .retry
            .execute("share", move || platform.share(post_id))
            .await
        {
            Ok(()) => {
                info!("Shared {}", post_id);
                true
            }
            Err(e) => {
                warn!("Share of {} failed", post_id);
                e.log_warn();
                false
            }
        }
    }

    pub async fn publish(&mut self, text: &str) -> Option<String> {
        self.publish_at(text, Utc::now()).await
    }

    /// Publish a standalone post, bounded by the daily post ceiling.
    pub async fn publish_at(&mut self, text: &str, now: DateTime<Utc>) -> Option<String> {
        self.roll_over(now.date_naive());

        let posted = self.stats.tweets_posted();
        if posted >= self.limits.max_tweets_per_day {
            info!(
                "Daily post limit reached ({}/{}), not publishing",
                posted, self.limits.max_tweets_per_day
            );
            return None;
        }

        let platform = &self.platform;
        match self
            .retry
            .execute("publish", move || platform.create_post(text, None))
            .await
        {
            Ok(post_id) => {
                self.stats.tweets = Some(posted + 1);
                self.persist().await;
                info!("Published {} ({}/{} today)", post_id, posted + 1, self.limits.max_tweets_per_day);
                Some(post_id)
            }
            Err(e) => {
                warn!("Publishing failed");
                e.log_warn();
                None
            }
        }
    }

    /// Store follower counts from a fresh profile fetch.
    pub async fn record_growth(&mut self, profile: &AccountProfile, now: DateTime<Utc>) {
        self.roll_over(now.date_naive());

        self.stats.followers = profile.followers.or(self.stats.followers);
        self.stats.following = profile.following.or(self.stats.following);
        if let (Some(followers), Some(posts)) = (profile.followers, profile.post_count) {
            if posts > 0 {
                self.stats.engagement_rate = Some(followers as f64 / posts as f64);
            }
        }
        debug!(
            "Growth for @{}: followers={:?} following={:?}",
            profile.username, self.stats.followers, self.stats.following
        );
        self.persist().await;
    }

    fn roll_over(&mut self, today: NaiveDate) {
        if !self.stats.is_for(today) {
            info!("New day {}, resetting counters from {}", today, self.stats.date);
            self.stats = DailyStats::new(today);
        }
    }

    /// A failed save is logged; the in-memory counters stay authoritative.
    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.stats).await {
            e.log_warn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use replybot_core::{CandidatePost, CoreError, SocialApiError};
    use social_client::RetryConfig;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    /// Answers writes from a script; an empty script means success.
    #[derive(Default)]
    struct ScriptedPlatform {
        writes: RefCell<Vec<(String, Option<String>)>>,
        shares: RefCell<Vec<String>>,
        failures: RefCell<VecDeque<CoreError>>,
    }

    impl ScriptedPlatform {
        fn failing_with(errors: Vec<CoreError>) -> Self {
            Self {
                failures: RefCell::new(errors.into()),
                ..Default::default()
            }
        }

        fn write_count(&self) -> usize {
            self.writes.borrow().len()
        }
    }

    impl SocialPlatform for ScriptedPlatform {
        async fn verify_credentials(&self) -> Result<AccountProfile, CoreError> {
            unreachable!("not used by the dispatcher")
        }

        async fn resolve_user_id(&self, _handle: &str) -> Result<String, CoreError> {
            unreachable!("not used by the dispatcher")
        }

        async fn recent_posts(
            &self,
            _handle: &str,
            _user_id: &str,
            _max_results: u32,
        ) -> Result<Vec<CandidatePost>, CoreError> {
            unreachable!("not used by the dispatcher")
        }

        async fn create_post(&self, text: &str, in_reply_to: Option<&str>) -> Result<String, CoreError> {
            self.writes
                .borrow_mut()
                .push((text.to_string(), in_reply_to.map(str::to_string)));
            match self.failures.borrow_mut().pop_front() {
                Some(error) => Err(error),
                None => Ok(format!("new-{}", self.write_count())),
            }
        }

        async fn share(&self, post_id: &str) -> Result<(), CoreError> {
            self.shares.borrow_mut().push(post_id.to_string());
            match self.failures.borrow_mut().pop_front() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    fn throttled() -> CoreError {
        CoreError::SocialApi(SocialApiError::RateLimitExceeded { retry_after: 900 })
    }

    fn limits(max_replies: u32, max_tweets: u32) -> LimitsConfig {
        LimitsConfig {
            max_replies_per_day: max_replies,
            max_tweets_per_day: max_tweets,
            ..Default::default()
        }
    }

    async fn dispatcher(
        dir: &TempDir,
        platform: ScriptedPlatform,
        limits: LimitsConfig,
    ) -> ActionDispatcher<ScriptedPlatform> {
        let store = StatsStore::new(dir.path().join("bot_stats.json"));
        let retry = RetryExecutor::new(RetryConfig::with_backoff(std::time::Duration::from_millis(1)));
        ActionDispatcher::new(platform, store, limits, retry).await
    }

    fn noon() -> DateTime<Utc> {
        Utc::now().date_naive().and_hms_opt(12, 0, 0).unwrap().and_utc()
    }

    #[tokio::test]
    async fn test_reply_counts_persists_and_tracks() {
        let dir = TempDir::new().unwrap();
        let mut dispatcher = dispatcher(&dir, ScriptedPlatform::default(), limits(50, 10)).await;
        let now = noon();

        let id = dispatcher.reply_at("1790", "Great point", now).await;

        assert_eq!(id.as_deref(), Some("new-1"));
        assert_eq!(dispatcher.stats().replies, 1);
        assert!(dispatcher.tracker().contains("1790"));
        assert_eq!(
            dispatcher.platform().writes.borrow()[0],
            ("Great point".to_string(), Some("1790".to_string()))
        );

        let reloaded = StatsStore::new(dir.path().join("bot_stats.json"))
            .load(now.date_naive())
            .await
            .unwrap();
        assert_eq!(reloaded.replies, 1);
    }

    #[tokio::test]
    async fn test_daily_ceiling_refuses_without_calling_platform() {
        let dir = TempDir::new().unwrap();
        let mut dispatcher = dispatcher(&dir, ScriptedPlatform::default(), limits(1, 10)).await;
        let now = noon();

        assert!(dispatcher.reply_at("1", "first", now).await.is_some());
        assert!(dispatcher.reply_at("2", "second", now).await.is_none());

        assert_eq!(dispatcher.platform().write_count(), 1);
        assert!(!dispatcher.tracker().contains("2"));
    }

    #[tokio::test]
    async fn test_ceiling_from_persisted_counters() {
        let dir = TempDir::new().unwrap();
        let store = StatsStore::new(dir.path().join("bot_stats.json"));
        let mut stats = DailyStats::new(Utc::now().date_naive());
        stats.replies = 50;
        store.save(&stats).await.unwrap();

        let mut dispatcher = dispatcher(&dir, ScriptedPlatform::default(), limits(50, 10)).await;
        assert!(dispatcher.reply("1790", "hello").await.is_none());
        assert_eq!(dispatcher.platform().write_count(), 0);
    }

    #[tokio::test]
    async fn test_throttled_reply_retried_once() {
        let dir = TempDir::new().unwrap();
        let platform = ScriptedPlatform::failing_with(vec![throttled()]);
        let mut dispatcher = dispatcher(&dir, platform, limits(50, 10)).await;

        let id = dispatcher.reply_at("1790", "hello", noon()).await;

        assert!(id.is_some());
        assert_eq!(dispatcher.platform().write_count(), 2);
        assert_eq!(dispatcher.stats().replies, 1);
    }

    #[tokio::test]
    async fn test_second_throttle_abandons_action() {
        let dir = TempDir::new().unwrap();
        let platform = ScriptedPlatform::failing_with(vec![throttled(), throttled(), throttled()]);
        let mut dispatcher = dispatcher(&dir, platform, limits(50, 10)).await;

        assert!(dispatcher.reply_at("1790", "hello", noon()).await.is_none());

        assert_eq!(dispatcher.platform().write_count(), 2);
        assert_eq!(dispatcher.stats().replies, 0);
        assert!(!dispatcher.tracker().contains("1790"));
    }

    #[tokio::test]
    async fn test_other_failure_not_retried() {
        let dir = TempDir::new().unwrap();
        let platform = ScriptedPlatform::failing_with(vec![CoreError::SocialApi(
            SocialApiError::ServerError { status_code: 503 },
        )]);
        let mut dispatcher = dispatcher(&dir, platform, limits(50, 10)).await;

        assert!(dispatcher.reply_at("1790", "hello", noon()).await.is_none());
        assert_eq!(dispatcher.platform().write_count(), 1);
    }

    #[tokio::test]
    async fn test_counters_reset_on_new_day() {
        let dir = TempDir::new().unwrap();
        let mut dispatcher = dispatcher(&dir, ScriptedPlatform::default(), limits(1, 10)).await;
        let today = noon();
        let tomorrow = today + Duration::days(1);

        assert!(dispatcher.reply_at("1", "today", today).await.is_some());
        assert!(dispatcher.reply_at("2", "tomorrow", tomorrow).await.is_some());

        assert_eq!(dispatcher.stats().date, tomorrow.date_naive());
        assert_eq!(dispatcher.stats().replies, 1);
    }

    #[tokio::test]
    async fn test_publish_respects_post_ceiling() {
        let dir = TempDir::new().unwrap();
        let mut dispatcher = dispatcher(&dir, ScriptedPlatform::default(), limits(50, 1)).await;
        let now = noon();

        assert!(dispatcher.publish_at("first", now).await.is_some());
        assert!(dispatcher.publish_at("second", now).await.is_none());

        assert_eq!(dispatcher.stats().tweets, Some(1));
        assert_eq!(dispatcher.platform().write_count(), 1);
        assert_eq!(dispatcher.platform().writes.borrow()[0].1, None);
    }

    #[tokio::test]
    async fn test_share_reports_outcome() {
        let dir = TempDir::new().unwrap();
        let platform = ScriptedPlatform::failing_with(vec![CoreError::SocialApi(
            SocialApiError::Forbidden {
                resource: "retweets".to_string(),
            },
        )]);
        let mut dispatcher = dispatcher(&dir, platform, limits(50, 10)).await;

        assert!(!dispatcher.share("1790").await);
        assert!(dispatcher.share("1790").await);
        assert_eq!(dispatcher.platform().shares.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_record_growth() {
        let dir = TempDir::new().unwrap();
        let mut dispatcher = dispatcher(&dir, ScriptedPlatform::default(), limits(50, 10)).await;
        let profile = AccountProfile {
            id: "99".to_string(),
            username: "replybot".to_string(),
            followers: Some(120),
            following: Some(80),
            post_count: Some(60),
        };

        let now = Utc.with_ymd_and_hms(2030, 1, 2, 8, 0, 0).unwrap();
        dispatcher.record_growth(&profile, now).await;

        let stats = dispatcher.stats();
        assert_eq!(stats.date, now.date_naive());
        assert_eq!(stats.followers, Some(120));
        assert_eq!(stats.following, Some(80));
        assert_eq!(stats.engagement_rate, Some(2.0));
    }

    #[tokio::test]
    async fn test_save_failure_keeps_memory_counters() {
        let dir = TempDir::new().unwrap();
        let store = StatsStore::new(dir.path().join("missing").join("bot_stats.json"));
        let retry = RetryExecutor::new(RetryConfig::with_backoff(std::time::Duration::from_millis(1)));
        let mut dispatcher =
            ActionDispatcher::new(ScriptedPlatform::default(), store, limits(1, 10), retry).await;
        let now = noon();

        assert!(dispatcher.reply_at("1", "hello", now).await.is_some());
        assert_eq!(dispatcher.stats().replies, 1);
        assert!(dispatcher.reply_at("2", "again", now).await.is_none());
        assert_eq!(dispatcher.platform().write_count(), 1);
    }
}
