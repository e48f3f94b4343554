use crate::dispatcher::ActionDispatcher;
use chrono::Utc;
use engagement_engine::RelevanceScorer;
use llm_interface::{CompletionProvider, DraftContext, DraftGenerator};
use rand::Rng;
use replybot_core::{
    BotConfig, CandidatePost, CoreError, ErrorExt, ErrorRecovery, RecoveryStrategy,
};
use social_client::SocialPlatform;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Counts gathered during one pass over the target accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    pub accounts_polled: usize,
    pub accounts_failed: usize,
    pub candidates: usize,
    pub already_answered: usize,
    pub selected: usize,
    pub drafted: usize,
    pub replies: usize,
    pub shares: usize,
}

pub struct BackgroundService<S, P> {
    config: BotConfig,
    scorer: RelevanceScorer,
    generator: DraftGenerator<P>,
    dispatcher: ActionDispatcher<S>,
    context: DraftContext,
    user_ids: HashMap<String, String>,
}

impl<S: SocialPlatform, P: CompletionProvider> BackgroundService<S, P> {
    pub fn new(
        config: BotConfig,
        generator: DraftGenerator<P>,
        dispatcher: ActionDispatcher<S>,
    ) -> Self {
        let scorer = RelevanceScorer::new(config.scoring.clone());
        let context = DraftContext {
            trending: config.trending_topics.clone(),
            news: config.news_headlines.clone(),
        };

        Self {
            config,
            scorer,
            generator,
            dispatcher,
            context,
            user_ids: HashMap::new(),
        }
    }

    pub fn dispatcher(&self) -> &ActionDispatcher<S> {
        &self.dispatcher
    }

    /// Poll forever. Only a fatal error ends the loop; anything else escaping
    /// an iteration is followed by a recovery wait.
    pub async fn run(&mut self) -> Result<(), CoreError> {
        info!(
            "Starting poll loop over {} accounts",
            self.config.target_accounts.len()
        );

        loop {
            match self.run_iteration().await {
                Ok(report) => {
                    info!(
                        "Iteration done: {} candidates, {} selected, {} replies, {} accounts failed",
                        report.candidates, report.selected, report.replies, report.accounts_failed
                    );
                    let delay = self.next_poll_delay();
                    info!("Next poll in {}s", delay.as_secs());
                    sleep(delay).await;
                }
                Err(e) => {
                    e.log_error();
                    match ErrorRecovery::for_iteration(&e, &self.config.timing) {
                        RecoveryStrategy::Abort => return Err(e),
                        RecoveryStrategy::Backoff(delay) => {
                            warn!("Recovering in {}s", delay.as_secs());
                            sleep(delay).await;
                        }
                        RecoveryStrategy::Skip => {}
                    }
                }
            }
        }
    }

    /// One pass: refresh growth metrics, then walk every target account.
    pub async fn run_iteration(&mut self) -> Result<IterationReport, CoreError> {
        let mut report = IterationReport::default();

        self.refresh_growth().await?;
        let pruned = self
            .dispatcher
            .tracker_mut()
            .prune(self.scorer.policy().answered_retention(), Utc::now());
        if pruned > 0 {
            debug!("Forgot {} answered posts", pruned);
        }

        let accounts = self.config.target_accounts.clone();
        for account in &accounts {
            let posts = match self.fetch_candidates(account).await {
                Ok(posts) => posts,
                Err(e) => match ErrorRecovery::for_item(&e) {
                    RecoveryStrategy::Abort | RecoveryStrategy::Backoff(_) => return Err(e),
                    RecoveryStrategy::Skip => {
                        warn!("Skipping @{} this round: {}", account, e.user_friendly_message());
                        e.log_warn();
                        report.accounts_failed += 1;
                        continue;
                    }
                },
            };

            report.accounts_polled += 1;
            report.candidates += posts.len();
            debug!("@{}: {} candidate posts", account, posts.len());

            for post in &posts {
                self.consider(post, &mut report).await;
            }

            sleep(self.config.timing.account_delay()).await;
        }

        Ok(report)
    }

    /// Compose and publish one original post.
    pub async fn post_original(&mut self) -> Option<String> {
        let draft = self
            .generator
            .generate_original(&self.config.persona, &self.config.viral_strategies)
            .await?;
        self.dispatcher.publish(&draft).await
    }

    async fn refresh_growth(&mut self) -> Result<(), CoreError> {
        match self.dispatcher.platform().verify_credentials().await {
            Ok(profile) => {
                self.dispatcher.record_growth(&profile, Utc::now()).await;
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Growth metrics unavailable: {}", e.user_friendly_message());
                Ok(())
            }
        }
    }

    async fn fetch_candidates(&mut self, account: &str) -> Result<Vec<CandidatePost>, CoreError> {
        let user_id = match self.user_ids.get(account) {
            Some(id) => id.clone(),
            None => {
                let id = self.dispatcher.platform().resolve_user_id(account).await?;
                self.user_ids.insert(account.to_string(), id.clone());
                id
            }
        };

        self.dispatcher
            .platform()
            .recent_posts(account, &user_id, self.config.limits.posts_per_account)
            .await
    }

    async fn consider(&mut self, post: &CandidatePost, report: &mut IterationReport) {
        if self.dispatcher.tracker().contains(&post.id) {
            report.already_answered += 1;
            return;
        }

        let now = Utc::now();
        let verdict = self.scorer.analyze(post, self.dispatcher.tracker(), now);
        if !verdict.engage {
            debug!("Passing on {} (score {}, {:?})", post.id, verdict.score, verdict.reasons);
            return;
        }
        report.selected += 1;

        if self.dispatcher.replies_exhausted(now.date_naive()) {
            debug!("Reply ceiling reached, not drafting for {}", post.id);
            return;
        }

        info!("Engaging with {} by @{} ({:?})", post.id, post.author, verdict.reasons);
        let Some(draft) = self
            .generator
            .generate(post, &self.config.persona, &self.context)
            .await
        else {
            return;
        };
        report.drafted += 1;

        if self.dispatcher.reply(&post.id, &draft).await.is_some() {
            report.replies += 1;
            if self.config.limits.share_after_reply && self.dispatcher.share(&post.id).await {
                report.shares += 1;
            }
        }

        sleep(self.config.timing.action_delay()).await;
    }

    fn next_poll_delay(&self) -> Duration {
        let jitter = rand::thread_rng().gen_range(0..=self.config.timing.poll_jitter_secs);
        self.config.timing.poll_interval() + Duration::from_secs(jitter)
    }
}
