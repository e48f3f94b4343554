use crate::rate_tracker::RateTracker;
use chrono::{DateTime, Utc};
use replybot_core::{CandidatePost, ScoringPolicy};
use std::collections::HashSet;
use tracing::debug;

/// Why a post gained points or was decided early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreReason {
    WindowSaturated { recent: usize },
    AlreadyAnswered,
    PriorityAuthor,
    TooOld,
    Topic(String),
    Engagement,
    ShortText,
    Question,
    Hook(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementVerdict {
    pub engage: bool,
    pub score: u32,
    pub reasons: Vec<ScoreReason>,
}

impl EngagementVerdict {
    fn early(engage: bool, reason: ScoreReason) -> Self {
        Self {
            engage,
            score: 0,
            reasons: vec![reason],
        }
    }
}

/// Keyword and heuristic relevance scoring. Holds no state besides its policy;
/// every call is a pure function of the post, the tracker and `now`.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    policy: ScoringPolicy,
    priority_authors: HashSet<String>,
    topic_keywords: Vec<String>,
    hook_phrases: Vec<String>,
}

impl RelevanceScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        let priority_authors = policy
            .priority_authors
            .iter()
            .map(|author| normalize_handle(author))
            .collect();
        let topic_keywords = lowercase_all(&policy.topic_keywords);
        let hook_phrases = lowercase_all(&policy.hook_phrases);

        Self {
            policy,
            priority_authors,
            topic_keywords,
            hook_phrases,
        }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn is_priority(&self, author: &str) -> bool {
        self.priority_authors.contains(&normalize_handle(author))
    }

    pub fn decide(&self, post: &CandidatePost, recent: &RateTracker, now: DateTime<Utc>) -> bool {
        self.analyze(post, recent, now).engage
    }

    pub fn analyze(
        &self,
        post: &CandidatePost,
        recent: &RateTracker,
        now: DateTime<Utc>,
    ) -> EngagementVerdict {
        let recent_count = recent.count_within(self.policy.window(), now);
        if recent_count >= self.policy.max_actions_per_window {
            debug!(
                "Window saturated ({} of {}), skipping post {}",
                recent_count, self.policy.max_actions_per_window, post.id
            );
            return EngagementVerdict::early(
                false,
                ScoreReason::WindowSaturated {
                    recent: recent_count,
                },
            );
        }

        if recent.contains(&post.id) {
            return EngagementVerdict::early(false, ScoreReason::AlreadyAnswered);
        }

        // Past the retention horizon the tracker may have forgotten the reply.
        if self.is_priority(&post.author) {
            if post.age(now) > self.policy.answered_retention() {
                return EngagementVerdict::early(false, ScoreReason::TooOld);
            }
            return EngagementVerdict::early(true, ScoreReason::PriorityAuthor);
        }

        if post.age(now) > self.policy.max_age() {
            return EngagementVerdict::early(false, ScoreReason::TooOld);
        }

        let text = post.text.to_lowercase();
        let mut score = 0;
        let mut reasons = Vec::new();

        if let Some(topic) = self.topic_keywords.iter().find(|t| text.contains(t.as_str())) {
            score += self.policy.topic_points;
            reasons.push(ScoreReason::Topic(topic.clone()));
        }

        if post.likes > self.policy.min_likes || post.shares > self.policy.min_shares {
            score += self.policy.engagement_points;
            reasons.push(ScoreReason::Engagement);
        }

        if post.text.chars().count() <= self.policy.short_text_chars {
            score += self.policy.short_text_points;
            reasons.push(ScoreReason::ShortText);
        }

        if post.text.contains('?') {
            score += self.policy.question_points;
            reasons.push(ScoreReason::Question);
        }

        if let Some(hook) = self.hook_phrases.iter().find(|h| text.contains(h.as_str())) {
            score += self.policy.hook_points;
            reasons.push(ScoreReason::Hook(hook.clone()));
        }

        let engage = score >= self.policy.threshold;
        debug!(
            "Post {} by @{} scored {} (threshold {}): {:?}",
            post.id, post.author, score, self.policy.threshold, reasons
        );

        EngagementVerdict {
            engage,
            score,
            reasons,
        }
    }
}

fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}
