use crate::provider::{ChatMessage, CompletionProvider, CompletionRequest};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use replybot_core::{BotConfig, CandidatePost, ErrorExt};
use tracing::{debug, warn};

/// Hard length limit of a post on the platform.
pub const MAX_POST_CHARS: usize = 280;

const QUOTE_CHARS: [char; 3] = ['"', '\u{201C}', '\u{201D}'];

/// Optional situational context folded into the prompt.
#[derive(Debug, Clone, Default)]
pub struct DraftContext {
    pub trending: Vec<String>,
    pub news: Vec<String>,
}

impl DraftContext {
    pub fn is_empty(&self) -> bool {
        self.trending.is_empty() && self.news.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub hashtag_pool: Vec<String>,
    pub topic_keywords: Vec<String>,
    pub max_hashtags: usize,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_tokens: 100,
            temperature: 0.9,
            hashtag_pool: Vec::new(),
            topic_keywords: Vec::new(),
            max_hashtags: 2,
        }
    }
}

impl GeneratorSettings {
    /// Hashtags are matched against the same keywords the scorer uses.
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            hashtag_pool: config.hashtag_pool.clone(),
            topic_keywords: config.scoring.topic_keywords.clone(),
            ..Default::default()
        }
    }
}

/// Turns a post plus persona into a ready-to-publish reply.
pub struct DraftGenerator<P> {
    provider: P,
    settings: GeneratorSettings,
    rng: StdRng,
}

impl<P: CompletionProvider> DraftGenerator<P> {
    pub fn new(provider: P, settings: GeneratorSettings) -> Self {
        Self::with_rng(provider, settings, StdRng::from_entropy())
    }

    pub fn with_rng(provider: P, settings: GeneratorSettings, rng: StdRng) -> Self {
        Self {
            provider,
            settings,
            rng,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Draft a reply to `post`. `None` means "skip this post": the provider
    /// failed or returned nothing usable.
    pub async fn generate(
        &mut self,
        post: &CandidatePost,
        persona: &str,
        context: &DraftContext,
    ) -> Option<String> {
        let messages = vec![
            ChatMessage::system(persona),
            ChatMessage::user(reply_instruction(post, context)),
        ];
        self.complete_and_polish(messages, &post.id).await
    }

    /// Draft a standalone post following one of `strategies`, picked at random.
    pub async fn generate_original(&mut self, persona: &str, strategies: &[String]) -> Option<String> {
        let strategy = if strategies.is_empty() {
            "Share an insight about AI and the future of tech".to_string()
        } else {
            strategies[self.rng.gen_range(0..strategies.len())].clone()
        };
        debug!("Composing original post with strategy: {}", strategy);

        let messages = vec![
            ChatMessage::system(persona),
            ChatMessage::user(format!("Create a viral tweet using: {}", strategy)),
        ];
        self.complete_and_polish(messages, "original").await
    }

    async fn complete_and_polish(&mut self, messages: Vec<ChatMessage>, label: &str) -> Option<String> {
        let request = CompletionRequest {
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let raw = match self.provider.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("No draft for {}: {}", label, e.user_friendly_message());
                e.log_warn();
                return None;
            }
        };

        let cleaned = truncate_chars(&strip_quotes(&raw), MAX_POST_CHARS);
        if cleaned.is_empty() {
            warn!("Draft for {} was empty after cleanup", label);
            return None;
        }

        let tags = self.pick_hashtags();
        Some(append_hashtags(cleaned, &tags))
    }

    fn pick_hashtags(&mut self) -> Vec<String> {
        let mut eligible =
            eligible_hashtags(&self.settings.hashtag_pool, &self.settings.topic_keywords);
        if eligible.is_empty() || self.settings.max_hashtags == 0 {
            return Vec::new();
        }

        eligible.shuffle(&mut self.rng);
        let count = self
            .rng
            .gen_range(0..=self.settings.max_hashtags)
            .min(eligible.len());
        eligible.truncate(count);
        eligible
    }
}

fn reply_instruction(post: &CandidatePost, context: &DraftContext) -> String {
    let mut prompt = String::new();
    if !context.trending.is_empty() {
        prompt.push_str(&format!("Trending right now: {}\n", context.trending.join(", ")));
    }
    if !context.news.is_empty() {
        prompt.push_str(&format!("Recent news: {}\n", context.news.join("; ")));
    }
    if !context.is_empty() {
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "Write a short, engaging reply to this tweet by @{}:\n{}\n\n\
         Reply in under 240 characters, without quotation marks or hashtags.",
        post.author, post.text
    ));
    prompt
}

/// Completions like to wrap their answer in quotes; never echo them.
pub fn strip_quotes(text: &str) -> String {
    text.chars()
        .filter(|c| !QUOTE_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Pool entries whose label matches a topic keyword, in either direction.
pub fn eligible_hashtags(pool: &[String], topics: &[String]) -> Vec<String> {
    let topics: Vec<String> = topics.iter().map(|t| t.to_lowercase()).collect();
    pool.iter()
        .filter(|tag| {
            let label = tag.trim_start_matches('#').to_lowercase();
            !label.is_empty()
                && topics
                    .iter()
                    .any(|topic| topic.contains(&label) || label.contains(topic.as_str()))
        })
        .cloned()
        .collect()
}

/// Append tags one by one while the post stays within the length limit.
pub fn append_hashtags(mut text: String, tags: &[String]) -> String {
    for tag in tags {
        let tag = if tag.starts_with('#') {
            tag.clone()
        } else {
            format!("#{}", tag)
        };
        if text.chars().count() + 1 + tag.chars().count() > MAX_POST_CHARS {
            break;
        }
        text.push(' ');
        text.push_str(&tag);
    }
    text
}
