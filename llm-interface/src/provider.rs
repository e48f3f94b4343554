use replybot_core::{CoreError, LlmConfig, LlmError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const PROVIDER: &str = "openai";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A text-completion backend: prompt in, bounded text out.
#[allow(async_fn_in_trait)]
pub trait CompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CoreError>;
}

pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: ChatMessage,
}

impl OpenAiProvider {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, CoreError> {
        Ok(Self {
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
        })
    }
}

impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CoreError> {
        let body = OpenAiRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!("Calling completion API with model: {}", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::Llm(LlmError::RequestTimeout {
                        provider: PROVIDER.to_string(),
                    })
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Completion API error {}: {}", status, error_text);
            let error = match status.as_u16() {
                401 | 403 => LlmError::InvalidApiKey {
                    provider: PROVIDER.to_string(),
                },
                404 => LlmError::ModelNotAvailable {
                    model: self.model.clone(),
                },
                429 => LlmError::RateLimitExceeded {
                    provider: PROVIDER.to_string(),
                    retry_after: 20,
                },
                400 if error_text.contains("content_filter") => LlmError::ContentFiltered {
                    reason: error_text,
                },
                code if code >= 500 => LlmError::ServiceUnavailable {
                    provider: PROVIDER.to_string(),
                },
                _ => LlmError::InvalidResponseFormat {
                    provider: PROVIDER.to_string(),
                },
            };
            return Err(error.into());
        }

        let api_response: OpenAiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse completion response: {}", e);
            LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
            }
        })?;

        let text = api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::EmptyCompletion {
                provider: PROVIDER.to_string(),
            }
            .into());
        }

        Ok(text)
    }
}
