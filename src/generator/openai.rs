//! OpenAI-compatible chat completions client.
//!
//! Transport failures, timeouts, 429 and 5xx responses are retried with
//! exponential backoff. Other 4xx responses fail immediately.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{calculate_cost, template_for, Generation, GenerationRequest};
use crate::error::{DocError, Result};

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1500;

#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    max_retries: u32,
    /// First backoff delay; doubles per retry.
    backoff: Duration,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: i64,
}

/// Outcome of a single attempt.
enum Attempt {
    Done(Generation),
    Retry(DocError),
    Fail(DocError),
}

impl OpenAiGenerator {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout,
            max_retries: max_retries.max(1),
            backoff: Duration::from_secs(1),
            client: Client::new(),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        timeout: Option<Duration>,
    ) -> Result<Generation> {
        let timeout = timeout.unwrap_or(self.timeout);
        let template = template_for(request.doc_type);
        let prompt = template.render(&request.context, request.features.as_deref());
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: template.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let mut last_error = None;
        for attempt in 1..=self.max_retries {
            match self.attempt(&body, timeout).await {
                Attempt::Done(generation) => {
                    tracing::info!(
                        "Generated {} with {} ({} tokens, ${:.6})",
                        request.doc_type.as_str(),
                        generation.model,
                        generation.tokens,
                        generation.cost
                    );
                    return Ok(generation);
                }
                Attempt::Fail(e) => return Err(e),
                Attempt::Retry(e) => {
                    tracing::warn!(
                        "Generation attempt {}/{} failed: {}",
                        attempt,
                        self.max_retries,
                        e
                    );
                    last_error = Some(e);
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(self.backoff * 2u32.pow(attempt - 1)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DocError::ExternalService("no generation attempts made".to_string())
        }))
    }

    async fn attempt(&self, body: &ChatRequest<'_>, timeout: Duration) -> Attempt {
        let url = format!("{}/chat/completions", self.base_url);
        let send = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send();

        let response = match tokio::time::timeout(timeout, send).await {
            Err(_) => return Attempt::Retry(DocError::GenerationTimeout(timeout)),
            Ok(Err(e)) => {
                return Attempt::Retry(DocError::ExternalService(format!("request failed: {}", e)))
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = DocError::ExternalService(format!("HTTP {}: {}", status, text.trim()));
            return if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                Attempt::Retry(err)
            } else {
                Attempt::Fail(err)
            };
        }

        let parsed = match tokio::time::timeout(timeout, response.json::<ChatResponse>()).await {
            Err(_) => return Attempt::Retry(DocError::GenerationTimeout(timeout)),
            Ok(Err(e)) => {
                return Attempt::Fail(DocError::ExternalService(format!(
                    "invalid response: {}",
                    e
                )))
            }
            Ok(Ok(parsed)) => parsed,
        };

        let Some(content) = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
        else {
            return Attempt::Fail(DocError::ExternalService(
                "response contained no content".to_string(),
            ));
        };

        let tokens = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);
        Attempt::Done(Generation {
            content,
            tokens,
            cost: calculate_cost(&self.model, tokens),
            model: self.model.clone(),
            provider: "openai".to_string(),
            generated_at: Utc::now(),
        })
    }
}
