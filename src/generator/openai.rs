//! OpenAI-compatible chat-completions client.
//!
//! Works against any endpoint that speaks `/chat/completions`. Logs model,
//! latency and token usage, never message contents or the API key.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{GeneratedReply, GeneratorError, PersonaGenerator};
use crate::config::GeneratorConfig;
use rehearsal_core::models::ChatMessage;

const CLIENT_USER_AGENT: &str = concat!("rehearsal/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiGenerator {
    /// Builds the client when an API key is configured.
    pub fn from_config(config: &GeneratorConfig) -> Option<Result<Self, GeneratorError>> {
        let api_key = config.api_key.clone()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build();
        Some(client.map_err(GeneratorError::from).map(|client| Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        }))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, system_prompt: &str, transcript: &[ChatMessage]) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(ChatMessageReq {
            role: "system".into(),
            content: system_prompt.into(),
        });
        messages.extend(transcript.iter().map(|m| ChatMessageReq {
            role: m.role.as_str().into(),
            content: m.content.clone(),
        }));

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            stream: false,
        }
    }
}

#[async_trait]
impl PersonaGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(level = "info", skip(self, system_prompt, transcript), fields(model = %self.model, turns = transcript.len()))]
    async fn generate(
        &self,
        system_prompt: &str,
        transcript: &[ChatMessage],
    ) -> Result<GeneratedReply, GeneratorError> {
        let url = format!("{}/chat/completions", self.base_url);
        let req = self.build_request(system_prompt, transcript);
        let start = Instant::now();

        let res = self
            .client
            .post(&url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            let message = extract_error_message(&body).unwrap_or(body);
            warn!(status, elapsed = ?start.elapsed(), "Generator returned an error status");
            return Err(GeneratorError::Status { status, message });
        }

        let body: ChatCompletionResponse = res
            .json()
            .await
            .map_err(|e| GeneratorError::Malformed(e.to_string()))?;
        if let Some(usage) = &body.usage {
            info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Generator usage");
        }

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(GeneratorError::Empty);
        }

        info!(elapsed = ?start.elapsed(), reply_len = text.len(), "Generator reply received");
        Ok(GeneratedReply { text })
    }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessageReq>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessageReq {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResp,
}

#[derive(Deserialize)]
struct ChatMessageResp {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
    #[serde(default)]
    total_tokens: Option<u32>,
}

/// Pulls `error.message` out of an OpenAI-style error body.
fn extract_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorWrap {
        error: ErrorObj,
    }
    #[derive(Deserialize)]
    struct ErrorObj {
        message: String,
    }
    serde_json::from_str::<ErrorWrap>(body)
        .ok()
        .map(|w| w.error.message)
}
