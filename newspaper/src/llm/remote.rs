use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{extract_json_from_text, LlmProvider, LlmRequest, LlmResponse, Summary, UsageMetadata};

const EDITOR_INSTRUCTIONS: &str = r#"You write the AI summary shown on a news card.
Reply with strict JSON and nothing else:
{"headline": "one sentence, at most 160 characters, saying what happened and why it matters",
 "bullets": ["3 to 5 short key features: facts, numbers, who is involved"]}
Only use facts present in the article. Keep the article's language."#;

/// Summarization client for OpenAI-compatible `chat/completions` endpoints
pub struct RemoteLlmProvider {
    endpoint: String,
    api_key: String,
    model: String,
    settings: ChatSettings,
    client: reqwest::Client,
}

/// Per-request values used when the caller leaves them unset
#[derive(Debug, Clone, Copy)]
struct ChatSettings {
    timeout: Duration,
    max_tokens: usize,
    temperature: f32,
}

impl RemoteLlmProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            settings: ChatSettings {
                timeout: Duration::from_secs(30),
                max_tokens: 300,
                temperature: 0.3,
            },
            client: reqwest::Client::new(),
        }
    }

    pub fn with_defaults(mut self, timeout_secs: u64, max_tokens: usize, temperature: f32) -> Self {
        self.settings = ChatSettings {
            timeout: Duration::from_secs(timeout_secs),
            max_tokens,
            temperature,
        };
        self
    }

    async fn complete(&self, messages: Vec<ChatMessage>, request: &LlmRequest) -> Result<LlmResponse> {
        let timeout = request
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.settings.timeout);
        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens.unwrap_or(self.settings.max_tokens),
            temperature: request.temperature.unwrap_or(self.settings.temperature),
        };

        // reqwest's per-request timeout covers connect, headers and body
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error {}: {}", status, text);
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| transport_error(e, timeout))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("LLM response has no choices")?;

        Ok(LlmResponse {
            content,
            usage: parsed.usage.map(UsageMetadata::from).unwrap_or_default(),
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> anyhow::Error {
    if err.is_timeout() {
        anyhow!("LLM request timed out after {}s", timeout.as_secs())
    } else if err.is_decode() {
        anyhow!("Failed to parse LLM response: {}", err)
    } else {
        anyhow!("LLM HTTP request failed: {}", err)
    }
}

#[async_trait::async_trait]
impl LlmProvider for RemoteLlmProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let messages = vec![ChatMessage::user(request.prompt.clone())];
        self.complete(messages, &request).await
    }

    async fn summarize(&self, content: &str, max_tokens: usize) -> Result<Summary> {
        let request = LlmRequest {
            prompt: content.to_string(),
            max_tokens: Some(max_tokens),
            temperature: None,
            timeout_seconds: None,
        };
        let messages = vec![
            ChatMessage::system(EDITOR_INSTRUCTIONS),
            ChatMessage::user(format!("ARTICLE:\n{}", content)),
        ];
        let response = self.complete(messages, &request).await?;

        let json = extract_json_from_text(&response.content)
            .context("No valid JSON found in LLM summary response")?;
        let parsed: SummaryJson = serde_json::from_str(&json)
            .with_context(|| format!("LLM summary is not the expected JSON: {}", json))?;

        Ok(Summary {
            headline: parsed.headline.trim().to_string(),
            bullets: parsed
                .bullets
                .into_iter()
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect(),
            usage: response.usage,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

impl From<ChatUsage> for UsageMetadata {
    fn from(u: ChatUsage) -> Self {
        UsageMetadata {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SummaryJson {
    headline: String,
    #[serde(default)]
    bullets: Vec<String>,
}
