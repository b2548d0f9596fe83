use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A chat model that can write article summaries.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Raw completion for a single prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;

    /// Headline plus key features for one article's text
    async fn summarize(&self, content: &str, max_tokens: usize) -> Result<Summary>;
}

/// Unset fields fall back to the provider's configured defaults
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Article summary: a one-line AI summary and its key features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// One-line summary
    pub headline: String,
    /// 3-5 key features of the story
    pub bullets: Vec<String>,
    /// Usage metadata for tracking
    #[serde(skip)]
    pub usage: UsageMetadata,
}

/// Token usage metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub mod remote;
pub mod summarizer;

/// Pull the JSON object out of a model reply that may wrap it in a code fence or prose.
pub fn extract_json_from_text(text: &str) -> Option<String> {
    if let Some(block) = fenced_block(text, "```json").or_else(|| fenced_block(text, "```")) {
        return Some(block);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| text[start..=end].to_string())
}

fn fenced_block(text: &str, opener: &str) -> Option<String> {
    let rest = &text[text.find(opener)? + opener.len()..];
    let end = rest.find("```")?;
    Some(rest[..end].trim().to_string())
}

/// Build the summarization provider from `[llm]`.
///
/// `Ok(None)` when no LLM is configured or the adapter is "none". Uses `[llm.summarization]`,
/// falling back to `[llm.remote]`.
pub fn provider_from_config(llm_config: Option<&common::LlmConfig>) -> Result<Option<Arc<dyn LlmProvider>>> {
    let Some(llm_config) = llm_config else {
        return Ok(None);
    };
    let adapter = llm_config.adapter.as_deref().unwrap_or("remote");
    match adapter {
        "none" => Ok(None),
        "remote" => {
            let remote_config = llm_config
                .summarization
                .as_ref()
                .or(llm_config.remote.as_ref())
                .ok_or_else(|| anyhow::anyhow!("Remote adapter selected but no [llm.summarization] or [llm.remote] section"))?;

            // Fetch API key from env var
            let api_key_env = remote_config
                .api_key_env
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Missing api_key_env in remote config"))?;
            let api_key = std::env::var(api_key_env)
                .with_context(|| format!("LLM API key env var '{}' not set", api_key_env))?;

            let model = remote_config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
            let api_url = remote_config
                .api_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string());
            let provider: Arc<dyn LlmProvider> = Arc::new(
                remote::RemoteLlmProvider::new(api_url, api_key, model).with_defaults(
                    remote_config.timeout_seconds.unwrap_or(30),
                    remote_config.max_tokens.unwrap_or(300),
                    0.3,
                ),
            );
            Ok(Some(provider))
        }
        _ => anyhow::bail!("Unknown LLM adapter type: {}", adapter),
    }
}

#[cfg(test)]
mod tests {
    use super::extract_json_from_text;

    #[test]
    fn extracts_fenced_json() {
        let text = "Sure!\n```json\n{\"headline\": \"x\"}\n```\nDone.";
        assert_eq!(extract_json_from_text(text).as_deref(), Some("{\"headline\": \"x\"}"));
    }

    #[test]
    fn extracts_bare_object_with_preamble() {
        let text = "Here is the summary: {\"headline\": \"y\", \"bullets\": []} hope it helps";
        assert_eq!(
            extract_json_from_text(text).as_deref(),
            Some("{\"headline\": \"y\", \"bullets\": []}")
        );
    }

    #[test]
    fn adapter_none_disables_summaries() {
        let cfg: common::LlmConfig = toml::from_str("adapter = \"none\"").expect("parse");
        assert!(super::provider_from_config(Some(&cfg)).expect("ok").is_none());
        assert!(super::provider_from_config(None).expect("ok").is_none());

        let cfg: common::LlmConfig = toml::from_str("adapter = \"remote\"").expect("parse");
        assert!(super::provider_from_config(Some(&cfg)).is_err());
    }

    #[test]
    fn no_json_returns_none() {
        assert!(extract_json_from_text("plain text only").is_none());
        assert!(extract_json_from_text("} backwards {").is_none());
    }
}
