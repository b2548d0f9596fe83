// Summarizer module
use tracing::{debug, warn};

use super::{LlmProvider, Summary, UsageMetadata};

/// Summarize an article with the LLM, falling back to an extractive summary when the call fails
pub async fn summarize_article<P: LlmProvider + ?Sized>(
    provider: &P,
    article_text: &str,
    max_tokens: usize,
) -> Summary {
    match provider.summarize(article_text, max_tokens).await {
        Ok(summary) if !summary.headline.trim().is_empty() => {
            debug!(
                "LLM summarization successful: {} key features, {} tokens",
                summary.bullets.len(),
                summary.usage.total_tokens
            );
            summary
        }
        Ok(_) => {
            warn!("LLM returned an empty summary, falling back to extractive summary");
            extractive_summary(article_text)
        }
        Err(e) => {
            warn!("LLM summarization failed: {}, falling back to extractive summary", e);
            extractive_summary(article_text)
        }
    }
}

/// Sentences of `text`, trimmed, empty ones dropped
pub fn sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extractive summary: first sentence as headline, following ones as key features
pub fn extractive_summary(text: &str) -> Summary {
    let sentences = sentences(text);

    let headline = sentences
        .first()
        .map(|s| truncate(s, 160))
        .unwrap_or_else(|| "No content".to_string());

    let bullets = sentences
        .iter()
        .skip(1)
        .take(5)
        .map(|s| truncate(s, 200))
        .collect();

    Summary {
        headline,
        bullets,
        usage: UsageMetadata::default(),
    }
}

/// Truncate on a char boundary, appending "..." when shortened
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmRequest, LlmResponse};

    struct FailingProvider;

    #[async_trait::async_trait]
    impl LlmProvider for FailingProvider {
        async fn generate(&self, _request: LlmRequest) -> anyhow::Result<LlmResponse> {
            anyhow::bail!("offline")
        }

        async fn summarize(&self, _content: &str, _max_tokens: usize) -> anyhow::Result<Summary> {
            anyhow::bail!("offline")
        }
    }

    #[test]
    fn test_extractive_summary() {
        let text = "First sentence is the headline. Second sentence is a bullet. \
                    Third sentence is another bullet. Fourth is yet another. \
                    Fifth sentence here. Sixth and final. Seventh is dropped.";

        let summary = extractive_summary(text);

        assert_eq!(summary.headline, "First sentence is the headline");
        assert_eq!(summary.bullets.len(), 5);
        assert_eq!(summary.bullets[0], "Second sentence is a bullet");
    }

    #[test]
    fn test_extractive_summary_truncation() {
        let long_sentence = "é".repeat(200);
        let text = format!("{}. Second sentence.", long_sentence);

        let summary = extractive_summary(&text);

        assert_eq!(summary.headline.chars().count(), 160);
        assert!(summary.headline.ends_with("..."));
    }

    #[tokio::test]
    async fn failing_provider_falls_back_to_extractive() {
        let summary = summarize_article(&FailingProvider, "Rates rise. Markets fall.", 100).await;
        assert_eq!(summary.headline, "Rates rise");
        assert_eq!(summary.bullets, vec!["Markets fall".to_string()]);
    }
}
