use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::article::{Article, Category};
use crate::geocoding::LocationData;
use crate::llm::summarizer::{self, sentences, truncate};
use crate::llm::LlmProvider;

const WORDS_PER_MINUTE: usize = 200;
const DEFAULT_AUTHOR: &str = "Newspaper.AI Staff";

/// Decorates fetched articles with relevance text, summaries and display defaults.
pub struct Enricher {
    summarizer: Option<Arc<dyn LlmProvider>>,
    max_ai_summaries: usize,
    summary_max_tokens: usize,
    max_age_hours: i64,
}

impl Enricher {
    pub fn new(summarizer: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            summarizer,
            max_ai_summaries: 10,
            summary_max_tokens: 300,
            max_age_hours: common::DEFAULT_MAX_ARTICLE_AGE_HOURS,
        }
    }

    pub fn with_limits(mut self, max_ai_summaries: usize, max_age_hours: i64) -> Self {
        self.max_ai_summaries = max_ai_summaries;
        self.max_age_hours = max_age_hours.clamp(1, common::MAX_ARTICLE_AGE_HOURS);
        self
    }

    pub fn has_summarizer(&self) -> bool {
        self.summarizer.is_some()
    }

    /// Enrich a batch. Never fails: a summarization error falls back to the templated summary.
    pub async fn enrich(&self, articles: Vec<Article>, location: Option<&LocationData>) -> Vec<Article> {
        let now = Utc::now();
        let mut enriched = Vec::with_capacity(articles.len());
        let mut ai_calls = 0usize;

        for mut article in articles {
            article.relevance_reason = Some(relevance_reason(&article, location));
            apply_defaults(&mut article, now, self.max_age_hours);

            if article.ai_summary.is_none() {
                let summary = match &self.summarizer {
                    Some(provider) if ai_calls < self.max_ai_summaries => {
                        ai_calls += 1;
                        match provider.summarize(article.body_text(), self.summary_max_tokens).await {
                            Ok(summary) if !summary.headline.trim().is_empty() => Some(summary),
                            Ok(_) => {
                                warn!("enrichment: empty LLM summary for {}, using template", article.url);
                                None
                            }
                            Err(e) => {
                                warn!("enrichment: LLM summary failed for {}: {}, using template", article.url, e);
                                None
                            }
                        }
                    }
                    _ => None,
                };

                match summary {
                    Some(summary) => {
                        article.ai_summary = Some(summary.headline.trim().to_string());
                        article.key_features = if summary.bullets.is_empty() {
                            template_key_features(&article)
                        } else {
                            summary.bullets
                        };
                    }
                    None => {
                        article.ai_summary = Some(template_summary(&article));
                        if article.key_features.is_empty() {
                            article.key_features = template_key_features(&article);
                        }
                    }
                }
            }

            enriched.push(article);
        }

        if ai_calls > 0 {
            info!("enrichment: {} of {} articles summarized by LLM", ai_calls, enriched.len());
        } else {
            debug!("enrichment: {} articles, templated summaries", enriched.len());
        }
        enriched
    }
}

/// Why this article is shown to the reader.
pub fn relevance_reason(article: &Article, location: Option<&LocationData>) -> String {
    let place = location.and_then(|l| l.place_name());

    if article.is_local_news {
        if let Some(place) = place {
            return format!("Happening near you in {}", place);
        }
        if let Some(relevance) = &article.location_relevance {
            return relevance.clone();
        }
        return "Local news for your area".to_string();
    }

    if let Some(place) = place {
        if article.mentions(place) {
            return format!("Mentions {}, near your location", place);
        }
    }

    match article.category {
        Category::General => "Top story right now".to_string(),
        Category::Local => "From your area".to_string(),
        other => format!("Top story in {}", other),
    }
}

/// "N min read" from the article text. newsapi truncates content with "[+N chars]", which is
/// counted too.
pub fn read_time(article: &Article) -> String {
    let text = article.body_text();
    let mut words = text.split_whitespace().count();
    if let Some(hidden) = truncated_chars(text) {
        // ~6 chars per word including the space
        words += hidden / 6;
    }
    let minutes = ((words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE).max(1);
    format!("{} min read", minutes)
}

fn truncated_chars(text: &str) -> Option<usize> {
    let start = text.rfind("[+")?;
    let rest = &text[start + 2..];
    let end = rest.find(" chars]")?;
    rest[..end].trim().parse().ok()
}

/// Deterministic view count in 1 000..50 000 derived from the article id.
pub fn default_views(id: &str) -> u64 {
    // FNV-1a
    let hash = id
        .bytes()
        .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
    1_000 + hash % 49_000
}

/// Recency score: 100 for brand new, 40 at the edge of the freshness window. Local news +5.
pub fn trending_score(article: &Article, now: DateTime<Utc>, max_age_hours: i64) -> u8 {
    let window = (max_age_hours.clamp(1, common::MAX_ARTICLE_AGE_HOURS) * 3600) as f64;
    let age = article
        .published()
        .map(|p| (now - p).num_seconds().max(0) as f64)
        .unwrap_or(window);
    let fraction = (age / window).min(1.0);
    let mut score = 100.0 - 60.0 * fraction;
    if article.is_local_news {
        score += 5.0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

fn apply_defaults(article: &mut Article, now: DateTime<Utc>, max_age_hours: i64) {
    if article.read_time.is_none() {
        article.read_time = Some(read_time(article));
    }
    if article.views.is_none() {
        article.views = Some(default_views(&article.id));
    }
    if article.author.is_none() {
        article.author = Some(if article.source.trim().is_empty() {
            DEFAULT_AUTHOR.to_string()
        } else {
            article.source.clone()
        });
    }
    if article.trending_score.is_none() {
        article.trending_score = Some(trending_score(article, now, max_age_hours));
    }
}

/// Fixed-sentence summary used when no summarization API is configured or the call fails.
pub fn template_summary(article: &Article) -> String {
    let lead = sentences(&article.description)
        .first()
        .map(|s| truncate(s, 160))
        .unwrap_or_else(|| truncate(&article.title, 160));
    format!(
        "This {} story from {} reports: {}.",
        article.category.as_str().to_lowercase(),
        if article.source.is_empty() { "our newsroom" } else { article.source.as_str() },
        lead.trim_end_matches('.')
    )
}

fn template_key_features(article: &Article) -> Vec<String> {
    let from_text: Vec<String> = summarizer::extractive_summary(&article.description)
        .bullets
        .into_iter()
        .take(3)
        .collect();
    if !from_text.is_empty() {
        return from_text;
    }
    vec![
        format!("{} coverage", article.category),
        format!("Reported by {}", if article.source.is_empty() { DEFAULT_AUTHOR } else { article.source.as_str() }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmRequest, LlmResponse, Summary, UsageMetadata};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LlmProvider for CountingProvider {
        async fn generate(&self, _request: LlmRequest) -> anyhow::Result<LlmResponse> {
            anyhow::bail!("not used")
        }

        async fn summarize(&self, _content: &str, _max_tokens: usize) -> anyhow::Result<Summary> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Summary {
                headline: "AI headline".to_string(),
                bullets: vec!["one".to_string(), "two".to_string()],
                usage: UsageMetadata::default(),
            })
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl LlmProvider for FailingProvider {
        async fn generate(&self, _request: LlmRequest) -> anyhow::Result<LlmResponse> {
            anyhow::bail!("not used")
        }

        async fn summarize(&self, _content: &str, _max_tokens: usize) -> anyhow::Result<Summary> {
            anyhow::bail!("LLM API error 503 Service Unavailable: overloaded")
        }
    }

    fn sample(title: &str, category: Category) -> Article {
        Article::new(title, format!("https://news.test/{}", title.replace(' ', "-")), "Wire", category)
            .with_description("First point here. Second point here. Third point here.")
    }

    #[tokio::test]
    async fn template_fallback_without_summarizer() {
        let enricher = Enricher::new(None);
        let out = enricher.enrich(vec![sample("Rates hold", Category::Business)], None).await;
        let a = &out[0];
        assert_eq!(
            a.ai_summary.as_deref(),
            Some("This business story from Wire reports: First point here.")
        );
        assert_eq!(a.key_features, vec!["Second point here", "Third point here"]);
        assert_eq!(a.relevance_reason.as_deref(), Some("Top story in Business"));
        assert_eq!(a.read_time.as_deref(), Some("1 min read"));
        assert_eq!(a.author.as_deref(), Some("Wire"));
        assert!(a.views.is_some());
        assert!(a.trending_score.is_some());
    }

    #[tokio::test]
    async fn uses_summarizer_up_to_limit() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let enricher = Enricher::new(Some(provider.clone())).with_limits(2, 48);
        let articles = vec![
            sample("a", Category::Technology),
            sample("b", Category::Technology),
            sample("c", Category::Technology),
        ];
        let out = enricher.enrich(articles, None).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(out[0].ai_summary.as_deref(), Some("AI headline"));
        assert_eq!(out[1].key_features, vec!["one", "two"]);
        assert!(out[2].ai_summary.as_deref().unwrap_or_default().starts_with("This technology story"));
    }

    #[tokio::test]
    async fn failing_summarizer_gets_template_summary() {
        let enricher = Enricher::new(Some(Arc::new(FailingProvider)));
        let out = enricher.enrich(vec![sample("Rates hold", Category::Business)], None).await;
        assert_eq!(
            out[0].ai_summary.as_deref(),
            Some("This business story from Wire reports: First point here.")
        );
        assert_eq!(out[0].key_features, vec!["Second point here", "Third point here"]);
    }

    #[test]
    fn relevance_mentions_location() {
        let austin = LocationData::from_city("Austin");
        let article = sample("Austin opens new library", Category::General);
        assert_eq!(
            relevance_reason(&article, Some(&austin)),
            "Mentions Austin, near your location"
        );

        let mut local = sample("Road closures", Category::Local);
        local.is_local_news = true;
        assert_eq!(relevance_reason(&local, Some(&austin)), "Happening near you in Austin");
        assert_eq!(relevance_reason(&sample("x", Category::General), None), "Top story right now");
    }

    #[test]
    fn read_time_counts_truncated_content() {
        let article = Article::new("t", "u", "s", Category::General)
            .with_content(Some("Short teaser text [+2400 chars]".to_string()));
        // 5 words + 400 hidden = 405 -> 3 minutes
        assert_eq!(read_time(&article), "3 min read");
    }

    #[test]
    fn views_are_deterministic_and_bounded() {
        let v1 = default_views("abc");
        assert_eq!(v1, default_views("abc"));
        assert!((1_000..50_000).contains(&v1));
    }

    #[test]
    fn trending_score_decays_with_age() {
        let now = Utc::now();
        let fresh = Article::new("t", "u1", "s", Category::General)
            .with_published_at(now.to_rfc3339());
        let old = Article::new("t", "u2", "s", Category::General)
            .with_published_at((now - chrono::Duration::hours(48)).to_rfc3339());
        assert_eq!(trending_score(&fresh, now, 48), 100);
        assert_eq!(trending_score(&old, now, 48), 40);
        // absurd windows are capped instead of overflowing
        assert_eq!(trending_score(&fresh, now, i64::MAX), 100);
    }
}
