//! News sources queried by the fetch orchestrator.
//!
//! Every source implements [`NewsProvider`]. The orchestrator holds them as an ordered list
//! of trait objects and walks it until one returns enough articles.

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use common::{Config, ProviderConfig};

use crate::article::{Article, Category};
use crate::geocoding::LocationData;

pub mod gnews;
pub mod local;
pub mod mock;
pub mod newsapi;
pub mod newsdata;

pub use gnews::GNewsProvider;
pub use local::LocalNewsProvider;
pub use mock::MockProvider;
pub use newsapi::NewsApiProvider;
pub use newsdata::NewsDataProvider;

/// Parameters of a headline request
#[derive(Debug, Clone, Default)]
pub struct FetchQuery {
    pub category: Option<Category>,
    pub location: Option<LocationData>,
    /// Number of articles to ask for (the target count)
    pub page_size: usize,
}

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    /// Short name used in logs and API responses
    fn name(&self) -> &str;

    /// Latest headlines for the query's category (and location, for local sources)
    async fn top_headlines(&self, query: &FetchQuery) -> Result<Vec<Article>>;

    /// Free-text search
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Article>>;
}

/// Locale shared by every provider, taken from the `[news]` config section
#[derive(Debug, Clone)]
pub struct Locale {
    pub language: String,
    pub country: String,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            country: "us".to_string(),
        }
    }
}

/// Look up a provider-specific category name; unmapped categories use `fallback`.
pub(crate) fn map_category(
    table: &[(Category, &'static str)],
    category: Option<Category>,
    fallback: &'static str,
) -> &'static str {
    category
        .and_then(|c| table.iter().find(|(k, _)| *k == c).map(|(_, v)| *v))
        .unwrap_or(fallback)
}

/// Reverse of [`map_category`], for tagging results
pub(crate) fn category_from_api(table: &[(Category, &'static str)], name: &str) -> Category {
    table
        .iter()
        .find(|(_, v)| v.eq_ignore_ascii_case(name))
        .map(|(k, _)| *k)
        .unwrap_or_else(|| Category::parse(name))
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent("NewspaperAI/0.1.0")
        .build()
        .context("failed to build reqwest client")
}

/// Fail with status and body on non-2xx responses
pub(crate) async fn ensure_success(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("{} API error {}: {}", provider, status, body)
}

/// Start of the freshness window, RFC 3339 UTC with second precision ("2024-05-01T12:00:00Z")
pub(crate) fn window_start(max_age_hours: i64) -> String {
    (Utc::now() - ChronoDuration::hours(max_age_hours.clamp(1, common::MAX_ARTICLE_AGE_HOURS))).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Strip HTML markup from provider snippets
pub(crate) fn plain_text(html: &str) -> String {
    if !html.contains('<') {
        return html.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    let fragment = scraper::Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Providers built from configuration: the optional local source plus the general chain in
/// priority order (newsapi, gnews, newsdata). A provider without an API key is skipped.
pub fn build_providers(
    config: &Config,
) -> Result<(Option<Arc<dyn NewsProvider>>, Vec<Arc<dyn NewsProvider>>)> {
    let locale = Locale {
        language: config.news.language().to_string(),
        country: config.news.country().to_string(),
    };
    let max_age = config.news.max_article_age_hours();

    let local_cfg = config.providers.local.clone().unwrap_or_default();
    let local: Option<Arc<dyn NewsProvider>> = if local_cfg.is_enabled() {
        let base = local_cfg
            .api_url
            .clone()
            .unwrap_or_else(|| local::DEFAULT_BASE_URL.to_string());
        Some(Arc::new(LocalNewsProvider::new(
            base,
            locale.clone(),
            local_cfg.timeout_seconds(),
        )?))
    } else {
        info!("local news provider disabled");
        None
    };

    let mut general: Vec<Arc<dyn NewsProvider>> = Vec::new();

    if let Some((key, cfg)) = keyed("newsapi", config.providers.newsapi.as_ref()) {
        let base = cfg.api_url.clone().unwrap_or_else(|| newsapi::DEFAULT_BASE_URL.to_string());
        general.push(Arc::new(
            NewsApiProvider::new(base, key, locale.clone(), cfg.timeout_seconds())?.with_max_age_hours(max_age),
        ));
    }
    if let Some((key, cfg)) = keyed("gnews", config.providers.gnews.as_ref()) {
        let base = cfg.api_url.clone().unwrap_or_else(|| gnews::DEFAULT_BASE_URL.to_string());
        general.push(Arc::new(
            GNewsProvider::new(base, key, locale.clone(), cfg.timeout_seconds())?.with_max_age_hours(max_age),
        ));
    }
    if let Some((key, cfg)) = keyed("newsdata", config.providers.newsdata.as_ref()) {
        let base = cfg.api_url.clone().unwrap_or_else(|| newsdata::DEFAULT_BASE_URL.to_string());
        general.push(Arc::new(
            NewsDataProvider::new(base, key, locale.clone(), cfg.timeout_seconds())?.with_max_age_hours(max_age),
        ));
    }

    info!(
        local = local.is_some(),
        general = ?general.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
        "news providers configured"
    );
    Ok((local, general))
}

fn keyed<'a>(name: &str, cfg: Option<&'a ProviderConfig>) -> Option<(String, &'a ProviderConfig)> {
    let cfg = cfg?;
    if !cfg.is_enabled() {
        debug!("provider {} disabled in config", name);
        return None;
    }
    match cfg.api_key() {
        Some(key) => Some((key, cfg)),
        None => {
            debug!("provider {} has no API key, skipping", name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[(Category, &str)] = &[(Category::Technology, "tech"), (Category::Sports, "sports")];

    #[test]
    fn unmapped_category_uses_generic_bucket() {
        assert_eq!(map_category(TABLE, Some(Category::Technology), "general"), "tech");
        assert_eq!(map_category(TABLE, Some(Category::Local), "general"), "general");
        assert_eq!(map_category(TABLE, None, "general"), "general");
        assert_eq!(category_from_api(TABLE, "tech"), Category::Technology);
        assert_eq!(category_from_api(TABLE, "Health"), Category::Health);
    }

    #[test]
    fn window_start_is_utc_seconds() {
        let start = window_start(24);
        assert!(start.ends_with('Z'));
        assert_eq!(start.len(), "2024-05-01T12:00:00Z".len());
        let parsed = chrono::DateTime::parse_from_rfc3339(&start).expect("rfc3339");
        let hours = (Utc::now() - parsed.with_timezone(&Utc)).num_hours();
        assert!((23..=24).contains(&hours));
    }

    #[test]
    fn plain_text_strips_markup() {
        let text = plain_text("<a href=\"https://x\">Council votes</a>&nbsp;<font>Daily</font>");
        assert!(text.contains("Council votes"));
        assert!(!text.contains('<'));
        assert_eq!(plain_text("  no markup "), "no markup");
    }

    #[test]
    fn providers_without_keys_are_skipped() {
        let cfg: Config = toml::from_str(
            r#"
            [providers.newsapi]
            api_key_env = "NEWSPAPER_TEST_NEWSAPI_KEY_THAT_IS_NOT_SET"
            [providers.local]
            enabled = false
            "#,
        )
        .expect("config");
        let (local, general) = build_providers(&cfg).expect("build");
        assert!(local.is_none());
        assert!(general.is_empty());
    }
}
