use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ensure_success, http_client, map_category, window_start, FetchQuery, Locale, NewsProvider};
use crate::article::{Article, Category};

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

/// newsapi.org category names
const CATEGORIES: &[(Category, &str)] = &[
    (Category::General, "general"),
    (Category::Business, "business"),
    (Category::Technology, "technology"),
    (Category::Science, "science"),
    (Category::Health, "health"),
    (Category::Sports, "sports"),
    (Category::Entertainment, "entertainment"),
];

/// newsapi.org client (`/top-headlines` and `/everything`)
pub struct NewsApiProvider {
    base_url: String,
    api_key: String,
    locale: Locale,
    max_age_hours: i64,
    client: Client,
}

impl NewsApiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        locale: Locale,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            locale,
            max_age_hours: common::DEFAULT_MAX_ARTICLE_AGE_HOURS,
            client: http_client(timeout_secs)?,
        })
    }

    /// Only ask for articles published within the last `hours`.
    pub fn with_max_age_hours(mut self, hours: i64) -> Self {
        self.max_age_hours = hours.clamp(1, common::MAX_ARTICLE_AGE_HOURS);
        self
    }

    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<NewsApiResponse> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(params)
            .send()
            .await
            .context("newsapi request failed")?;
        let response = ensure_success(self.name(), response).await?;
        let body: NewsApiResponse = response
            .json()
            .await
            .context("failed to parse newsapi response")?;
        if body.status != "ok" {
            anyhow::bail!(
                "newsapi returned status {}: {}",
                body.status,
                body.message.unwrap_or_default()
            );
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl NewsProvider for NewsApiProvider {
    fn name(&self) -> &str {
        "newsapi"
    }

    // top-headlines has no date filter; it only returns current stories
    async fn top_headlines(&self, query: &FetchQuery) -> Result<Vec<Article>> {
        let api_category = map_category(CATEGORIES, query.category, "general");
        let params = [
            ("country", self.locale.country.clone()),
            ("category", api_category.to_string()),
            ("pageSize", query.page_size.clamp(1, 100).to_string()),
        ];
        let body = self.get("top-headlines", &params).await?;
        debug!(total = ?body.total_results, "newsapi top-headlines");
        let category = query.category.unwrap_or(Category::General);
        Ok(into_articles(body.articles, category))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Article>> {
        let params = [
            ("q", query.to_string()),
            ("language", self.locale.language.clone()),
            ("sortBy", "publishedAt".to_string()),
            ("from", window_start(self.max_age_hours)),
            ("pageSize", limit.clamp(1, 100).to_string()),
        ];
        let body = self.get("everything", &params).await?;
        Ok(into_articles(body.articles, Category::General))
    }
}

fn into_articles(items: Vec<NewsApiArticle>, category: Category) -> Vec<Article> {
    items
        .into_iter()
        // newsapi blanks out takedowns as "[Removed]"
        .filter(|a| {
            a.title
                .as_deref()
                .map(|t| !t.trim().is_empty() && t != "[Removed]")
                .unwrap_or(false)
        })
        .map(|a| {
            let source = a.source.and_then(|s| s.name).unwrap_or_else(|| "NewsAPI".to_string());
            Article::new(a.title.unwrap_or_default(), a.url.unwrap_or_default(), source, category)
                .with_description(a.description.unwrap_or_default())
                .with_content(a.content)
                .with_image(a.url_to_image)
                .with_published_at(a.published_at.unwrap_or_default())
                .with_author(a.author)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    total_results: Option<u64>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    source: Option<NewsApiSource>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}
