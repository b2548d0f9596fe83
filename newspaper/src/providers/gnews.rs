use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use super::{ensure_success, http_client, map_category, window_start, FetchQuery, Locale, NewsProvider};
use crate::article::{Article, Category};

pub const DEFAULT_BASE_URL: &str = "https://gnews.io/api/v4";

/// gnews.io topics
const TOPICS: &[(Category, &str)] = &[
    (Category::General, "general"),
    (Category::World, "world"),
    (Category::Politics, "nation"),
    (Category::Local, "nation"),
    (Category::Business, "business"),
    (Category::Technology, "technology"),
    (Category::Entertainment, "entertainment"),
    (Category::Sports, "sports"),
    (Category::Science, "science"),
    (Category::Health, "health"),
];

/// gnews.io client (`/top-headlines` and `/search`)
pub struct GNewsProvider {
    base_url: String,
    api_key: String,
    locale: Locale,
    max_age_hours: i64,
    client: Client,
}

impl GNewsProvider {
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

    async fn get(&self, endpoint: &str, mut params: Vec<(&str, String)>) -> Result<Vec<GNewsArticle>> {
        params.push(("lang", self.locale.language.clone()));
        params.push(("from", window_start(self.max_age_hours)));
        params.push(("apikey", self.api_key.clone()));
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .context("gnews request failed")?;
        let response = ensure_success(self.name(), response).await?;
        let body: GNewsResponse = response
            .json()
            .await
            .context("failed to parse gnews response")?;
        if let Some(errors) = body.errors.filter(|e| !e.is_null()) {
            anyhow::bail!("gnews returned errors: {}", errors);
        }
        Ok(body.articles)
    }
}

#[async_trait::async_trait]
impl NewsProvider for GNewsProvider {
    fn name(&self) -> &str {
        "gnews"
    }

    async fn top_headlines(&self, query: &FetchQuery) -> Result<Vec<Article>> {
        let topic = map_category(TOPICS, query.category, "general");
        let params = vec![
            ("category", topic.to_string()),
            ("country", self.locale.country.clone()),
            ("max", query.page_size.clamp(1, 100).to_string()),
        ];
        let items = self.get("top-headlines", params).await?;
        Ok(into_articles(items, query.category.unwrap_or(Category::General)))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Article>> {
        let params = vec![
            ("q", query.to_string()),
            ("max", limit.clamp(1, 100).to_string()),
            ("sortby", "publishedAt".to_string()),
        ];
        let items = self.get("search", params).await?;
        Ok(into_articles(items, Category::General))
    }
}

fn into_articles(items: Vec<GNewsArticle>, category: Category) -> Vec<Article> {
    items
        .into_iter()
        .filter(|a| !a.title.trim().is_empty())
        .map(|a| {
            let source = a.source.and_then(|s| s.name).unwrap_or_else(|| "GNews".to_string());
            Article::new(a.title, a.url.unwrap_or_default(), source, category)
                .with_description(a.description.unwrap_or_default())
                .with_content(a.content)
                .with_image(a.image)
                .with_published_at(a.published_at.unwrap_or_default())
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct GNewsResponse {
    #[serde(default)]
    articles: Vec<GNewsArticle>,
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GNewsArticle {
    #[serde(default)]
    title: String,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    image: Option<String>,
    published_at: Option<String>,
    source: Option<GNewsSource>,
}

#[derive(Debug, Deserialize)]
struct GNewsSource {
    name: Option<String>,
}
