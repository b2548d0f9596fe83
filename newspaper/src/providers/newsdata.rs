use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use super::{
    category_from_api, ensure_success, http_client, map_category, FetchQuery, Locale, NewsProvider,
};
use crate::article::{Article, Category};

pub const DEFAULT_BASE_URL: &str = "https://newsdata.io/api/1";

/// newsdata.io categories. "top" is the generic bucket.
const CATEGORIES: &[(Category, &str)] = &[
    (Category::General, "top"),
    (Category::World, "world"),
    (Category::Politics, "politics"),
    (Category::Business, "business"),
    (Category::Technology, "technology"),
    (Category::Science, "science"),
    (Category::Health, "health"),
    (Category::Sports, "sports"),
    (Category::Entertainment, "entertainment"),
];

// paid plans allow up to 50 results per page, the free plan 10
const MAX_PAGE_SIZE: usize = 50;
// `timeframe` accepts 1 to 48 hours
const MAX_TIMEFRAME_HOURS: i64 = 48;

/// newsdata.io client (`/latest`)
pub struct NewsDataProvider {
    base_url: String,
    api_key: String,
    locale: Locale,
    max_age_hours: i64,
    client: Client,
}

impl NewsDataProvider {
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

    async fn latest(&self, mut params: Vec<(&str, String)>) -> Result<Vec<NewsDataArticle>> {
        params.push(("language", self.locale.language.clone()));
        params.push(("timeframe", self.max_age_hours.clamp(1, MAX_TIMEFRAME_HOURS).to_string()));
        params.push(("apikey", self.api_key.clone()));
        let url = format!("{}/latest", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .context("newsdata request failed")?;
        let response = ensure_success(self.name(), response).await?;
        let body: NewsDataResponse = response
            .json()
            .await
            .context("failed to parse newsdata response")?;

        // on error "results" is an object with a message instead of a list
        if body.status != "success" {
            let message = body
                .results
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            anyhow::bail!("newsdata returned status {}: {}", body.status, message);
        }
        serde_json::from_value(body.results).context("unexpected newsdata results shape")
    }
}

#[async_trait::async_trait]
impl NewsProvider for NewsDataProvider {
    fn name(&self) -> &str {
        "newsdata"
    }

    async fn top_headlines(&self, query: &FetchQuery) -> Result<Vec<Article>> {
        let params = vec![
            ("category", map_category(CATEGORIES, query.category, "top").to_string()),
            ("country", self.locale.country.clone()),
            ("size", query.page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        let items = self.latest(params).await?;
        Ok(into_articles(items, query.category))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Article>> {
        let params = vec![
            ("q", query.to_string()),
            ("size", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        let items = self.latest(params).await?;
        Ok(into_articles(items, None))
    }
}

fn into_articles(items: Vec<NewsDataArticle>, requested: Option<Category>) -> Vec<Article> {
    items
        .into_iter()
        .filter(|a| !a.title.trim().is_empty())
        .map(|a| {
            let category = requested.unwrap_or_else(|| {
                a.category
                    .first()
                    .map(|c| category_from_api(CATEGORIES, c))
                    .unwrap_or(Category::General)
            });
            let source = a
                .source_name
                .or(a.source_id)
                .unwrap_or_else(|| "NewsData".to_string());
            let author = a.creator.and_then(|c| c.into_iter().next());
            // content is "ONLY AVAILABLE IN PAID PLANS" on the free tier
            let content = a.content.filter(|c| !c.starts_with("ONLY AVAILABLE"));
            Article::new(a.title, a.link.unwrap_or_default(), source, category)
                .with_description(a.description.unwrap_or_default())
                .with_content(content)
                .with_image(a.image_url)
                .with_published_at(a.pub_date.unwrap_or_default())
                .with_author(author)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct NewsDataResponse {
    status: String,
    #[serde(default)]
    results: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct NewsDataArticle {
    #[serde(default)]
    title: String,
    link: Option<String>,
    description: Option<String>,
    content: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    image_url: Option<String>,
    source_id: Option<String>,
    source_name: Option<String>,
    creator: Option<Vec<String>>,
    #[serde(default)]
    category: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_results_and_infers_category() {
        let json = r#"{
            "status": "success",
            "totalResults": 1,
            "results": [{
                "article_id": "abc",
                "title": "Vaccine trial shows promise",
                "link": "https://health.test/vaccine",
                "description": "Phase 3 results.",
                "content": "ONLY AVAILABLE IN PAID PLANS",
                "pubDate": "2024-06-01 07:30:00",
                "image_url": null,
                "source_id": "healthwire",
                "creator": ["Dr. Reporter"],
                "category": ["health"]
            }]
        }"#;
        let body: NewsDataResponse = serde_json::from_str(json).expect("parse");
        let items: Vec<NewsDataArticle> = serde_json::from_value(body.results).expect("results");
        let articles = into_articles(items, None);
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        assert_eq!(a.category, Category::Health);
        assert_eq!(a.source, "healthwire");
        assert_eq!(a.author.as_deref(), Some("Dr. Reporter"));
        assert!(a.content.is_none());
        assert!(a.published().is_some());
    }

    #[test]
    fn error_shape_parses() {
        let json = r#"{"status": "error", "results": {"message": "API key invalid", "code": "Unauthorized"}}"#;
        let body: NewsDataResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(body.status, "error");
        assert_eq!(body.results["message"], "API key invalid");
    }
}
