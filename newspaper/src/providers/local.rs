use anyhow::{Context, Result};
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use super::{ensure_success, http_client, plain_text, FetchQuery, Locale, NewsProvider};
use crate::article::{Article, Category};

pub const DEFAULT_BASE_URL: &str = "https://news.google.com/rss/search";

/// Location-scoped headlines from the Google News RSS search feed.
pub struct LocalNewsProvider {
    base_url: String,
    locale: Locale,
    client: Client,
}

impl LocalNewsProvider {
    pub fn new(base_url: impl Into<String>, locale: Locale, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            locale,
            client: http_client(timeout_secs)?,
        })
    }

    /// Fetches the RSS search feed for `q` and parses it.
    async fn fetch_feed(&self, q: &str) -> Result<Vec<Entry>> {
        let country = self.locale.country.to_uppercase();
        let params = [
            ("q", q.to_string()),
            ("hl", format!("{}-{}", self.locale.language, country)),
            ("gl", country.clone()),
            ("ceid", format!("{}:{}", country, self.locale.language)),
        ];
        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .context("local news request failed")?;
        let response = ensure_success(self.name(), response).await?;
        let bytes = response.bytes().await.context("failed to read response body")?;
        let feed = parser::parse(bytes.as_ref()).context("failed to parse local news feed")?;
        debug!("local news feed for {:?}: {} entries", q, feed.entries.len());
        Ok(feed.entries)
    }
}

#[async_trait::async_trait]
impl NewsProvider for LocalNewsProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn top_headlines(&self, query: &FetchQuery) -> Result<Vec<Article>> {
        let location = query
            .location
            .as_ref()
            .context("local news needs a location")?;
        let place = location
            .place_name()
            .context("local news needs a named place, got bare coordinates")?;

        let search = match location.region.as_deref() {
            Some(region) if region != place => format!("\"{}\" {}", place, region),
            _ => format!("\"{}\"", place),
        };

        let entries = self.fetch_feed(&search).await?;
        let relevance = format!("Local to {}", place);
        Ok(entries
            .into_iter()
            .take(query.page_size.max(1) * 2)
            .filter_map(|entry| entry_to_article(entry, Category::Local))
            .map(|mut article| {
                article.is_local_news = true;
                article.location_relevance = Some(relevance.clone());
                article
            })
            .collect())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Article>> {
        let entries = self.fetch_feed(query).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| entry_to_article(entry, Category::General))
            .take(limit)
            .collect())
    }
}

/// Google News titles read "Headline - Publisher"; split the publisher off.
fn split_publisher(title: &str) -> (String, Option<String>) {
    match title.rsplit_once(" - ") {
        Some((headline, publisher)) if !headline.trim().is_empty() && !publisher.trim().is_empty() => {
            (headline.trim().to_string(), Some(publisher.trim().to_string()))
        }
        _ => (title.trim().to_string(), None),
    }
}

fn entry_to_article(entry: Entry, category: Category) -> Option<Article> {
    let raw_title = entry.title.as_ref().map(|t| t.content.clone()).unwrap_or_default();
    let url = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();
    if raw_title.trim().is_empty() || url.is_empty() {
        debug!("Skipping entry without title or URL: {:?}", raw_title);
        return None;
    }

    let (title, publisher) = split_publisher(&raw_title);
    let description = entry
        .summary
        .as_ref()
        .map(|s| plain_text(&s.content))
        .unwrap_or_default();
    // Google repeats the headline as the snippet; keep it only when it adds something
    let description = if description.starts_with(&title) { String::new() } else { description };
    let published = entry
        .published
        .or(entry.updated)
        .map(|d| d.to_rfc3339())
        .unwrap_or_default();

    Some(
        Article::new(title, url, publisher.unwrap_or_else(|| "Google News".to_string()), category)
            .with_description(description)
            .with_published_at(published),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>"Austin" - Google News</title>
<link>https://news.google.com</link>
<description>Google News</description>
<item>
  <title>City council approves transit plan - Austin Chronicle</title>
  <link>https://news.test/transit</link>
  <pubDate>Sat, 01 Jun 2024 09:00:00 GMT</pubDate>
  <description>&lt;a href="https://news.test/transit"&gt;Council vote&lt;/a&gt; on new rail lines</description>
</item>
<item>
  <title></title>
  <link>https://news.test/empty</link>
</item>
</channel></rss>"#;

    #[test]
    fn parses_rss_entries() {
        let feed = parser::parse(RSS.as_bytes()).expect("parse rss");
        let articles: Vec<Article> = feed
            .entries
            .into_iter()
            .filter_map(|e| entry_to_article(e, Category::Local))
            .collect();
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        assert_eq!(a.title, "City council approves transit plan");
        assert_eq!(a.source, "Austin Chronicle");
        assert!(a.description.contains("Council vote"));
        assert!(a.published().is_some());
    }

    #[test]
    fn split_publisher_keeps_plain_titles() {
        assert_eq!(split_publisher("No publisher here"), ("No publisher here".to_string(), None));
        assert_eq!(
            split_publisher("A - B - Paper"),
            ("A - B".to_string(), Some("Paper".to_string()))
        );
    }
}
