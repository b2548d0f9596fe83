//! Article value object and the category set shared by every provider.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Categories offered by the front-end. Provider-specific names are mapped from these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    General,
    World,
    Business,
    Technology,
    Science,
    Health,
    Sports,
    Entertainment,
    Politics,
    Local,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::General,
        Category::World,
        Category::Business,
        Category::Technology,
        Category::Science,
        Category::Health,
        Category::Sports,
        Category::Entertainment,
        Category::Politics,
        Category::Local,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "General",
            Category::World => "World",
            Category::Business => "Business",
            Category::Technology => "Technology",
            Category::Science => "Science",
            Category::Health => "Health",
            Category::Sports => "Sports",
            Category::Entertainment => "Entertainment",
            Category::Politics => "Politics",
            Category::Local => "Local",
        }
    }

    /// Case-insensitive parse. Unknown names land in `General`.
    pub fn parse(name: &str) -> Category {
        let name = name.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
            .unwrap_or_else(|| match name.to_ascii_lowercase().as_str() {
                "tech" => Category::Technology,
                "sport" => Category::Sports,
                "nation" | "national" => Category::Politics,
                _ => Category::General,
            })
    }

    /// Parse an optional query value; empty and "all" mean no filter.
    pub fn parse_filter(name: Option<&str>) -> Option<Category> {
        match name.map(str::trim) {
            None | Some("") => None,
            Some(s) if s.eq_ignore_ascii_case("all") => None,
            Some(s) => Some(Category::parse(s)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A news article as handed to the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
    pub source: String,
    /// RFC 3339 timestamp. May be empty before date freshening.
    pub published_at: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub key_features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trending_score: Option<u8>,
    #[serde(default)]
    pub is_local_news: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_relevance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Article {
    /// Create an article with a content-derived id and every optional field unset.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        category: Category,
    ) -> Self {
        let title = title.into();
        let url = url.into();
        let source = source.into();
        Self {
            id: stable_id(&url, &title, &source),
            title,
            description: String::new(),
            content: None,
            summary: None,
            url,
            image_url: None,
            source,
            published_at: String::new(),
            category,
            relevance_reason: None,
            ai_summary: None,
            key_features: Vec::new(),
            trending_score: None,
            is_local_news: false,
            location_relevance: None,
            read_time: None,
            views: None,
            author: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_content(mut self, content: Option<String>) -> Self {
        self.content = content.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn with_published_at(mut self, published_at: impl Into<String>) -> Self {
        self.published_at = published_at.into();
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author.filter(|a| !a.trim().is_empty());
        self
    }

    /// Longest text available for this article: content, then description, then title.
    pub fn body_text(&self) -> &str {
        self.content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| Some(self.description.as_str()).filter(|d| !d.trim().is_empty()))
            .unwrap_or(&self.title)
    }

    pub fn published(&self) -> Option<DateTime<Utc>> {
        parse_published(&self.published_at)
    }

    /// Case-insensitive match against title and description.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// UUIDv5 over the article URL, or over title and source when the URL is missing.
pub fn stable_id(url: &str, title: &str, source: &str) -> String {
    let key = if url.trim().is_empty() {
        format!("{}|{}", source.trim(), title.trim())
    } else {
        url.trim().to_string()
    };
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

/// Parse the timestamp formats providers send (RFC 3339, RFC 2822, "YYYY-MM-DD HH:MM:SS" as UTC).
pub fn parse_published(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_is_case_insensitive_with_generic_bucket() {
        assert_eq!(Category::parse("technology"), Category::Technology);
        assert_eq!(Category::parse(" SPORTS "), Category::Sports);
        assert_eq!(Category::parse("tech"), Category::Technology);
        assert_eq!(Category::parse("astrology"), Category::General);
        assert_eq!(Category::parse_filter(Some("all")), None);
        assert_eq!(Category::parse_filter(Some("")), None);
        assert_eq!(Category::parse_filter(Some("Local")), Some(Category::Local));
    }

    #[test]
    fn ids_are_stable_and_content_derived() {
        let a = Article::new("Title", "https://example.com/a", "Example", Category::World);
        let b = Article::new("Other title", "https://example.com/a", "Elsewhere", Category::Business);
        let c = Article::new("Title", "https://example.com/c", "Example", Category::World);
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);

        let no_url_1 = Article::new("Same", "", "Wire", Category::General);
        let no_url_2 = Article::new("Same", "", "Wire", Category::General);
        assert_eq!(no_url_1.id, no_url_2.id);
    }

    #[test]
    fn parses_provider_date_formats() {
        let rfc3339 = parse_published("2024-05-01T10:00:00Z").expect("rfc3339");
        let plain = parse_published("2024-05-01 10:00:00").expect("plain");
        let rfc2822 = parse_published("Wed, 01 May 2024 10:00:00 GMT").expect("rfc2822");
        assert_eq!(rfc3339, plain);
        assert_eq!(rfc3339, rfc2822);
        assert!(parse_published("yesterday").is_none());
        assert!(parse_published("").is_none());
    }

    #[test]
    fn serializes_in_camel_case() {
        let article = Article::new("T", "https://x.test/1", "X", Category::Science)
            .with_image(Some("https://x.test/1.png".into()));
        let json = serde_json::to_value(&article).expect("serialize");
        assert_eq!(json["imageUrl"], "https://x.test/1.png");
        assert_eq!(json["category"], "Science");
        assert_eq!(json["isLocalNews"], false);
        assert!(json.get("aiSummary").is_none());
    }

    #[test]
    fn body_text_prefers_content() {
        let article = Article::new("Title", "u", "s", Category::General)
            .with_description("desc")
            .with_content(Some("full content".into()));
        assert_eq!(article.body_text(), "full content");
        let bare = Article::new("Title", "u", "s", Category::General);
        assert_eq!(bare.body_text(), "Title");
    }
}
