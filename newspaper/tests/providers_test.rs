use chrono::{Duration, Utc};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;

use newspaper::article::Category;
use newspaper::geocoding::LocationData;
use newspaper::orchestrator::FetchOrchestrator;
use newspaper::providers::{
    FetchQuery, GNewsProvider, Locale, LocalNewsProvider, NewsApiProvider, NewsDataProvider,
    NewsProvider,
};

fn newsapi_body(count: usize) -> String {
    let articles: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "source": {"id": null, "name": "Tech Ledger"},
                "author": "Staff",
                "title": format!("Chip story {}", i),
                "description": "A new chip. It is fast.",
                "url": format!("https://ledger.test/chips/{}", i),
                "urlToImage": null,
                "publishedAt": "2020-01-01T00:00:00Z",
                "content": "Body text [+1200 chars]"
            })
        })
        .collect();
    json!({"status": "ok", "totalResults": count, "articles": articles}).to_string()
}

fn newsdata_body(count: usize) -> String {
    let results: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "title": format!("Data story {}", i),
                "link": format!("https://data.test/{}", i),
                "description": "Something happened.",
                "pubDate": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                "source_id": "datawire",
                "category": ["technology"]
            })
        })
        .collect();
    json!({"status": "success", "totalResults": count, "results": results}).to_string()
}

const AUSTIN_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>Austin - Google News</title>
<link>https://news.google.com</link>
<description>Google News</description>
<item>
  <title>Austin council approves transit plan - Austin Chronicle</title>
  <link>https://chronicle.test/transit</link>
  <pubDate>Sat, 01 Jun 2024 09:00:00 GMT</pubDate>
  <description>Rail lines are coming downtown.</description>
</item>
<item>
  <title>New park opens on the east side - KXAN</title>
  <link>https://kxan.test/park</link>
  <description>Families gathered for the opening.</description>
</item>
</channel></rss>"#;

#[tokio::test]
async fn newsapi_top_headlines_maps_and_filters() {
    let mut server = mockito::Server::new_async().await;
    let body = json!({
        "status": "ok",
        "totalResults": 2,
        "articles": [
            {"source": {"name": "Wire"}, "title": "Rates hold steady", "url": "https://wire.test/rates",
             "description": "Central bank pauses.", "publishedAt": "2024-06-01T08:00:00Z"},
            {"source": {"name": null}, "title": "[Removed]", "url": "https://removed.com"}
        ]
    });
    let mock = server
        .mock("GET", "/top-headlines")
        .match_header("x-api-key", "test-key")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("category".into(), "business".into()),
            Matcher::UrlEncoded("country".into(), "us".into()),
            Matcher::UrlEncoded("pageSize".into(), "10".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let provider = NewsApiProvider::new(server.url(), "test-key", Locale::default(), 5).expect("provider");
    let query = FetchQuery {
        category: Some(Category::Business),
        location: None,
        page_size: 10,
    };
    let articles = provider.top_headlines(&query).await.expect("headlines");

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "Rates hold steady");
    assert_eq!(articles[0].source, "Wire");
    assert_eq!(articles[0].category, Category::Business);
    mock.assert_async().await;
}

#[tokio::test]
async fn newsapi_error_status_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/top-headlines")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid"}"#)
        .create_async()
        .await;

    let provider = NewsApiProvider::new(server.url(), "bad", Locale::default(), 5).expect("provider");
    let err = provider
        .top_headlines(&FetchQuery { page_size: 10, ..Default::default() })
        .await
        .expect_err("should fail");
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn gnews_search_sends_query() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "solar power".into()),
            Matcher::UrlEncoded("apikey".into(), "g-key".into()),
            Matcher::UrlEncoded("lang".into(), "en".into()),
            Matcher::Regex(r"from=\d{4}-\d{2}-\d{2}T\d{2}%3A\d{2}%3A\d{2}Z".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "totalArticles": 1,
                "articles": [{
                    "title": "Solar power hits record share",
                    "description": "Panels supplied a third of demand.",
                    "url": "https://energy.test/solar",
                    "publishedAt": "2024-06-01T08:00:00Z",
                    "source": {"name": "Energy Desk", "url": "https://energy.test"}
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let provider = GNewsProvider::new(server.url(), "g-key", Locale::default(), 5).expect("provider");
    let articles = provider.search("solar power", 10).await.expect("search");
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].source, "Energy Desk");
    mock.assert_async().await;
}

#[tokio::test]
async fn newsdata_asks_for_the_freshness_window() {
    let mut server = mockito::Server::new_async().await;
    let day = server
        .mock("GET", "/latest")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("category".into(), "technology".into()),
            Matcher::UrlEncoded("timeframe".into(), "24".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(newsdata_body(3))
        .create_async()
        .await;
    let capped = server
        .mock("GET", "/latest")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "rust".into()),
            Matcher::UrlEncoded("timeframe".into(), "48".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(newsdata_body(1))
        .create_async()
        .await;

    let provider = NewsDataProvider::new(server.url(), "k", Locale::default(), 5)
        .expect("provider")
        .with_max_age_hours(24);
    let articles = provider
        .top_headlines(&FetchQuery { category: Some(Category::Technology), page_size: 10, ..Default::default() })
        .await
        .expect("headlines");
    assert_eq!(articles.len(), 3);

    // a week-long window is more than the API accepts
    let provider = NewsDataProvider::new(server.url(), "k", Locale::default(), 5)
        .expect("provider")
        .with_max_age_hours(168);
    provider.search("rust", 10).await.expect("search");

    day.assert_async().await;
    capped.assert_async().await;
}

#[tokio::test]
async fn newsapi_search_limits_publication_date() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/everything")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "chips".into()),
            Matcher::UrlEncoded("sortBy".into(), "publishedAt".into()),
            Matcher::Regex(r"from=\d{4}-\d{2}-\d{2}T\d{2}%3A\d{2}%3A\d{2}Z".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(newsapi_body(2))
        .create_async()
        .await;

    let provider = NewsApiProvider::new(server.url(), "k", Locale::default(), 5)
        .expect("provider")
        .with_max_age_hours(6);
    let articles = provider.search("chips", 10).await.expect("search");
    assert_eq!(articles.len(), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn newsdata_error_payload_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/latest")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"error","results":{"message":"API key invalid","code":"Unauthorized"}}"#)
        .create_async()
        .await;

    let provider = NewsDataProvider::new(server.url(), "k", Locale::default(), 5).expect("provider");
    let err = provider
        .top_headlines(&FetchQuery { page_size: 10, ..Default::default() })
        .await
        .expect_err("should fail");
    assert!(err.to_string().contains("API key invalid"));
}

#[tokio::test]
async fn local_provider_scopes_to_city() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rss/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "\"Austin\" Texas".into()),
            Matcher::UrlEncoded("gl".into(), "US".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(AUSTIN_RSS)
        .create_async()
        .await;

    let provider = LocalNewsProvider::new(format!("{}/rss/search", server.url()), Locale::default(), 5)
        .expect("provider");
    let mut austin = LocationData::from_city("Austin");
    austin.region = Some("Texas".to_string());
    let query = FetchQuery {
        category: None,
        location: Some(austin),
        page_size: 10,
    };
    let articles = provider.top_headlines(&query).await.expect("local news");

    assert_eq!(articles.len(), 2);
    assert!(articles.iter().all(|a| a.is_local_news && a.category == Category::Local));
    assert_eq!(articles[0].source, "Austin Chronicle");
    assert_eq!(articles[0].location_relevance.as_deref(), Some("Local to Austin"));
    mock.assert_async().await;
}

#[tokio::test]
async fn local_provider_needs_a_location() {
    let provider = LocalNewsProvider::new("http://127.0.0.1:9/rss/search", Locale::default(), 1)
        .expect("provider");
    let result = provider.top_headlines(&FetchQuery { page_size: 10, ..Default::default() }).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn chain_skips_short_and_failing_providers() {
    let mut server = mockito::Server::new_async().await;
    let newsapi = server
        .mock("GET", "/newsapi/top-headlines")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(newsapi_body(3))
        .create_async()
        .await;
    let gnews = server
        .mock("GET", "/gnews/top-headlines")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;
    let newsdata = server
        .mock("GET", "/newsdata/latest")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(newsdata_body(12))
        .create_async()
        .await;

    let base = server.url();
    let orchestrator = FetchOrchestrator::new(10, 48)
        .with_provider(Arc::new(
            NewsApiProvider::new(format!("{}/newsapi", base), "k", Locale::default(), 5).expect("newsapi"),
        ))
        .with_provider(Arc::new(
            GNewsProvider::new(format!("{}/gnews", base), "k", Locale::default(), 5).expect("gnews"),
        ))
        .with_provider(Arc::new(
            NewsDataProvider::new(format!("{}/newsdata", base), "k", Locale::default(), 5).expect("newsdata"),
        ));

    let result = orchestrator.fetch_articles(Some(Category::Technology), None).await;

    assert_eq!(result.source, "newsdata");
    assert_eq!(result.articles.len(), 12);
    let oldest_allowed = Utc::now() - Duration::hours(48);
    for article in &result.articles {
        let published = article.published().expect("date");
        assert!(published >= oldest_allowed);
        assert!(article.ai_summary.is_some());
        assert!(article.read_time.is_some());
    }
    newsapi.assert_async().await;
    gnews.assert_async().await;
    newsdata.assert_async().await;
}

#[tokio::test]
async fn stale_dates_are_freshened() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/top-headlines")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(newsapi_body(10))
        .create_async()
        .await;

    let orchestrator = FetchOrchestrator::new(10, 48).with_provider(Arc::new(
        NewsApiProvider::new(server.url(), "k", Locale::default(), 5).expect("provider"),
    ));
    let first = orchestrator.fetch_articles(None, None).await;
    let second = orchestrator.fetch_articles(None, None).await;

    assert_eq!(first.source, "newsapi");
    let oldest_allowed = Utc::now() - Duration::hours(48);
    assert!(first
        .articles
        .iter()
        .all(|a| a.published().expect("date") >= oldest_allowed));
    // newest first
    let dates: Vec<_> = first.articles.iter().filter_map(|a| a.published()).collect();
    assert!(dates.windows(2).all(|w| w[0] >= w[1]));
    // ids are stable across fetches
    let ids = |r: &newspaper::orchestrator::FetchResult| {
        let mut ids: Vec<String> = r.articles.iter().map(|a| a.id.clone()).collect();
        ids.sort();
        ids
    };
    assert_eq!(ids(&first), ids(&second));
}

#[tokio::test]
async fn everything_down_serves_mock_technology() {
    let orchestrator = FetchOrchestrator::new(10, 48).with_provider(Arc::new(
        NewsApiProvider::new("http://127.0.0.1:9", "k", Locale::default(), 1).expect("provider"),
    ));
    let result = orchestrator.fetch_articles(Some(Category::Technology), None).await;
    assert_eq!(result.source, "mock");
    assert!(!result.articles.is_empty());
    assert!(result.articles.iter().all(|a| a.category == Category::Technology));
}
