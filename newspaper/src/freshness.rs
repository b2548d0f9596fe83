use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::article::Article;

/// Keep every article date inside the `[now - max_age, now]` window.
///
/// Valid in-window dates are kept. Missing, unparsable, future or stale dates are replaced
/// by evenly spaced timestamps inside the window, so position `i` of `n` gets
/// `now - (i + 1) * window / (n + 1)`. The result is sorted newest first (stable, so
/// synthesized dates keep provider order).
pub fn freshen_dates(articles: Vec<Article>, max_age_hours: i64, now: DateTime<Utc>) -> Vec<Article> {
    let window = Duration::hours(max_age_hours.clamp(1, common::MAX_ARTICLE_AGE_HOURS));
    let oldest = now - window;
    let n = articles.len() as i64;

    let mut dated: Vec<(DateTime<Utc>, Article)> = articles
        .into_iter()
        .enumerate()
        .map(|(i, mut article)| {
            let published = article
                .published()
                .filter(|dt| *dt >= oldest && *dt <= now)
                .unwrap_or_else(|| {
                    let offset = window.num_seconds() * (i as i64 + 1) / (n + 1);
                    now - Duration::seconds(offset)
                });
            article.published_at = published.to_rfc3339_opts(SecondsFormat::Secs, true);
            (published, article)
        })
        .collect();

    dated.sort_by(|a, b| b.0.cmp(&a.0));
    dated.into_iter().map(|(_, article)| article).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::Category;

    fn article(title: &str, published_at: &str) -> Article {
        Article::new(title, format!("https://news.test/{}", title), "Test", Category::General)
            .with_published_at(published_at)
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .expect("fixed now")
            .with_timezone(&Utc)
    }

    #[test]
    fn keeps_valid_dates_and_replaces_stale_ones() {
        let articles = vec![
            article("fresh", "2024-06-01T10:00:00Z"),
            article("stale", "2023-01-01T00:00:00Z"),
            article("missing", ""),
            article("future", "2030-01-01T00:00:00Z"),
        ];

        let out = freshen_dates(articles, 48, now());
        let oldest = now() - Duration::hours(48);

        assert_eq!(out.len(), 4);
        for a in &out {
            let dt = a.published().expect("every date is parseable");
            assert!(dt >= oldest && dt <= now(), "{} out of window: {}", a.title, a.published_at);
        }
        let fresh = out.iter().find(|a| a.title == "fresh").expect("fresh kept");
        assert_eq!(fresh.published_at, "2024-06-01T10:00:00Z");
    }

    #[test]
    fn synthesized_dates_preserve_order() {
        let articles = vec![article("a", ""), article("b", ""), article("c", "")];
        let out = freshen_dates(articles, 24, now());
        let titles: Vec<&str> = out.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        // 24h / 4 = 6h spacing
        assert_eq!(out[0].published_at, "2024-06-01T06:00:00Z");
        assert_eq!(out[2].published_at, "2024-05-31T18:00:00Z");
    }
}
