//! Article fetch pipeline: local source, general providers in priority order, then mock data.
//!
//! Every result goes through date freshening and enrichment before it is returned.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use common::Config;

use crate::article::{Article, Category};
use crate::enrichment::Enricher;
use crate::freshness::freshen_dates;
use crate::geocoding::LocationData;
use crate::llm::LlmProvider;
use crate::providers::{build_providers, FetchQuery, MockProvider, NewsProvider};

/// Minimum trimmed query length for search
pub const MIN_SEARCH_LEN: usize = 2;

/// Articles plus the name of the source that produced them
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub source: String,
    pub articles: Vec<Article>,
}

pub struct FetchOrchestrator {
    local: Option<Arc<dyn NewsProvider>>,
    providers: Vec<Arc<dyn NewsProvider>>,
    mock: MockProvider,
    enricher: Enricher,
    target_count: usize,
    max_age_hours: i64,
}

impl FetchOrchestrator {
    /// Orchestrator with no network providers: every request falls through to mock data.
    pub fn new(target_count: usize, max_age_hours: i64) -> Self {
        let max_age_hours = max_age_hours.clamp(1, common::MAX_ARTICLE_AGE_HOURS);
        Self {
            local: None,
            providers: Vec::new(),
            mock: MockProvider::new(),
            enricher: Enricher::new(None).with_limits(10, max_age_hours),
            target_count: target_count.max(1),
            max_age_hours,
        }
    }

    pub fn from_config(config: &Config, summarizer: Option<Arc<dyn LlmProvider>>) -> Result<Self> {
        let (local, providers) = build_providers(config)?;
        let max_age_hours = config.news.max_article_age_hours();
        Ok(Self {
            local,
            providers,
            mock: MockProvider::new(),
            enricher: Enricher::new(summarizer)
                .with_limits(config.news.max_ai_summaries(), max_age_hours),
            target_count: config.news.target_count(),
            max_age_hours,
        })
    }

    pub fn with_local_provider(mut self, provider: Arc<dyn NewsProvider>) -> Self {
        self.local = Some(provider);
        self
    }

    /// Append a provider to the end of the general chain.
    pub fn with_provider(mut self, provider: Arc<dyn NewsProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Names of the configured sources in the order they are tried
    pub fn provider_names(&self) -> Vec<String> {
        self.local
            .iter()
            .chain(self.providers.iter())
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn has_summarizer(&self) -> bool {
        self.enricher.has_summarizer()
    }

    fn is_sufficient(&self, articles: &[Article]) -> bool {
        articles.len() >= self.target_count
    }

    /// Fetch at least `target_count` articles if any source can provide them.
    pub async fn fetch_articles(
        &self,
        category: Option<Category>,
        location: Option<&LocationData>,
    ) -> FetchResult {
        let query = FetchQuery {
            category,
            location: location.cloned(),
            page_size: self.target_count,
        };

        let wants_local = location.is_some() && matches!(category, None | Some(Category::Local));
        if wants_local {
            if let Some(local) = &self.local {
                if let Some(articles) = self.attempt(local.as_ref(), &query).await {
                    return self.finish(local.name(), articles, location).await;
                }
            }
        }

        for provider in &self.providers {
            if let Some(articles) = self.attempt(provider.as_ref(), &query).await {
                return self.finish(provider.name(), articles, location).await;
            }
        }

        let articles = self.mock.by_category(category);
        info!(
            "all providers short of {} articles, serving {} mock articles",
            self.target_count,
            articles.len()
        );
        self.finish(self.mock.name(), articles, location).await
    }

    /// One provider attempt. `None` means the chain should advance.
    async fn attempt(&self, provider: &dyn NewsProvider, query: &FetchQuery) -> Option<Vec<Article>> {
        match provider.top_headlines(query).await {
            Ok(articles) if self.is_sufficient(&articles) => {
                info!("{} returned {} articles", provider.name(), articles.len());
                Some(articles)
            }
            Ok(articles) => {
                warn!(
                    "{} returned {} articles, need {}; trying next source",
                    provider.name(),
                    articles.len(),
                    self.target_count
                );
                None
            }
            Err(e) => {
                warn!("{} failed: {:#}; trying next source", provider.name(), e);
                None
            }
        }
    }

    async fn finish(
        &self,
        source: &str,
        articles: Vec<Article>,
        location: Option<&LocationData>,
    ) -> FetchResult {
        let fresh = freshen_dates(articles, self.max_age_hours, Utc::now());
        let articles = self.enricher.enrich(fresh, location).await;
        FetchResult {
            source: source.to_string(),
            articles,
        }
    }

    /// Free-text search. The first source with any match wins; mock matches are the last resort.
    pub async fn search(&self, query: &str) -> FetchResult {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            debug!("search query {:?} too short", query);
            return FetchResult {
                source: "none".to_string(),
                articles: Vec::new(),
            };
        }

        for provider in self.local.iter().chain(self.providers.iter()) {
            match provider.search(query, self.target_count).await {
                Ok(articles) if !articles.is_empty() => {
                    info!("search {:?}: {} results from {}", query, articles.len(), provider.name());
                    return self.finish(provider.name(), articles, None).await;
                }
                Ok(_) => warn!("search {:?}: no results from {}", query, provider.name()),
                Err(e) => warn!("search {:?} failed on {}: {:#}", query, provider.name(), e),
            }
        }

        let articles = self.mock.matching(query);
        info!("search {:?}: {} mock matches", query, articles.len());
        self.finish(self.mock.name(), articles, None).await
    }
}
