/*!
common/src/lib.rs

Shared configuration types and DB helper functions for Newspaper.AI.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default and an override config file
- A helper to initialize an SQLite connection pool
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Default number of articles a source must return to be considered sufficient.
pub const DEFAULT_TARGET_COUNT: usize = 10;
/// Default freshness window for article dates.
pub const DEFAULT_MAX_ARTICLE_AGE_HOURS: i64 = 48;
/// Longest accepted freshness window (30 days).
pub const MAX_ARTICLE_AGE_HOURS: i64 = 720;
/// Longest accepted session lifetime (one year).
pub const MAX_TOKEN_TTL_HOURS: u64 = 8760;
/// Signing secret used only when `auth.allow_dev_secret` is set.
pub const DEV_JWT_SECRET: &str = "dev-secret";

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the sqlite database file (e.g. "data/newspaper.db")
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/newspaper.db".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Directory holding the built front-end bundle (index.html, assets/...)
    pub static_dir: Option<String>,
}

impl ServerConfig {
    pub fn static_dir(&self) -> &str {
        self.static_dir.as_deref().unwrap_or("dist")
    }
}

/// Article pipeline tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsConfig {
    pub target_count: Option<usize>,
    pub max_article_age_hours: Option<i64>,
    /// ISO 639-1 language passed to providers (e.g. "en")
    pub language: Option<String>,
    /// ISO 3166-1 alpha-2 country passed to providers (e.g. "us")
    pub country: Option<String>,
    /// Maximum number of articles per batch sent to the summarization API
    pub max_ai_summaries: Option<usize>,
}

impl NewsConfig {
    pub fn target_count(&self) -> usize {
        self.target_count.unwrap_or(DEFAULT_TARGET_COUNT).max(1)
    }

    pub fn max_article_age_hours(&self) -> i64 {
        self.max_article_age_hours
            .unwrap_or(DEFAULT_MAX_ARTICLE_AGE_HOURS)
            .clamp(1, MAX_ARTICLE_AGE_HOURS)
    }

    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or("en")
    }

    pub fn country(&self) -> &str {
        self.country.as_deref().unwrap_or("us")
    }

    pub fn max_ai_summaries(&self) -> usize {
        self.max_ai_summaries.unwrap_or(10)
    }
}

/// Settings for a single news provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub enabled: Option<bool>,
    pub api_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl ProviderConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(10)
    }
}

/// News providers, listed in fallback priority order (local first, then newsapi, gnews, newsdata)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub local: Option<ProviderConfig>,
    pub newsapi: Option<ProviderConfig>,
    pub gnews: Option<ProviderConfig>,
    pub newsdata: Option<ProviderConfig>,
}

/// Remote LLM config (OpenAI-compatible chat completions endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
}

/// LLM top-level config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub adapter: Option<String>, // "remote", "none"
    // Fallback: single remote config
    pub remote: Option<RemoteLlmConfig>,
    // Task-specific config
    pub summarization: Option<RemoteLlmConfig>,
}

/// Reverse geocoding (Nominatim-compatible) settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocodingConfig {
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl GeocodingConfig {
    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or("https://nominatim.openstreetmap.org")
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or("NewspaperAI/0.1.0")
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(10).max(1)
    }
}

/// Authentication settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding the JWT signing secret
    pub jwt_secret_env: Option<String>,
    pub token_ttl_hours: Option<u64>,
    /// Sign tokens with [`DEV_JWT_SECRET`] when the variable is unset. Local development only.
    pub allow_dev_secret: Option<bool>,
}

impl AuthConfig {
    pub fn jwt_secret_env(&self) -> &str {
        self.jwt_secret_env.as_deref().unwrap_or("NEWSPAPER_JWT_SECRET")
    }

    /// The signing secret from the configured environment variable. Unset or blank is an
    /// error unless `allow_dev_secret` is true.
    pub fn jwt_secret(&self) -> Result<String> {
        let env_name = self.jwt_secret_env();
        match std::env::var(env_name) {
            Ok(secret) if !secret.trim().is_empty() => Ok(secret),
            _ if self.allow_dev_secret.unwrap_or(false) => Ok(DEV_JWT_SECRET.to_string()),
            _ => anyhow::bail!(
                "JWT secret missing: set the {} environment variable (or auth.allow_dev_secret = true for local development)",
                env_name
            ),
        }
    }

    pub fn token_ttl_hours(&self) -> u64 {
        self.token_ttl_hours.unwrap_or(24).clamp(1, MAX_TOKEN_TTL_HOURS)
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that every configured endpoint is an absolute URL.
    pub fn validate(&self) -> Result<()> {
        let providers = [
            ("providers.local", &self.providers.local),
            ("providers.newsapi", &self.providers.newsapi),
            ("providers.gnews", &self.providers.gnews),
            ("providers.newsdata", &self.providers.newsdata),
        ];
        for (section, provider) in providers {
            if let Some(api_url) = provider.as_ref().and_then(|p| p.api_url.as_deref()) {
                url::Url::parse(api_url)
                    .with_context(|| format!("Invalid api_url in [{}]: {}", section, api_url))?;
            }
        }
        url::Url::parse(self.geocoding.api_url())
            .with_context(|| format!("Invalid api_url in [geocoding]: {}", self.geocoding.api_url()))?;
        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Initialize an SQLite connection pool.
///
/// This function will create the parent directory if necessary and return a configured
/// `SqlitePool` in WAL mode. Schema creation is the caller's job.
///
/// Example:
///   let pool = init_db_pool("data/newspaper.db").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create DB parent directory: {}", parent.display())
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}
