use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::{debug, error};

/// Result envelope returned instead of an error: callers check `success`.
#[derive(Debug, Clone, Serialize)]
pub struct StoreOutcome<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> StoreOutcome<T> {
    fn from_result(op: &str, result: Result<T>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(e) => {
                error!("preferences: {} failed: {:#}", op, e);
                Self {
                    success: false,
                    data: None,
                    error: Some(format!("{:#}", e)),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    /// Free text ("Austin, TX") or "lat,lng"
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Row-level storage for `user_preferences` and `profiles`. Last write wins.
#[derive(Clone)]
pub struct PreferencesStore {
    pool: SqlitePool,
}

impl PreferencesStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, user_id: &str, prefs: &UserPreferences) -> StoreOutcome<UserPreferences> {
        let result = self.upsert_preferences(user_id, prefs).await.map(|_| prefs.clone());
        StoreOutcome::from_result("save", result)
    }

    pub async fn get(&self, user_id: &str) -> StoreOutcome<Option<UserPreferences>> {
        StoreOutcome::from_result("get", self.select_preferences(user_id).await)
    }

    pub async fn save_profile(&self, profile: &Profile) -> StoreOutcome<Profile> {
        let result = async {
            self.upsert_profile(profile).await?;
            self.select_profile(&profile.user_id)
                .await?
                .context("profile missing after upsert")
        }
        .await;
        StoreOutcome::from_result("save_profile", result)
    }

    pub async fn get_profile(&self, user_id: &str) -> StoreOutcome<Option<Profile>> {
        StoreOutcome::from_result("get_profile", self.select_profile(user_id).await)
    }

    async fn upsert_preferences(&self, user_id: &str, prefs: &UserPreferences) -> Result<()> {
        anyhow::ensure!(!user_id.trim().is_empty(), "user id is required");
        let categories = serde_json::to_string(&prefs.categories)?;
        let sources = serde_json::to_string(&prefs.sources)?;

        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, categories_json, sources_json, location, updated_at)
            VALUES (?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
            ON CONFLICT(user_id) DO UPDATE SET
                categories_json = excluded.categories_json,
                sources_json = excluded.sources_json,
                location = excluded.location,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&categories)
        .bind(&sources)
        .bind(&prefs.location)
        .execute(&self.pool)
        .await
        .context("failed to upsert preferences")?;

        debug!("preferences saved for {}", user_id);
        Ok(())
    }

    async fn select_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let row = sqlx::query(
            "SELECT categories_json, sources_json, location FROM user_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load preferences")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let categories: String = row.try_get("categories_json")?;
        let sources: String = row.try_get("sources_json")?;
        Ok(Some(UserPreferences {
            categories: serde_json::from_str(&categories).context("corrupt categories_json")?,
            sources: serde_json::from_str(&sources).context("corrupt sources_json")?,
            location: row.try_get::<Option<String>, _>("location")?.unwrap_or_default(),
        }))
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        anyhow::ensure!(!profile.user_id.trim().is_empty(), "user id is required");
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, display_name, avatar_url, onboarding_completed, updated_at)
            VALUES (?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url,
                onboarding_completed = excluded.onboarding_completed,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&profile.user_id)
        .bind(profile.display_name.as_deref())
        .bind(profile.avatar_url.as_deref())
        .bind(profile.onboarding_completed)
        .execute(&self.pool)
        .await
        .context("failed to upsert profile")?;
        Ok(())
    }

    async fn select_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, display_name, avatar_url, onboarding_completed, updated_at
            FROM profiles
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load profile")?;

        row.map(|r| -> Result<Profile> {
            Ok(Profile {
                user_id: r.try_get("user_id")?,
                display_name: r.try_get("display_name")?,
                avatar_url: r.try_get("avatar_url")?,
                onboarding_completed: r.try_get("onboarding_completed")?,
                updated_at: r.try_get("updated_at")?,
            })
        })
        .transpose()
    }
}
