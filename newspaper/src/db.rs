use anyhow::{Context, Result};
use sqlx::SqlitePool;

/// Create the tables used by auth, profiles and preferences.
/// Idempotent, safe to call at every startup.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    tracing::info!("db: ensuring schema (CREATE TABLE IF NOT EXISTS ...)");

    let stmts = [
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            last_sign_in TIMESTAMP
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS auth_sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            expires_at INTEGER NOT NULL,
            revoked BOOLEAN NOT NULL DEFAULT FALSE,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            user_id TEXT PRIMARY KEY,
            display_name TEXT,
            avatar_url TEXT,
            onboarding_completed BOOLEAN NOT NULL DEFAULT FALSE,
            updated_at TIMESTAMP DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS user_preferences (
            user_id TEXT PRIMARY KEY,
            categories_json TEXT NOT NULL DEFAULT '[]',
            sources_json TEXT NOT NULL DEFAULT '[]',
            location TEXT,
            updated_at TIMESTAMP DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );
        "#,
        "CREATE INDEX IF NOT EXISTS idx_auth_sessions_user ON auth_sessions(user_id);",
    ];

    for stmt in stmts {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .with_context(|| format!("failed to run schema statement: {}", stmt.trim()))?;
    }

    tracing::info!("db: schema ready");
    Ok(())
}

/// In-memory pool with the schema applied, for tests and one-shot tools.
pub async fn memory_pool() -> Result<SqlitePool> {
    // a single connection: every new :memory: connection is a separate empty database
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .context("failed to open in-memory sqlite")?;
    ensure_schema(&pool).await?;
    Ok(pool)
}
