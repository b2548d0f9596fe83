//! Email/password accounts with JWT sessions.
//!
//! Tokens are HS256 JWTs whose `jti` is recorded in `auth_sessions`; a token is only valid
//! while its row exists, is not revoked and has not expired. Every operation returns an
//! [`AuthOutcome`] instead of an error so callers branch on `success`.

use anyhow::{Context, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::AuthConfig;

const MIN_PASSWORD_LEN: usize = 6;

/// Auth state changes, delivered to every subscriber
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn { user_id: String, email: String },
    SignedOut { user_id: String },
    UserCreated { user_id: String, email: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    /// Unix seconds
    pub expires_at: i64,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub session: Option<AuthSession>,
    pub error: Option<String>,
}

impl AuthOutcome {
    fn from_result(op: &str, result: Result<Option<AuthSession>>) -> Self {
        match result {
            Ok(session) => Self {
                success: true,
                session,
                error: None,
            },
            Err(e) => {
                warn!("auth: {} failed: {:#}", op, e);
                Self {
                    success: false,
                    session: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// JWT claims (subject = user id, jti = auth_sessions row id)
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    jti: String,
    email: String,
    iat: i64,
    exp: i64,
}

pub struct AuthService {
    pool: SqlitePool,
    secret: String,
    ttl_hours: i64,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthService {
    pub fn new(pool: SqlitePool, secret: impl Into<String>, ttl_hours: u64) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            pool,
            secret: secret.into(),
            ttl_hours: ttl_hours.clamp(1, common::MAX_TOKEN_TTL_HOURS) as i64,
            events,
        }
    }

    /// Fails when no signing secret is configured.
    pub fn from_config(pool: SqlitePool, config: &AuthConfig) -> Result<Self> {
        let secret = config.jwt_secret()?;
        if secret == common::DEV_JWT_SECRET {
            warn!(
                "auth: {} is unset, signing tokens with the development secret",
                config.jwt_secret_env()
            );
        }
        Ok(Self::new(pool, secret, config.token_ttl_hours()))
    }

    /// Receive every subsequent auth event
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    pub async fn sign_up(&self, email: &str, password: &str, display_name: Option<&str>) -> AuthOutcome {
        AuthOutcome::from_result("sign_up", self.try_sign_up(email, password, display_name).await.map(Some))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthOutcome {
        AuthOutcome::from_result("sign_in", self.try_sign_in(email, password).await.map(Some))
    }

    pub async fn sign_out(&self, token: &str) -> AuthOutcome {
        AuthOutcome::from_result("sign_out", self.try_sign_out(token).await.map(|_| None))
    }

    /// The live session for `token`, or `None` when it is invalid, expired or revoked.
    pub async fn get_session(&self, token: &str) -> Option<AuthSession> {
        match self.lookup(token).await {
            Ok(session) => session,
            Err(e) => {
                debug!("auth: session lookup failed: {:#}", e);
                None
            }
        }
    }

    async fn try_sign_up(&self, email: &str, password: &str, display_name: Option<&str>) -> Result<AuthSession> {
        let email = normalize_email(email)?;
        anyhow::ensure!(
            password.chars().count() >= MIN_PASSWORD_LEN,
            "Password should be at least {} characters",
            MIN_PASSWORD_LEN
        );

        let exists = sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await
            .context("failed to check existing user")?;
        if exists.is_some() {
            anyhow::bail!("User already registered");
        }

        let password_hash = hash_password(password)?;
        let user_id = Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await.context("failed to start transaction")?;
        sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)")
            .bind(&user_id)
            .bind(&email)
            .bind(&password_hash)
            .execute(&mut tx)
            .await
            .context("failed to insert user")?;
        sqlx::query("INSERT OR IGNORE INTO profiles (user_id, display_name) VALUES (?, ?)")
            .bind(&user_id)
            .bind(display_name.map(str::trim).filter(|n| !n.is_empty()))
            .execute(&mut tx)
            .await
            .context("failed to create profile")?;
        tx.commit().await.context("failed to commit sign-up")?;

        info!("auth: user {} created", user_id);
        self.emit(AuthEvent::UserCreated {
            user_id: user_id.clone(),
            email: email.clone(),
        });

        self.start_session(&user_id, &email).await
    }

    async fn try_sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = normalize_email(email)?;
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load user")?;

        let Some(row) = row else {
            anyhow::bail!("Invalid login credentials");
        };
        let user_id: String = row.try_get("id")?;
        let stored_hash: String = row.try_get("password_hash")?;

        if !verify_password(password, &stored_hash)? {
            anyhow::bail!("Invalid login credentials");
        }

        self.start_session(&user_id, &email).await
    }

    async fn try_sign_out(&self, token: &str) -> Result<()> {
        let claims = self.decode_claims(token)?;
        let result = sqlx::query("UPDATE auth_sessions SET revoked = TRUE WHERE id = ? AND revoked = FALSE")
            .bind(&claims.jti)
            .execute(&self.pool)
            .await
            .context("failed to revoke session")?;
        if result.rows_affected() == 0 {
            anyhow::bail!("Session not found");
        }

        info!("auth: user {} signed out", claims.sub);
        self.emit(AuthEvent::SignedOut { user_id: claims.sub });
        Ok(())
    }

    async fn start_session(&self, user_id: &str, email: &str) -> Result<AuthSession> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + self.ttl_hours * 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("failed to sign token")?;

        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&claims.jti)
            .bind(user_id)
            .bind(claims.exp)
            .execute(&self.pool)
            .await
            .context("failed to record session")?;
        sqlx::query("UPDATE users SET last_sign_in = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("failed to update last sign-in")?;

        self.emit(AuthEvent::SignedIn {
            user_id: user_id.to_string(),
            email: email.to_string(),
        });

        Ok(AuthSession {
            access_token: token,
            expires_at: claims.exp,
            user: AuthUser {
                id: user_id.to_string(),
                email: email.to_string(),
            },
        })
    }

    async fn lookup(&self, token: &str) -> Result<Option<AuthSession>> {
        let claims = self.decode_claims(token)?;
        let live = sqlx::query_scalar::<_, String>(
            "SELECT id FROM auth_sessions WHERE id = ? AND revoked = FALSE AND expires_at > ?",
        )
        .bind(&claims.jti)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .context("failed to check session")?;

        Ok(live.map(|_| AuthSession {
            access_token: token.to_string(),
            expires_at: claims.exp,
            user: AuthUser {
                id: claims.sub,
                email: claims.email,
            },
        }))
    }

    fn decode_claims(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token.trim(),
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .context("Invalid or expired token")?;
        Ok(data.claims)
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    anyhow::ensure!(valid, "Invalid email address");
    Ok(email)
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("invalid password hash in db: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
