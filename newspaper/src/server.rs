use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, put, routes, Build, Rocket, State};
use serde::{Deserialize, Serialize};

use common::Config;

use crate::article::Category;
use crate::auth::{AuthOutcome, AuthService, AuthSession};
use crate::geocoding::{LocationData, ReverseGeocoder};
use crate::orchestrator::{FetchOrchestrator, FetchResult};
use crate::preferences::{PreferencesStore, Profile, StoreOutcome, UserPreferences};
use crate::static_site::{self, StaticSite};

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub config: Arc<Config>,
    pub orchestrator: Arc<FetchOrchestrator>,
    pub preferences: PreferencesStore,
    pub auth: Arc<AuthService>,
    pub geocoder: Arc<ReverseGeocoder>,
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    providers: Vec<String>,
    target_count: usize,
    ai_summaries: bool,
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Uptime plus the configured source chain.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        providers: state.orchestrator.provider_names(),
        target_count: state.orchestrator.target_count(),
        ai_summaries: state.orchestrator.has_summarizer(),
    })
}

/// Headlines for an optional category and location ("lat,lng" or "City, Region").
#[get("/api/v1/articles?<category>&<location>")]
async fn articles(
    state: &State<AppState>,
    category: Option<&str>,
    location: Option<&str>,
) -> Json<FetchResult> {
    let category = Category::parse_filter(category);
    let location = match location.and_then(LocationData::parse) {
        Some(loc) => Some(state.geocoder.resolve(loc).await),
        None => None,
    };
    Json(state.orchestrator.fetch_articles(category, location.as_ref()).await)
}

#[get("/api/v1/search?<q>")]
async fn search(state: &State<AppState>, q: Option<&str>) -> Json<FetchResult> {
    Json(state.orchestrator.search(q.unwrap_or_default()).await)
}

#[get("/api/v1/geocode/reverse?<lat>&<lng>")]
async fn reverse_geocode(
    state: &State<AppState>,
    lat: f64,
    lng: f64,
) -> Result<Json<LocationData>, Status> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(Status::BadRequest);
    }
    state.geocoder.reverse(lat, lng).await.map(Json).map_err(|e| {
        tracing::error!("reverse geocoding failed: {:#}", e);
        Status::BadGateway
    })
}

/// Check that `token` is a live session for `user_id`.
/// Handlers take the token as a query parameter or body field rather than a request guard.
async fn authorize(state: &AppState, token: Option<&str>, user_id: &str) -> Result<AuthSession, Status> {
    let token = token.filter(|t| !t.trim().is_empty()).ok_or(Status::Unauthorized)?;
    let session = state.auth.get_session(token).await.ok_or(Status::Unauthorized)?;
    if session.user.id != user_id {
        tracing::warn!("user {} tried to access data of {}", session.user.id, user_id);
        return Err(Status::Forbidden);
    }
    Ok(session)
}

#[get("/api/v1/preferences/<user_id>?<token>")]
async fn get_preferences(
    state: &State<AppState>,
    user_id: &str,
    token: Option<&str>,
) -> Result<Json<StoreOutcome<Option<UserPreferences>>>, Status> {
    authorize(state, token, user_id).await?;
    Ok(Json(state.preferences.get(user_id).await))
}

/// Request body for saving preferences. `token` identifies the caller.
#[derive(Deserialize)]
struct PreferencesUpdate {
    token: Option<String>,
    #[serde(flatten)]
    preferences: UserPreferences,
}

#[put("/api/v1/preferences/<user_id>", data = "<body>")]
async fn put_preferences(
    state: &State<AppState>,
    user_id: &str,
    body: Json<PreferencesUpdate>,
) -> Result<Json<StoreOutcome<UserPreferences>>, Status> {
    authorize(state, body.token.as_deref(), user_id).await?;
    Ok(Json(state.preferences.save(user_id, &body.preferences).await))
}

#[get("/api/v1/profiles/<user_id>?<token>")]
async fn get_profile(
    state: &State<AppState>,
    user_id: &str,
    token: Option<&str>,
) -> Result<Json<StoreOutcome<Option<Profile>>>, Status> {
    authorize(state, token, user_id).await?;
    Ok(Json(state.preferences.get_profile(user_id).await))
}

#[derive(Deserialize)]
struct ProfileUpdate {
    token: Option<String>,
    display_name: Option<String>,
    avatar_url: Option<String>,
    #[serde(default)]
    onboarding_completed: bool,
}

#[put("/api/v1/profiles/<user_id>", data = "<body>")]
async fn put_profile(
    state: &State<AppState>,
    user_id: &str,
    body: Json<ProfileUpdate>,
) -> Result<Json<StoreOutcome<Profile>>, Status> {
    authorize(state, body.token.as_deref(), user_id).await?;
    let body = body.into_inner();
    let profile = Profile {
        user_id: user_id.to_string(),
        display_name: body.display_name,
        avatar_url: body.avatar_url,
        onboarding_completed: body.onboarding_completed,
        updated_at: None,
    };
    Ok(Json(state.preferences.save_profile(&profile).await))
}

/// Request body for sign-up.
#[derive(Deserialize)]
struct SignUpRequest {
    email: String,
    password: String,
    display_name: Option<String>,
}

/// Request body for sign-in.
#[derive(Deserialize)]
struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct SignOutRequest {
    token: String,
}

fn auth_response(outcome: AuthOutcome, failure: Status) -> (Status, Json<AuthOutcome>) {
    let status = if outcome.success { Status::Ok } else { failure };
    (status, Json(outcome))
}

#[post("/api/v1/auth/signup", data = "<body>")]
async fn sign_up(state: &State<AppState>, body: Json<SignUpRequest>) -> (Status, Json<AuthOutcome>) {
    let outcome = state
        .auth
        .sign_up(&body.email, &body.password, body.display_name.as_deref())
        .await;
    auth_response(outcome, Status::BadRequest)
}

#[post("/api/v1/auth/signin", data = "<body>")]
async fn sign_in(state: &State<AppState>, body: Json<SignInRequest>) -> (Status, Json<AuthOutcome>) {
    let outcome = state.auth.sign_in(&body.email, &body.password).await;
    auth_response(outcome, Status::Unauthorized)
}

#[post("/api/v1/auth/signout", data = "<body>")]
async fn sign_out(state: &State<AppState>, body: Json<SignOutRequest>) -> (Status, Json<AuthOutcome>) {
    let outcome = state.auth.sign_out(&body.token).await;
    auth_response(outcome, Status::Unauthorized)
}

#[get("/api/v1/auth/session?<token>")]
async fn session(state: &State<AppState>, token: &str) -> Json<Option<AuthSession>> {
    Json(state.auth.get_session(token).await)
}

/// API routes plus the static front-end, built from a figment carrying address/port.
pub fn build_rocket(state: AppState, site: StaticSite, figment: rocket::figment::Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount(
            "/",
            routes![
                health,
                status,
                articles,
                search,
                reverse_geocode,
                get_preferences,
                put_preferences,
                get_profile,
                put_profile,
                sign_up,
                sign_in,
                sign_out,
                session,
            ],
        )
        .manage(site)
        .mount("/", static_site::routes())
        .register("/", static_site::catchers())
}

/// Rocket's default figment with `[server] bind` and `port` applied.
pub fn figment_from_config(config: &Config) -> rocket::figment::Figment {
    let mut fig = rocket::Config::figment();
    if let Some(bind) = &config.server.bind {
        fig = fig.merge(("address", bind.clone()));
    }
    if let Some(port) = config.server.port {
        fig = fig.merge(("port", port));
    }
    fig
}

/// Build and launch the Rocket server. Blocks until shutdown.
pub async fn launch_rocket(state: AppState) -> Result<()> {
    let site = StaticSite::new(state.config.server.static_dir());
    let figment = figment_from_config(&state.config);

    tracing::info!("Starting Rocket HTTP server");
    build_rocket(state, site, figment)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
